use std::fmt;

use ferry_core::display_name;

/// Tracker-side login a chat user maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackerLogin(String);

impl TrackerLogin {
    pub fn new(login: impl Into<String>) -> Self {
        Self(login.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackerLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackerLogin {
    fn from(login: &str) -> Self {
        Self::new(login)
    }
}

/// Chat-side user as supplied by a request or event. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatIdentity {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl ChatIdentity {
    /// Full name when any name part is present, username otherwise.
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, &self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_display_name_falls_back_to_username() {
        let identity = ChatIdentity {
            id: "u1".into(),
            username: "vasiliy.fedorov".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        assert_eq!(identity.display_name(), "vasiliy.fedorov");

        let named = ChatIdentity {
            first_name: "Vasiliy".into(),
            last_name: "Fedorov".into(),
            ..identity
        };
        assert_eq!(named.display_name(), "Vasiliy Fedorov");
    }

    #[test]
    fn unit_tracker_login_display_matches_inner() {
        let login = TrackerLogin::new("vfedorov");
        assert_eq!(login.as_str(), "vfedorov");
        assert_eq!(login.to_string(), "vfedorov");
    }
}

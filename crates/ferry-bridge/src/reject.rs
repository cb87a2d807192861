//! Refusal taxonomy and the exact markdown texts shown to requesters.

use ferry_access::AccessError;
use ferry_redmine::TrackerError;
use ferry_tickets::{BatchParseError, FieldError};

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectKind {
    IdentityNotRegistered,
    AccountInactiveOrMissing,
    CredentialInvalid,
    ProjectNotFound,
    ProjectForbidden,
    InvalidDateFormat,
    StartAfterEnd,
    InvalidEstimate,
    SubjectTooLong,
    BatchMalformed,
    TicketNotFound,
    TicketForbidden,
    GatewayFailure,
}

/// One refusal, carrying the text the requester sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reject {
    pub kind: RejectKind,
    pub text: String,
}

impl Reject {
    pub fn identity_not_registered(chat_username: &str) -> Self {
        Self {
            kind: RejectKind::IdentityNotRegistered,
            text: format!(
                "# Mattermost account with login `{chat_username}` not added in config file for integration with redmine"
            ),
        }
    }

    pub fn account_inactive(tracker_login: &str) -> Self {
        Self {
            kind: RejectKind::AccountInactiveOrMissing,
            text: format!("# Redmine account-`{tracker_login}` doesn't exist or deactivated."),
        }
    }

    pub fn credential_invalid() -> Self {
        Self {
            kind: RejectKind::CredentialInvalid,
            text: "# Your app haven't redmine access token.".to_string(),
        }
    }

    pub fn project_not_found(tracker_login: &str, project_identifier: &str) -> Self {
        Self {
            kind: RejectKind::ProjectNotFound,
            text: format!(
                "# User with login '{tracker_login}' haven't project with identifier `{project_identifier}`."
            ),
        }
    }

    pub fn project_forbidden(tracker_login: &str, project_identifier: &str) -> Self {
        Self {
            kind: RejectKind::ProjectForbidden,
            text: format!(
                "# User with login '{tracker_login}' does not have access to the project with identifier `{project_identifier}`."
            ),
        }
    }

    pub fn invalid_date_format() -> Self {
        Self {
            kind: RejectKind::InvalidDateFormat,
            text: "# Invalid format date".to_string(),
        }
    }

    pub fn start_after_end() -> Self {
        Self {
            kind: RejectKind::StartAfterEnd,
            text: "# Due date must be greater than start date".to_string(),
        }
    }

    pub fn invalid_estimate(text: &str) -> Self {
        Self {
            kind: RejectKind::InvalidEstimate,
            text: format!("# Invalid format for estimated time - {text}"),
        }
    }

    pub fn subject_too_long() -> Self {
        Self {
            kind: RejectKind::SubjectTooLong,
            text: "# Subject is too long (maximum is 255 characters)".to_string(),
        }
    }

    pub fn batch_malformed() -> Self {
        Self {
            kind: RejectKind::BatchMalformed,
            text: "# Invalid input data. Look for example.".to_string(),
        }
    }

    pub fn ticket_not_found(ticket_id: impl std::fmt::Display) -> Self {
        Self {
            kind: RejectKind::TicketNotFound,
            text: format!("# You have not task with ID `{ticket_id}`"),
        }
    }

    pub fn ticket_forbidden(ticket_id: u64) -> Self {
        Self {
            kind: RejectKind::TicketForbidden,
            text: format!("# You haven't access to task with ID {ticket_id}"),
        }
    }

    pub fn gateway_failure() -> Self {
        Self {
            kind: RejectKind::GatewayFailure,
            text: "# Something went wrong. Try again later.".to_string(),
        }
    }
}

/// Logs an unexpected tracker or chat failure and returns the generic
/// refusal. The real cause stays in the log, never in the chat reply.
pub fn gateway_reject(operation: &'static str, error: impl std::fmt::Display) -> Reject {
    tracing::warn!(%operation, error = %error, "bridge operation failed");
    Reject::gateway_failure()
}

/// Maps a ticket fetch failure to the notice shown to the message author.
pub fn ticket_fetch_reject(ticket_id: u64, error: TrackerError) -> Reject {
    match error {
        TrackerError::NotFound { .. } => Reject::ticket_not_found(ticket_id),
        TrackerError::Forbidden { .. } => Reject::ticket_forbidden(ticket_id),
        error => gateway_reject("tracker issue fetch", error),
    }
}

impl From<AccessError> for Reject {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::NotRegistered(chat_username) => {
                Reject::identity_not_registered(&chat_username)
            }
            error => gateway_reject("identity table read", error),
        }
    }
}

impl From<FieldError> for Reject {
    fn from(error: FieldError) -> Self {
        match error {
            FieldError::InvalidDateFormat { .. } => Reject::invalid_date_format(),
            FieldError::StartAfterEnd { .. } => Reject::start_after_end(),
            FieldError::InvalidEstimate { text } => Reject::invalid_estimate(&text),
            FieldError::SubjectTooLong => Reject::subject_too_long(),
        }
    }
}

impl From<BatchParseError> for Reject {
    fn from(error: BatchParseError) -> Self {
        match error {
            BatchParseError::MalformedItem { .. } => Reject::batch_malformed(),
            BatchParseError::InvalidDueDate { .. } => Reject::invalid_date_format(),
            BatchParseError::DueDateBeforeToday { .. } => Reject::start_after_end(),
            BatchParseError::SubjectTooLong { .. } => Reject::subject_too_long(),
        }
    }
}

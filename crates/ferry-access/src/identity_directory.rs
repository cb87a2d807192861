use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;
use thiserror::Error;

use crate::identity_types::TrackerLogin;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("chat account `{0}` is not registered in the identity table")]
    NotRegistered(String),
    #[error("failed to read identity table {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse identity table {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct IdentityTableFile {
    #[serde(default)]
    identities: BTreeMap<String, String>,
}

/// Immutable chat-username → tracker-login snapshot.
#[derive(Debug, Default, Clone)]
pub struct IdentityTable {
    entries: BTreeMap<String, String>,
}

impl IdentityTable {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(chat, tracker)| (chat.into(), tracker.into()))
                .collect(),
        }
    }

    pub fn lookup(&self, chat_username: &str) -> Option<&str> {
        self.entries.get(chat_username).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directory over the identity table. Lookups read the current snapshot;
/// `reload` re-reads the backing file and swaps the snapshot atomically, so
/// in-flight requests keep the table they started with.
pub struct IdentityDirectory {
    path: Option<PathBuf>,
    table: ArcSwap<IdentityTable>,
}

impl IdentityDirectory {
    /// Loads the table from a TOML file with an `[identities]` section.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, AccessError> {
        let path = path.into();
        let table = read_table(&path)?;
        Ok(Self {
            path: Some(path),
            table: ArcSwap::from_pointee(table),
        })
    }

    /// Builds a directory over an in-memory table; `reload` is a no-op.
    pub fn from_table(table: IdentityTable) -> Self {
        Self {
            path: None,
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Resolves a chat username to its tracker login. Absence is the
    /// `NotRegistered` error, never a panic.
    pub fn resolve(&self, chat_username: &str) -> Result<TrackerLogin, AccessError> {
        self.table
            .load()
            .lookup(chat_username)
            .map(TrackerLogin::new)
            .ok_or_else(|| AccessError::NotRegistered(chat_username.to_string()))
    }

    /// Re-reads the backing file and swaps the snapshot. Returns the entry
    /// count of the new snapshot. On failure the old snapshot stays active.
    pub fn reload(&self) -> Result<usize, AccessError> {
        let Some(path) = &self.path else {
            return Ok(self.table.load().len());
        };
        let table = read_table(path)?;
        let count = table.len();
        self.table.store(Arc::new(table));
        Ok(count)
    }

    pub fn snapshot(&self) -> Arc<IdentityTable> {
        self.table.load_full()
    }
}

fn read_table(path: &Path) -> Result<IdentityTable, AccessError> {
    let raw = std::fs::read_to_string(path).map_err(|source| AccessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: IdentityTableFile = toml::from_str(&raw).map_err(|source| AccessError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(IdentityTable {
        entries: file.identities,
    })
}

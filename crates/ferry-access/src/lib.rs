//! Identity resolution between the chat platform and the tracker.
//!
//! Owns the static chat-username → tracker-login table and the identity
//! types threaded through the rest of the bridge. The table is loaded from
//! a TOML file into an immutable snapshot; `reload` swaps in a fresh
//! snapshot without interrupting readers.

pub mod identity_directory;
pub mod identity_types;

pub use identity_directory::{AccessError, IdentityDirectory, IdentityTable};
pub use identity_types::{ChatIdentity, TrackerLogin};

//! Redmine gateway for the bridge.
//!
//! Exposes the tracker seam the rest of the workspace programs against: the
//! `TrackerGateway`/`TrackerSession` traits, the typed `TrackerError`, the
//! wire types, and the production `reqwest` client that signs requests with
//! the administrative API key and impersonates a concrete user per session.

pub mod redmine_api_client;
pub mod redmine_types;
pub mod tracker;
pub(crate) mod transport_helpers;

pub use redmine_api_client::{RedmineApiClient, RedmineClientConfig};
pub use redmine_types::{IssueDraft, NamedRef, Project, Ticket, TrackerUser};
pub use tracker::{TrackerError, TrackerGateway, TrackerSession};

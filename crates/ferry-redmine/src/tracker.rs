use async_trait::async_trait;
use ferry_access::TrackerLogin;
use thiserror::Error;

use crate::redmine_types::{IssueDraft, Project, Ticket, TrackerUser};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker rejected the api credential")]
    CredentialRejected,
    #[error("tracker account `{login}` does not exist or is deactivated")]
    ImpersonationRejected { login: String },
    #[error("tracker {resource} `{ident}` not found")]
    NotFound {
        resource: &'static str,
        ident: String,
    },
    #[error("access to tracker {resource} `{ident}` is forbidden")]
    Forbidden {
        resource: &'static str,
        ident: String,
    },
    #[error("tracker {operation} failed with status {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("tracker {operation} request failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode tracker {operation} response")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build tracker http client")]
    Client(#[source] reqwest::Error),
}

/// Entry point to the tracker: binds a login to a fresh impersonated session.
/// Sessions are cheap handles; every call they make acts as the bound user.
pub trait TrackerGateway: Send + Sync {
    fn impersonate(&self, login: &TrackerLogin) -> Box<dyn TrackerSession>;
}

/// One impersonated view of the tracker. Auth problems surface on the first
/// call, not at construction: `current_user` is the canonical account check.
#[async_trait]
pub trait TrackerSession: Send + Sync {
    fn login(&self) -> &TrackerLogin;

    async fn current_user(&self) -> Result<TrackerUser, TrackerError>;

    async fn project(&self, ident: &str) -> Result<Project, TrackerError>;

    async fn create_issue(&self, draft: &IssueDraft) -> Result<Ticket, TrackerError>;

    async fn issue(&self, id: u64) -> Result<Ticket, TrackerError>;

    async fn issues_authored_by_me(&self) -> Result<Vec<Ticket>, TrackerError>;

    async fn issues_assigned_to_me(&self) -> Result<Vec<Ticket>, TrackerError>;
}

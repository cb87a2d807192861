//! Impersonated tracker sessions handed out as scope guards.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ferry_access::TrackerLogin;
use ferry_redmine::{TrackerError, TrackerGateway, TrackerSession, TrackerUser};

use crate::reject::{gateway_reject, Reject};

/// Opens impersonated tracker scopes and tracks how many are still alive.
/// The count exists so tests can prove every request path releases its
/// scopes, nested assignee checks included.
#[derive(Clone)]
pub struct SessionBroker {
    gateway: Arc<dyn TrackerGateway>,
    active_scopes: Arc<AtomicUsize>,
}

impl SessionBroker {
    pub fn new(gateway: Arc<dyn TrackerGateway>) -> Self {
        Self {
            gateway,
            active_scopes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Opens a scope acting as `login`. The scope closes when the returned
    /// guard drops, whichever way the caller exits.
    pub fn impersonate(&self, login: &TrackerLogin) -> ImpersonationScope {
        self.active_scopes.fetch_add(1, Ordering::SeqCst);
        ImpersonationScope {
            session: self.gateway.impersonate(login),
            active_scopes: Arc::clone(&self.active_scopes),
        }
    }

    pub fn active_scopes(&self) -> usize {
        self.active_scopes.load(Ordering::SeqCst)
    }
}

/// Guard around one impersonated tracker session. Dereferences to the
/// session itself for plain tracker calls.
pub struct ImpersonationScope {
    session: Box<dyn TrackerSession>,
    active_scopes: Arc<AtomicUsize>,
}

impl ImpersonationScope {
    /// Confirms the impersonated account exists, is active, and that the
    /// bridge credential is accepted, returning the tracker user record.
    pub async fn verify_account(&self) -> Result<TrackerUser, Reject> {
        match self.session.current_user().await {
            Ok(user) => Ok(user),
            Err(TrackerError::ImpersonationRejected { .. }) => {
                Err(Reject::account_inactive(self.session.login().as_str()))
            }
            Err(TrackerError::CredentialRejected) => Err(Reject::credential_invalid()),
            Err(error) => Err(gateway_reject("tracker account check", error)),
        }
    }

    /// Confirms the impersonated account can see the project.
    pub async fn verify_membership(&self, project_identifier: &str) -> Result<(), Reject> {
        match self.session.project(project_identifier).await {
            Ok(_) => Ok(()),
            Err(TrackerError::NotFound { .. }) => Err(Reject::project_not_found(
                self.session.login().as_str(),
                project_identifier,
            )),
            Err(TrackerError::Forbidden { .. }) => Err(Reject::project_forbidden(
                self.session.login().as_str(),
                project_identifier,
            )),
            Err(error) => Err(gateway_reject("tracker project check", error)),
        }
    }
}

impl Deref for ImpersonationScope {
    type Target = dyn TrackerSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for ImpersonationScope {
    fn drop(&mut self) {
        self.active_scopes.fetch_sub(1, Ordering::SeqCst);
    }
}

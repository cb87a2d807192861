//! Production Redmine REST client used behind the tracker gateway seam.

use std::time::Duration;

use async_trait::async_trait;
use ferry_access::TrackerLogin;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::redmine_types::{IssueDraft, Project, Ticket, TrackerUser};
use crate::tracker::{TrackerError, TrackerGateway, TrackerSession};
use crate::transport_helpers::{
    is_retryable_tracker_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};

const API_KEY_HEADER: &str = "X-Redmine-API-Key";
const SWITCH_USER_HEADER: &str = "X-Redmine-Switch-User";
const RETRY_ATTEMPT_HEADER: &str = "x-ferry-retry-attempt";
const LIST_PAGE_LIMIT: &str = "100";

#[derive(Debug, Clone)]
pub struct RedmineClientConfig {
    pub base_url: String,
    pub admin_api_key: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for RedmineClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            admin_api_key: String::new(),
            request_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct UserEnvelope {
    user: TrackerUser,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectEnvelope {
    project: Project,
}

#[derive(Debug, Clone, Deserialize)]
struct IssueEnvelope {
    issue: Ticket,
}

#[derive(Debug, Clone, Deserialize)]
struct IssueListEnvelope {
    #[serde(default)]
    issues: Vec<Ticket>,
}

/// Signs every request with the administrative API key and the per-session
/// switch-user header, so calls act as the impersonated account.
#[derive(Clone)]
pub struct RedmineApiClient {
    http: reqwest::Client,
    base_url: String,
    admin_api_key: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl RedmineApiClient {
    pub fn new(config: RedmineClientConfig) -> Result<Self, TrackerError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("ferry-bridge"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(TrackerError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            admin_api_key: config.admin_api_key.trim().to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_current_user(&self, login: &TrackerLogin) -> Result<TrackerUser, TrackerError> {
        let envelope: UserEnvelope = self
            .request_json("current user", login, "user", login.as_str(), || {
                self.http
                    .get(format!("{}/users/current.json", self.base_url))
            })
            .await?;
        Ok(envelope.user)
    }

    async fn fetch_project(
        &self,
        login: &TrackerLogin,
        ident: &str,
    ) -> Result<Project, TrackerError> {
        let envelope: ProjectEnvelope = self
            .request_json("project lookup", login, "project", ident, || {
                self.http
                    .get(format!("{}/projects/{}.json", self.base_url, ident))
            })
            .await?;
        Ok(envelope.project)
    }

    async fn post_issue(
        &self,
        login: &TrackerLogin,
        draft: &IssueDraft,
    ) -> Result<Ticket, TrackerError> {
        let payload = json!({ "issue": draft });
        let envelope: IssueEnvelope = self
            .request_json(
                "issue create",
                login,
                "project",
                &draft.project_id,
                || {
                    self.http
                        .post(format!("{}/issues.json", self.base_url))
                        .json(&payload)
                },
            )
            .await?;
        Ok(envelope.issue)
    }

    async fn fetch_issue(&self, login: &TrackerLogin, id: u64) -> Result<Ticket, TrackerError> {
        let ident = id.to_string();
        let envelope: IssueEnvelope = self
            .request_json("issue lookup", login, "issue", &ident, || {
                self.http
                    .get(format!("{}/issues/{}.json", self.base_url, id))
            })
            .await?;
        Ok(envelope.issue)
    }

    async fn fetch_issue_list(
        &self,
        login: &TrackerLogin,
        filter_key: &'static str,
    ) -> Result<Vec<Ticket>, TrackerError> {
        let envelope: IssueListEnvelope = self
            .request_json("issue list", login, "issues", filter_key, || {
                self.http
                    .get(format!("{}/issues.json", self.base_url))
                    .query(&[(filter_key, "me"), ("limit", LIST_PAGE_LIMIT)])
            })
            .await?;
        Ok(envelope.issues)
    }

    async fn request_json<T, F>(
        &self,
        operation: &'static str,
        login: &TrackerLogin,
        resource: &'static str,
        ident: &str,
        mut builder: F,
    ) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(API_KEY_HEADER, &self.admin_api_key)
                .header(SWITCH_USER_HEADER, login.as_str())
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<T>().await.map_err(|source| {
                            TrackerError::Decode { operation, source }
                        });
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_tracker_status(status.as_u16())
                    {
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying tracker request"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    return Err(classify_status(
                        operation,
                        resource,
                        ident,
                        login,
                        status.as_u16(),
                        &body,
                    ));
                }
                Err(source) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&source) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(TrackerError::Transport { operation, source });
                }
            }
        }
    }
}

fn classify_status(
    operation: &'static str,
    resource: &'static str,
    ident: &str,
    login: &TrackerLogin,
    status: u16,
    body: &str,
) -> TrackerError {
    match status {
        401 => TrackerError::CredentialRejected,
        403 => TrackerError::Forbidden {
            resource,
            ident: ident.to_string(),
        },
        404 => TrackerError::NotFound {
            resource,
            ident: ident.to_string(),
        },
        412 => TrackerError::ImpersonationRejected {
            login: login.to_string(),
        },
        _ => TrackerError::Api {
            operation,
            status,
            body: truncate_for_error(body, 800),
        },
    }
}

struct RedmineSession {
    client: RedmineApiClient,
    login: TrackerLogin,
}

impl TrackerGateway for RedmineApiClient {
    fn impersonate(&self, login: &TrackerLogin) -> Box<dyn TrackerSession> {
        Box::new(RedmineSession {
            client: self.clone(),
            login: login.clone(),
        })
    }
}

#[async_trait]
impl TrackerSession for RedmineSession {
    fn login(&self) -> &TrackerLogin {
        &self.login
    }

    async fn current_user(&self) -> Result<TrackerUser, TrackerError> {
        self.client.fetch_current_user(&self.login).await
    }

    async fn project(&self, ident: &str) -> Result<Project, TrackerError> {
        self.client.fetch_project(&self.login, ident).await
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<Ticket, TrackerError> {
        self.client.post_issue(&self.login, draft).await
    }

    async fn issue(&self, id: u64) -> Result<Ticket, TrackerError> {
        self.client.fetch_issue(&self.login, id).await
    }

    async fn issues_authored_by_me(&self) -> Result<Vec<Ticket>, TrackerError> {
        self.client.fetch_issue_list(&self.login, "author_id").await
    }

    async fn issues_assigned_to_me(&self) -> Result<Vec<Ticket>, TrackerError> {
        self.client
            .fetch_issue_list(&self.login, "assigned_to_id")
            .await
    }
}

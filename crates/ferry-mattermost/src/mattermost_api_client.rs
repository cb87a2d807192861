//! Production Mattermost REST client used behind the chat gateway seam.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::chat::{ChatError, ChatGateway, MessageAttachment, PostedMessage};
use crate::mattermost_events::EventSocket;
use crate::transport_helpers::{
    is_retryable_chat_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};

const RETRY_ATTEMPT_HEADER: &str = "x-ferry-retry-attempt";

#[derive(Debug, Clone)]
pub struct MattermostClientConfig {
    pub base_url: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for MattermostClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bot_token: String::new(),
            request_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PostEnvelope {
    id: String,
    channel_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MeEnvelope {
    id: String,
}

#[derive(Clone)]
pub struct MattermostApiClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl MattermostApiClient {
    pub fn new(config: MattermostClientConfig) -> Result<Self, ChatError> {
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
            .map_err(ChatError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.trim().to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Opens the websocket event feed authenticated with this client's token.
    pub async fn connect_events(&self) -> Result<EventSocket, ChatError> {
        EventSocket::connect(&self.base_url, &self.bot_token).await
    }

    async fn request_json<T, F>(
        &self,
        operation: &'static str,
        mut builder: F,
    ) -> Result<T, ChatError>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .bearer_auth(&self.bot_token)
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .map_err(|source| ChatError::Decode { operation, source });
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_chat_status(status.as_u16())
                    {
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying chat request"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    return Err(ChatError::Api {
                        operation,
                        status: status.as_u16(),
                        body: truncate_for_error(&body, 800),
                    });
                }
                Err(source) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&source) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(ChatError::Transport { operation, source });
                }
            }
        }
    }
}

#[async_trait]
impl ChatGateway for MattermostApiClient {
    async fn bot_user_id(&self) -> Result<String, ChatError> {
        let me: MeEnvelope = self
            .request_json("current bot user", || {
                self.http.get(format!("{}/api/v4/users/me", self.base_url))
            })
            .await?;
        Ok(me.id)
    }

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        attachments: &[MessageAttachment],
    ) -> Result<PostedMessage, ChatError> {
        let mut payload = json!({
            "channel_id": channel_id,
            "message": text,
        });
        if !attachments.is_empty() {
            payload["props"] = json!({ "attachments": attachments });
        }
        let post: PostEnvelope = self
            .request_json("post message", || {
                self.http
                    .post(format!("{}/api/v4/posts", self.base_url))
                    .json(&payload)
            })
            .await?;
        Ok(PostedMessage {
            id: post.id,
            channel_id: post.channel_id,
        })
    }

    async fn post_ephemeral(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        let payload = json!({
            "user_id": user_id,
            "post": {
                "channel_id": channel_id,
                "message": text,
            },
        });
        let _: serde_json::Value = self
            .request_json("post ephemeral notice", || {
                self.http
                    .post(format!("{}/api/v4/posts/ephemeral", self.base_url))
                    .json(&payload)
            })
            .await?;
        Ok(())
    }

    async fn update_message(&self, post_id: &str, text: &str) -> Result<(), ChatError> {
        let payload = json!({ "message": text });
        let _: serde_json::Value = self
            .request_json("patch post", || {
                self.http
                    .put(format!("{}/api/v4/posts/{}/patch", self.base_url, post_id))
                    .json(&payload)
            })
            .await?;
        Ok(())
    }
}

//! Chat gateway seam and the wire types it exchanges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat api rejected {operation} with status {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("chat transport failed during {operation}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("chat response for {operation} could not be decoded")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("chat socket failed during {operation}")]
    Socket {
        operation: &'static str,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("chat socket payload could not be decoded")]
    SocketDecode(#[source] serde_json::Error),
    #[error("failed to construct chat http client")]
    Client(#[source] reqwest::Error),
}

/// One markdown attachment block rendered under a channel message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    pub text: String,
}

impl MessageAttachment {
    pub fn new(pretext: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            pretext: Some(pretext.into()),
            text: text.into(),
        }
    }
}

/// Identifier pair returned after a message is accepted by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: String,
    pub channel_id: String,
}

/// A channel message observed over the event socket, already unwrapped
/// from the envelope and post payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessageEvent {
    pub post_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub sender_username: String,
    pub text: String,
}

/// Messaging operations the bridge performs against the chat platform.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Account id the bridge itself posts under.
    async fn bot_user_id(&self) -> Result<String, ChatError>;

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        attachments: &[MessageAttachment],
    ) -> Result<PostedMessage, ChatError>;

    /// Posts a notice visible only to `user_id` inside `channel_id`.
    async fn post_ephemeral(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), ChatError>;

    /// Rewrites the body of an existing message in place.
    async fn update_message(&self, post_id: &str, text: &str) -> Result<(), ChatError>;
}

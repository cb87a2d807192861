//! Websocket event feed: connects, authenticates, and yields channel posts.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::chat::{ChatError, PostedMessageEvent};

pub(crate) fn websocket_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    let swapped = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("wss://{trimmed}")
    };
    format!("{swapped}/api/v4/websocket")
}

fn authentication_challenge(token: &str) -> String {
    json!({
        "seq": 1,
        "action": "authentication_challenge",
        "data": { "token": token },
    })
    .to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct SocketEnvelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// The `data.post` field of a `posted` envelope, which arrives as a
/// JSON document encoded inside a JSON string.
#[derive(Debug, Deserialize)]
struct PostPayload {
    id: String,
    channel_id: String,
    user_id: String,
    #[serde(default)]
    message: String,
}

fn parse_socket_envelope(message: WsMessage) -> Result<Option<SocketEnvelope>, ChatError> {
    match message {
        WsMessage::Text(text) => serde_json::from_str::<SocketEnvelope>(&text)
            .map(Some)
            .map_err(ChatError::SocketDecode),
        WsMessage::Binary(bytes) => serde_json::from_slice::<SocketEnvelope>(&bytes)
            .map(Some)
            .map_err(ChatError::SocketDecode),
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

fn normalize_posted_event(
    envelope: &SocketEnvelope,
) -> Result<Option<PostedMessageEvent>, ChatError> {
    if envelope.event.as_deref() != Some("posted") {
        return Ok(None);
    }
    let Some(raw_post) = envelope.data.get("post").and_then(|value| value.as_str()) else {
        return Ok(None);
    };
    let post = serde_json::from_str::<PostPayload>(raw_post).map_err(ChatError::SocketDecode)?;
    let sender_username = envelope
        .data
        .get("sender_name")
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .trim_start_matches('@')
        .to_string();
    Ok(Some(PostedMessageEvent {
        post_id: post.id,
        channel_id: post.channel_id,
        user_id: post.user_id,
        sender_username,
        text: post.message,
    }))
}

/// An authenticated websocket session yielding posted-message events.
pub struct EventSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl EventSocket {
    pub(crate) async fn connect(base_url: &str, token: &str) -> Result<Self, ChatError> {
        let url = websocket_url(base_url);
        let (mut stream, _response) =
            connect_async(&url)
                .await
                .map_err(|source| ChatError::Socket {
                    operation: "socket connect",
                    source,
                })?;
        stream
            .send(WsMessage::Text(authentication_challenge(token).into()))
            .await
            .map_err(|source| ChatError::Socket {
                operation: "socket auth",
                source,
            })?;
        Ok(Self { stream })
    }

    /// Waits for the next channel post. `Ok(None)` means the server closed
    /// the feed and the caller should reconnect.
    pub async fn next_posted(&mut self) -> Result<Option<PostedMessageEvent>, ChatError> {
        loop {
            let Some(message) = self.stream.next().await else {
                return Ok(None);
            };
            let message = message.map_err(|source| ChatError::Socket {
                operation: "socket read",
                source,
            })?;
            if matches!(message, WsMessage::Close(_)) {
                return Ok(None);
            }
            let Some(envelope) = parse_socket_envelope(message)? else {
                continue;
            };
            if let Some(event) = normalize_posted_event(&envelope)? {
                return Ok(Some(event));
            }
        }
    }
}

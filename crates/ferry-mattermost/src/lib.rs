//! Mattermost transport for the bridge: REST client for posting and a
//! websocket listener for channel message events.

pub mod chat;
pub mod mattermost_api_client;
pub mod mattermost_events;
pub(crate) mod transport_helpers;

pub use chat::{ChatError, ChatGateway, MessageAttachment, PostedMessage, PostedMessageEvent};
pub use mattermost_api_client::{MattermostApiClient, MattermostClientConfig};
pub use mattermost_events::EventSocket;

//! Channel watcher that rewrites `#t<id>` references into tracker links.
//!
//! One long-lived task owns the websocket feed and handles posts strictly
//! one at a time in receipt order. A message is edited at most once, and
//! only when every referenced ticket resolved; the first missing or
//! forbidden ticket aborts the whole event so a half-linked message is
//! never published.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ferry_access::IdentityDirectory;
use ferry_mattermost::{ChatGateway, MattermostApiClient, PostedMessageEvent};
use ferry_tickets::{contains_reference_tag, issue_link, scan_reference_tags, substitute_first_unlinked};

use crate::reject::{ticket_fetch_reject, Reject};
use crate::session_broker::SessionBroker;

/// What one event amounted to, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The bridge's own post, never reprocessed.
    OwnPost,
    /// No reference tag in the text, nothing to do.
    NoTags,
    /// The poster was refused; a private notice was sent instead.
    Refused,
    /// Every tag was already linked, so no edit was issued.
    Unchanged,
    /// The message was rewritten with exactly one edit call.
    Edited,
}

pub struct MessageWatcher {
    directory: Arc<IdentityDirectory>,
    broker: SessionBroker,
    chat: Arc<dyn ChatGateway>,
    tracker_base_url: String,
    bot_user_id: String,
}

impl MessageWatcher {
    pub fn new(
        directory: Arc<IdentityDirectory>,
        broker: SessionBroker,
        chat: Arc<dyn ChatGateway>,
        tracker_base_url: impl Into<String>,
        bot_user_id: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            broker,
            chat,
            tracker_base_url: tracker_base_url.into(),
            bot_user_id: bot_user_id.into(),
        }
    }

    /// Handles one posted-message event end to end. Every failure is
    /// converted into a private notice to the poster; the original message
    /// is only touched when all referenced tickets resolved.
    pub async fn process_event(&self, event: &PostedMessageEvent) -> WatchOutcome {
        if event.user_id == self.bot_user_id {
            return WatchOutcome::OwnPost;
        }
        if !contains_reference_tag(&event.text) {
            return WatchOutcome::NoTags;
        }

        let login = match self.directory.resolve(&event.sender_username) {
            Ok(login) => login,
            Err(error) => {
                self.notify_poster(event, &Reject::from(error).text).await;
                return WatchOutcome::Refused;
            }
        };

        let scope = self.broker.impersonate(&login);
        if let Err(reject) = scope.verify_account().await {
            self.notify_poster(event, &reject.text).await;
            return WatchOutcome::Refused;
        }

        let mut working = event.text.clone();
        for tag in scan_reference_tags(&event.text) {
            // An id too large for the tracker cannot name an existing
            // ticket; answer exactly like a 404.
            let Some(ticket_id) = tag.ticket_id else {
                let reject = Reject::ticket_not_found(tag.digits());
                self.notify_poster(event, &reject.text).await;
                return WatchOutcome::Refused;
            };
            match scope.issue(ticket_id).await {
                Ok(ticket) => {
                    let link = issue_link(&self.tracker_base_url, ticket.id);
                    let replacement = format!("[{}]({link})", tag.tag);
                    working = substitute_first_unlinked(&working, &tag.tag, &replacement);
                }
                Err(error) => {
                    let reject = ticket_fetch_reject(ticket_id, error);
                    self.notify_poster(event, &reject.text).await;
                    return WatchOutcome::Refused;
                }
            }
        }

        if working == event.text {
            return WatchOutcome::Unchanged;
        }
        if let Err(error) = self.chat.update_message(&event.post_id, &working).await {
            tracing::warn!(post_id = %event.post_id, error = %error, "message edit failed");
            return WatchOutcome::Refused;
        }
        tracing::info!(post_id = %event.post_id, "rewrote ticket references");
        WatchOutcome::Edited
    }

    async fn notify_poster(&self, event: &PostedMessageEvent, text: &str) {
        if let Err(error) = self
            .chat
            .post_ephemeral(&event.user_id, &event.channel_id, text)
            .await
        {
            tracing::warn!(
                channel_id = %event.channel_id,
                error = %error,
                "private notice failed"
            );
        }
    }

    /// Connects the event feed and processes posts until ctrl-c. A dropped
    /// socket is reconnected after `reconnect_delay`; processing within one
    /// session stays strictly sequential.
    pub async fn run(
        &self,
        client: &MattermostApiClient,
        reconnect_delay: Duration,
    ) -> Result<()> {
        loop {
            let socket = match client.connect_events().await {
                Ok(socket) => socket,
                Err(error) => {
                    tracing::warn!(error = %error, "watcher socket connect failed");
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("watcher shutdown requested");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(reconnect_delay) => {}
                    }
                    continue;
                }
            };
            tracing::info!("watcher socket connected");

            if self.run_socket_session(socket).await {
                return Ok(());
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("watcher shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(reconnect_delay) => {}
            }
        }
    }

    /// Drains one socket session. Returns `true` when shutdown was
    /// requested, `false` when the feed closed or failed and a reconnect
    /// is due.
    async fn run_socket_session(&self, mut socket: ferry_mattermost::EventSocket) -> bool {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("watcher shutdown requested");
                    return true;
                }
                next = socket.next_posted() => {
                    match next {
                        Ok(Some(event)) => {
                            let outcome = self.process_event(&event).await;
                            tracing::debug!(post_id = %event.post_id, ?outcome, "event handled");
                        }
                        Ok(None) => {
                            tracing::warn!("watcher event feed closed");
                            return false;
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "watcher event feed failed");
                            return false;
                        }
                    }
                }
            }
        }
    }
}

//! Operations behind the slash commands: help, the two create paths and
//! the two listings. Every operation resolves the caller's identity first
//! and turns taxonomy failures into `Reject` replies; nothing here panics
//! on user input.

use std::sync::Arc;

use ferry_access::{ChatIdentity, IdentityDirectory};
use ferry_mattermost::{ChatGateway, MessageAttachment};
use ferry_tickets::{parse_batch_input, FormInput};

use crate::reject::{gateway_reject, Reject};
use crate::report_render::{
    no_tickets_by_you, no_tickets_for_you, render_batch_created, render_form_created, render_help,
    render_tickets_by_me, render_tickets_for_me, CreationReport,
};
use crate::session_broker::SessionBroker;
use crate::ticket_pipeline::{create_batch, prevalidate_batch, validate_form_request};

/// Shared state behind every command handler. Cheap to clone per request;
/// the identity table and gateways are shared read-only.
#[derive(Clone)]
pub struct Bridge {
    directory: Arc<IdentityDirectory>,
    broker: SessionBroker,
    chat: Arc<dyn ChatGateway>,
    tracker_base_url: String,
}

impl Bridge {
    pub fn new(
        directory: Arc<IdentityDirectory>,
        broker: SessionBroker,
        chat: Arc<dyn ChatGateway>,
        tracker_base_url: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            broker,
            chat,
            tracker_base_url: tracker_base_url.into(),
        }
    }

    pub fn directory(&self) -> &IdentityDirectory {
        &self.directory
    }

    pub fn broker(&self) -> &SessionBroker {
        &self.broker
    }

    pub fn chat(&self) -> &Arc<dyn ChatGateway> {
        &self.chat
    }

    pub fn tracker_base_url(&self) -> &str {
        &self.tracker_base_url
    }

    /// Personalized help page. Requires a registered and active account so
    /// unregistered users get the onboarding error instead of command docs.
    pub async fn help(&self, user: &ChatIdentity) -> Result<String, Reject> {
        let login = self.directory.resolve(&user.username)?;
        let scope = self.broker.impersonate(&login);
        scope.verify_account().await?;
        Ok(render_help(&user.display_name()))
    }

    /// Single-ticket form path: the full validation pipeline, one create
    /// call as the requester, then the channel announcement.
    pub async fn create_from_form(
        &self,
        user: &ChatIdentity,
        channel_id: &str,
        input: &FormInput,
    ) -> Result<String, Reject> {
        let login = self.directory.resolve(&user.username)?;
        let requester = self.broker.impersonate(&login);
        let validated =
            validate_form_request(&requester, &self.broker, &self.directory, input).await?;

        let assignee_username = validated
            .assignee_chat_username
            .clone()
            .unwrap_or_else(|| user.username.clone());
        let ticket = requester
            .create_issue(&validated.draft)
            .await
            .map_err(|error| gateway_reject("tracker issue create", error))?;

        let report = render_form_created(
            &user.display_name(),
            &user.username,
            &assignee_username,
            &ticket,
            &self.tracker_base_url,
        );
        self.announce(channel_id, &report).await
    }

    /// Batch path: parse the whole message, check every assignee, then
    /// create the tickets in input order as the requester.
    pub async fn create_from_batch(
        &self,
        user: &ChatIdentity,
        channel_id: &str,
        project_identifier: &str,
        text: &str,
    ) -> Result<String, Reject> {
        let today = ferry_core::local_today();
        let items = parse_batch_input(text, today)?;
        if items.is_empty() {
            return Err(Reject::batch_malformed());
        }

        let login = self.directory.resolve(&user.username)?;
        let requester = self.broker.impersonate(&login);
        requester.verify_account().await?;
        requester.verify_membership(project_identifier).await?;

        let assignments =
            prevalidate_batch(&self.broker, &self.directory, project_identifier, &items).await?;
        let created = create_batch(&requester, project_identifier, today, &assignments).await?;

        let report = render_batch_created(
            &user.display_name(),
            &user.username,
            &created,
            &self.tracker_base_url,
        );
        self.announce(channel_id, &report).await
    }

    /// Tickets the caller authored, newest first as the tracker returns
    /// them. An empty set answers a personalized plain-text reply.
    pub async fn tickets_by_me(&self, user: &ChatIdentity) -> Result<String, Reject> {
        let login = self.directory.resolve(&user.username)?;
        let scope = self.broker.impersonate(&login);
        scope.verify_account().await?;
        let tickets = scope
            .issues_authored_by_me()
            .await
            .map_err(|error| gateway_reject("tracker authored listing", error))?;
        let author = user.display_name();
        if tickets.is_empty() {
            return Ok(no_tickets_by_you(&author));
        }
        Ok(render_tickets_by_me(
            &author,
            &tickets,
            &self.tracker_base_url,
        ))
    }

    /// Tickets assigned to the caller, same shape as `tickets_by_me`.
    pub async fn tickets_for_me(&self, user: &ChatIdentity) -> Result<String, Reject> {
        let login = self.directory.resolve(&user.username)?;
        let scope = self.broker.impersonate(&login);
        scope.verify_account().await?;
        let tickets = scope
            .issues_assigned_to_me()
            .await
            .map_err(|error| gateway_reject("tracker assigned listing", error))?;
        let author = user.display_name();
        if tickets.is_empty() {
            return Ok(no_tickets_for_you(&author));
        }
        Ok(render_tickets_for_me(
            &author,
            &tickets,
            &self.tracker_base_url,
        ))
    }

    /// Posts the creation announcement into the originating channel and
    /// hands the header line back as the command reply.
    async fn announce(&self, channel_id: &str, report: &CreationReport) -> Result<String, Reject> {
        let attachment = MessageAttachment::new(report.pretext.clone(), report.table.clone());
        self.chat
            .post_message(channel_id, &report.header, std::slice::from_ref(&attachment))
            .await
            .map_err(|error| gateway_reject("chat announcement post", error))?;
        Ok(report.header.clone())
    }
}

//! HTTP surface for the slash commands. Each endpoint decodes the chat
//! platform's call payload (acting user context plus submitted values),
//! runs the matching bridge operation and answers `{type, text}` JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ferry_access::ChatIdentity;
use ferry_tickets::FormInput;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::bridge_commands::Bridge;
use crate::reject::Reject;

pub const PING_ENDPOINT: &str = "/ping";
pub const HELP_ENDPOINT: &str = "/help";
pub const NEW_TASK_SUBMIT_ENDPOINT: &str = "/new_task_submit";
pub const NEW_TASKS_SUBMIT_ENDPOINT: &str = "/new_tasks_submit";
pub const TASKS_BY_ME_ENDPOINT: &str = "/tasks_by_me";
pub const TASKS_FOR_ME_ENDPOINT: &str = "/tasks_for_me";

#[derive(Debug, Clone)]
pub struct CommandServerConfig {
    pub bind: String,
}

/// Inbound call payload: who is acting, where, and the submitted values.
#[derive(Debug, Clone, Deserialize)]
pub struct CallPayload {
    #[serde(default)]
    pub context: CallContext,
    #[serde(default)]
    pub values: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallContext {
    #[serde(default)]
    pub acting_user: ActingUser,
    #[serde(default)]
    pub channel: ChannelRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActingUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelRef {
    #[serde(default)]
    pub id: String,
}

/// Outbound `{type, text}` body; `text` is omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CallResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            kind: "ok".to_string(),
            text: Some(text.into()),
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            kind: "ok".to_string(),
            text: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            text: Some(text.into()),
        }
    }
}

impl From<Result<String, Reject>> for CallResponse {
    fn from(outcome: Result<String, Reject>) -> Self {
        match outcome {
            Ok(text) => CallResponse::ok(text),
            Err(reject) => CallResponse::error(reject.text),
        }
    }
}

/// One `{label, value}` option as the form select fields submit them.
#[derive(Debug, Clone, Default, Deserialize)]
struct SelectOption {
    #[serde(default)]
    label: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct NewTaskValues {
    project: SelectOption,
    tracker: SelectOption,
    subject: String,
    #[serde(default)]
    description: Option<String>,
    status: SelectOption,
    priority: SelectOption,
    #[serde(default)]
    assignee: Option<SelectOption>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    estimated_time: Option<String>,
    done: SelectOption,
}

#[derive(Debug, Deserialize)]
struct NewTasksValues {
    project: SelectOption,
    message: String,
}

fn acting_identity(payload: &CallPayload) -> ChatIdentity {
    let user = &payload.context.acting_user;
    ChatIdentity {
        id: user.id.clone(),
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    }
}

/// Maps a form submission onto `FormInput`. Select values that fail to
/// parse as their numeric ids make the whole submission invalid.
fn form_input_from_values(values: &NewTaskValues) -> Option<FormInput> {
    Some(FormInput {
        project_identifier: values.project.value.clone(),
        tracker_id: values.tracker.value.parse().ok()?,
        subject: values.subject.clone(),
        description: values.description.clone(),
        status_id: values.status.value.parse().ok()?,
        priority_id: values.priority.value.parse().ok()?,
        assignee_username: values
            .assignee
            .as_ref()
            .map(|option| option.label.clone())
            .filter(|label| !label.is_empty()),
        start_date: values.start_date.clone(),
        end_date: values.end_date.clone(),
        estimated_time: values.estimated_time.clone(),
        done_ratio: values.done.value.parse().ok()?,
    })
}

struct CommandServerState {
    bridge: Bridge,
}

pub fn build_command_router(bridge: Bridge) -> Router {
    let state = Arc::new(CommandServerState { bridge });
    Router::new()
        .route(PING_ENDPOINT, post(handle_ping))
        .route(HELP_ENDPOINT, post(handle_help))
        .route(NEW_TASK_SUBMIT_ENDPOINT, post(handle_new_task_submit))
        .route(NEW_TASKS_SUBMIT_ENDPOINT, post(handle_new_tasks_submit))
        .route(TASKS_BY_ME_ENDPOINT, post(handle_tasks_by_me))
        .route(TASKS_FOR_ME_ENDPOINT, post(handle_tasks_for_me))
        .with_state(state)
}

/// Binds the command server and serves it until ctrl-c.
pub async fn run_command_server(config: CommandServerConfig, bridge: Bridge) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind command server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound command server address")?;
    tracing::info!(%local_addr, "command server listening");

    let app = build_command_router(bridge);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("command server exited unexpectedly")
}

async fn handle_ping() -> Json<CallResponse> {
    Json(CallResponse::ok_empty())
}

async fn handle_help(
    State(state): State<Arc<CommandServerState>>,
    Json(payload): Json<CallPayload>,
) -> Json<CallResponse> {
    let user = acting_identity(&payload);
    Json(state.bridge.help(&user).await.into())
}

async fn handle_new_task_submit(
    State(state): State<Arc<CommandServerState>>,
    Json(payload): Json<CallPayload>,
) -> Json<CallResponse> {
    let user = acting_identity(&payload);
    let channel_id = payload.context.channel.id.clone();
    let Ok(values) = serde_json::from_value::<NewTaskValues>(payload.values.clone()) else {
        return Json(CallResponse::error(Reject::batch_malformed().text));
    };
    let Some(input) = form_input_from_values(&values) else {
        return Json(CallResponse::error(Reject::batch_malformed().text));
    };
    Json(
        state
            .bridge
            .create_from_form(&user, &channel_id, &input)
            .await
            .into(),
    )
}

async fn handle_new_tasks_submit(
    State(state): State<Arc<CommandServerState>>,
    Json(payload): Json<CallPayload>,
) -> Json<CallResponse> {
    let user = acting_identity(&payload);
    let channel_id = payload.context.channel.id.clone();
    let Ok(values) = serde_json::from_value::<NewTasksValues>(payload.values.clone()) else {
        return Json(CallResponse::error(Reject::batch_malformed().text));
    };
    Json(
        state
            .bridge
            .create_from_batch(&user, &channel_id, &values.project.value, &values.message)
            .await
            .into(),
    )
}

async fn handle_tasks_by_me(
    State(state): State<Arc<CommandServerState>>,
    Json(payload): Json<CallPayload>,
) -> Json<CallResponse> {
    let user = acting_identity(&payload);
    Json(state.bridge.tickets_by_me(&user).await.into())
}

async fn handle_tasks_for_me(
    State(state): State<Arc<CommandServerState>>,
    Json(payload): Json<CallPayload>,
) -> Json<CallResponse> {
    let user = acting_identity(&payload);
    Json(state.bridge.tickets_for_me(&user).await.into())
}

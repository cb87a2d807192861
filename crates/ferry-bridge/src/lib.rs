//! Bridge orchestration: the user-facing refusal taxonomy, impersonated
//! session broker, ticket validation pipeline, slash-command operations,
//! the channel message watcher and the HTTP command server.

pub mod bridge_commands;
pub mod command_server;
pub mod message_watcher;
pub mod reject;
pub mod report_render;
pub mod session_broker;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod ticket_pipeline;

pub use bridge_commands::Bridge;
pub use command_server::{
    build_command_router, run_command_server, CallPayload, CallResponse, CommandServerConfig,
};
pub use message_watcher::{MessageWatcher, WatchOutcome};
pub use reject::{Reject, RejectKind};
pub use report_render::{render_ticket_table, CreationReport};
pub use session_broker::{ImpersonationScope, SessionBroker};
pub use ticket_pipeline::{
    create_batch, prevalidate_batch, validate_form_request, BatchAssignment, CreatedTicket,
    ValidatedTicketRequest,
};

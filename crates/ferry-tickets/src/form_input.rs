//! Raw ticket-form fields as submitted by the chat client.

/// Field values collected from the single-ticket form, before validation.
/// Date and estimate fields stay textual here; the validation pipeline owns
/// their parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub project_identifier: String,
    pub tracker_id: u32,
    pub subject: String,
    pub description: Option<String>,
    pub status_id: u32,
    pub priority_id: u32,
    pub assignee_username: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub estimated_time: Option<String>,
    pub done_ratio: u8,
}

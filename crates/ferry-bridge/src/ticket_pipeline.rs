//! Validation and creation sequencing for single-form and batch requests.
//!
//! Checks run in a fixed order and the first failure wins: requester
//! account, requester project membership, assignee identity, assignee
//! account, assignee membership, then the field checks. Nothing is created
//! until every check has passed.

use chrono::NaiveDate;

use ferry_access::IdentityDirectory;
use ferry_redmine::{IssueDraft, Ticket};
use ferry_tickets::{
    check_date_order, check_subject_length, parse_estimate, parse_optional_date, BatchItem,
    FormInput,
};

use crate::reject::{gateway_reject, Reject};
use crate::session_broker::{ImpersonationScope, SessionBroker};

/// A fully validated form request, ready to submit as the requester.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTicketRequest {
    pub draft: IssueDraft,
    pub assignee_chat_username: Option<String>,
}

/// One batch line after assignee-side validation, ready to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAssignment {
    pub subject: String,
    pub assignee_chat_username: String,
    pub assignee_id: u64,
    pub due_date: NaiveDate,
}

/// A created ticket paired with the chat username it was assigned to, for
/// the channel announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedTicket {
    pub ticket: Ticket,
    pub assignee_chat_username: String,
}

/// Runs the full check sequence for a form submission. The requester scope
/// stays open with the caller; the assignee is checked under a nested scope
/// that closes before this function returns.
pub async fn validate_form_request(
    requester: &ImpersonationScope,
    broker: &SessionBroker,
    directory: &IdentityDirectory,
    input: &FormInput,
) -> Result<ValidatedTicketRequest, Reject> {
    requester.verify_account().await?;
    requester.verify_membership(&input.project_identifier).await?;

    let assignee_chat_username = input
        .assignee_username
        .as_deref()
        .filter(|name| !name.is_empty());
    let mut assigned_to_id = None;
    if let Some(assignee_username) = assignee_chat_username {
        let assignee_login = directory.resolve(assignee_username)?;
        let assignee_scope = broker.impersonate(&assignee_login);
        let assignee = assignee_scope.verify_account().await?;
        assignee_scope
            .verify_membership(&input.project_identifier)
            .await?;
        assigned_to_id = Some(assignee.id);
    }

    let start_date = parse_optional_date(input.start_date.as_deref())?;
    let due_date = parse_optional_date(input.end_date.as_deref())?;
    check_date_order(start_date, due_date)?;
    let estimated_hours = parse_estimate(input.estimated_time.as_deref())?;
    check_subject_length(&input.subject)?;

    Ok(ValidatedTicketRequest {
        draft: IssueDraft {
            project_id: input.project_identifier.clone(),
            subject: input.subject.clone(),
            tracker_id: Some(u64::from(input.tracker_id)),
            description: input.description.clone(),
            status_id: Some(u64::from(input.status_id)),
            priority_id: Some(u64::from(input.priority_id)),
            assigned_to_id,
            start_date,
            due_date,
            estimated_hours,
            done_ratio: Some(input.done_ratio),
        },
        assignee_chat_username: assignee_chat_username.map(str::to_string),
    })
}

/// Checks every batch assignee before anything is created: identity table
/// entry, active tracker account, project membership. Each assignee is
/// checked under their own scope, in item order, and the first failure
/// aborts the whole batch.
pub async fn prevalidate_batch(
    broker: &SessionBroker,
    directory: &IdentityDirectory,
    project_identifier: &str,
    items: &[BatchItem],
) -> Result<Vec<BatchAssignment>, Reject> {
    let mut assignments = Vec::with_capacity(items.len());
    for item in items {
        let assignee_login = directory.resolve(&item.assignee_username)?;
        let assignee_scope = broker.impersonate(&assignee_login);
        let assignee = assignee_scope.verify_account().await?;
        assignee_scope.verify_membership(project_identifier).await?;
        assignments.push(BatchAssignment {
            subject: item.subject.clone(),
            assignee_chat_username: item.assignee_username.clone(),
            assignee_id: assignee.id,
            due_date: item.due_date,
        });
    }
    Ok(assignments)
}

/// Creates the validated batch under the requester scope, in input order.
/// Every ticket starts today and carries its line's due date; tracker,
/// status and priority stay on the project defaults.
pub async fn create_batch(
    requester: &ImpersonationScope,
    project_identifier: &str,
    today: NaiveDate,
    assignments: &[BatchAssignment],
) -> Result<Vec<CreatedTicket>, Reject> {
    let mut created = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let draft = IssueDraft {
            project_id: project_identifier.to_string(),
            subject: assignment.subject.clone(),
            assigned_to_id: Some(assignment.assignee_id),
            start_date: Some(today),
            due_date: Some(assignment.due_date),
            ..IssueDraft::default()
        };
        let ticket = requester
            .create_issue(&draft)
            .await
            .map_err(|error| gateway_reject("tracker issue create", error))?;
        created.push(CreatedTicket {
            ticket,
            assignee_chat_username: assignment.assignee_chat_username.clone(),
        });
    }
    Ok(created)
}

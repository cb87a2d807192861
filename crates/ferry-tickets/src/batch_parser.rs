//! Parser for the free-text batch grammar
//! `<n>. <subject> @<assignee> <day.month.year>`.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use ferry_core::parse_bridge_date;

use crate::field_checks::SUBJECT_MAX_CHARS;

/// One parsed batch line, kept in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub position: usize,
    pub subject: String,
    pub assignee_username: String,
    pub due_date: NaiveDate,
}

/// First failure found while parsing a batch message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchParseError {
    #[error("batch item {position} does not match `<subject> @<assignee> <day.month.year>`")]
    MalformedItem { position: usize },
    #[error("batch item {position} has an unparsable due date `{text}`")]
    InvalidDueDate { position: usize, text: String },
    #[error("batch item {position} due date {due_date} is already past")]
    DueDateBeforeToday {
        position: usize,
        due_date: NaiveDate,
    },
    #[error("batch item {position} subject exceeds 255 characters")]
    SubjectTooLong { position: usize },
}

/// Splits a batch message on its `<n>. ` ordinals and validates every item.
///
/// Parsing is all-or-nothing: the first offending item aborts the whole
/// batch so a single message never produces a partial ticket set. Each item
/// is matched as a whole, taking the first `@<assignee>` that is followed by
/// a terminating due date, so subjects may themselves contain `@` mentions
/// and span several lines.
pub fn parse_batch_input(
    text: &str,
    today: NaiveDate,
) -> Result<Vec<BatchItem>, BatchParseError> {
    let mut items = Vec::new();
    for chunk in ordinal_pattern().split(text) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let position = items.len() + 1;
        let captures = item_pattern()
            .captures(chunk)
            .ok_or(BatchParseError::MalformedItem { position })?;
        let subject = captures["subject"].trim().to_string();
        let raw_assignee = &captures["assignee"];
        let assignee_username = raw_assignee
            .strip_prefix('@')
            .unwrap_or(raw_assignee)
            .to_string();
        let due_text = &captures["due"];
        let due_date =
            parse_bridge_date(due_text).ok_or_else(|| BatchParseError::InvalidDueDate {
                position,
                text: due_text.to_string(),
            })?;
        if due_date < today {
            return Err(BatchParseError::DueDateBeforeToday { position, due_date });
        }
        if subject.chars().count() > SUBJECT_MAX_CHARS {
            return Err(BatchParseError::SubjectTooLong { position });
        }
        items.push(BatchItem {
            position,
            subject,
            assignee_username,
            due_date,
        });
    }
    Ok(items)
}

fn ordinal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\. ").expect("ordinal pattern compiles"))
}

fn item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^(?P<subject>.+?)\s+@(?P<assignee>\S+)\s+(?P<due>\d+\.\d+\.\d+)$")
            .expect("item pattern compiles")
    })
}

//! Ticket domain rules shared by the command endpoints and the message
//! watcher: the free-text batch grammar, per-field form validation and
//! `#t<id>` reference handling.

mod batch_parser;
mod field_checks;
mod form_input;
mod reference_tags;

pub use batch_parser::{parse_batch_input, BatchItem, BatchParseError};
pub use field_checks::{
    check_date_order, check_subject_length, parse_estimate, parse_optional_date, FieldError,
    SUBJECT_MAX_CHARS,
};
pub use form_input::FormInput;
pub use reference_tags::{
    contains_reference_tag, issue_link, scan_reference_tags, substitute_first_unlinked,
    ReferenceTag,
};

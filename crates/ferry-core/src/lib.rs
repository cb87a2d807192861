//! Foundational helpers shared across Ferry crates.
//!
//! Provides the bridge-wide `day.month.year` date handling plus small text
//! utilities (display names, markdown-safe shortening, task pluralization)
//! used by renderers and command responses.

pub mod date_text;
pub mod text_format;

pub use date_text::{format_bridge_date, local_today, parse_bridge_date, BRIDGE_DATE_FORMAT};
pub use text_format::{display_name, shorten_text, task_word, task_word_title};

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn unit_parse_bridge_date_accepts_day_month_year() {
        let parsed = parse_bridge_date("09.05.2023").expect("date");
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2023, 5, 9).expect("ymd"));
        let single_digit = parse_bridge_date("9.5.2023").expect("date");
        assert_eq!(single_digit, parsed);
    }

    #[test]
    fn unit_parse_bridge_date_rejects_month_first_order() {
        assert!(parse_bridge_date("12.21.202").is_none());
        assert!(parse_bridge_date("2023-05-09").is_none());
        assert!(parse_bridge_date("").is_none());
    }

    #[test]
    fn unit_format_bridge_date_round_trips() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 1).expect("ymd");
        let rendered = format_bridge_date(date);
        assert_eq!(rendered, "01.12.2024");
        assert_eq!(parse_bridge_date(&rendered), Some(date));
    }

    #[test]
    fn unit_display_name_prefers_full_name() {
        assert_eq!(display_name("Vasiliy", "Fedorov", "vasiliy.fedorov"), "Vasiliy Fedorov");
        assert_eq!(display_name("", "", "vasiliy.fedorov"), "vasiliy.fedorov");
        assert_eq!(display_name("Vasiliy", "", "vasiliy.fedorov"), "Vasiliy");
        assert_eq!(display_name("", "Fedorov", "vasiliy.fedorov"), "Fedorov");
    }

    #[test]
    fn unit_shorten_text_collapses_and_truncates() {
        assert_eq!(shorten_text("short subject", 50), "short subject");
        assert_eq!(shorten_text("spaced    out\n\ttext", 50), "spaced out text");
        let shortened = shorten_text(
            "a very long subject line that keeps going well past the limit",
            30,
        );
        assert!(shortened.chars().count() <= 30);
        assert!(shortened.ends_with("[...]"));
        assert_eq!(shorten_text("antidisestablishmentarianism", 10), "[...]");
    }

    #[test]
    fn unit_task_word_singular_plural() {
        assert_eq!(task_word(1), "task");
        assert_eq!(task_word(0), "tasks");
        assert_eq!(task_word(3), "tasks");
        assert_eq!(task_word_title(1), "Task");
        assert_eq!(task_word_title(2), "Tasks");
    }
}

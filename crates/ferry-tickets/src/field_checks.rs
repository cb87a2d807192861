//! Field-level checks shared by the form and batch creation paths.

use chrono::NaiveDate;
use thiserror::Error;

use ferry_core::parse_bridge_date;

/// Longest subject the tracker accepts.
pub const SUBJECT_MAX_CHARS: usize = 255;

/// A single form field that failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("date `{text}` is not in day.month.year form")]
    InvalidDateFormat { text: String },
    #[error("start date {start} falls after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    #[error("estimated time `{text}` is not a whole number of hours")]
    InvalidEstimate { text: String },
    #[error("subject exceeds 255 characters")]
    SubjectTooLong,
}

/// Parses an optional `day.month.year` field. Absent or empty input is a
/// valid "no date" answer, anything else must parse.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, FieldError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    parse_bridge_date(raw)
        .map(Some)
        .ok_or_else(|| FieldError::InvalidDateFormat {
            text: raw.to_string(),
        })
}

/// Rejects a start date that falls after the end date. Either side may be
/// absent, in which case there is nothing to compare.
pub fn check_date_order(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), FieldError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(FieldError::StartAfterEnd { start, end });
        }
    }
    Ok(())
}

/// Parses the optional estimated-hours field into a whole hour count.
pub fn parse_estimate(value: Option<&str>) -> Result<Option<u32>, FieldError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| FieldError::InvalidEstimate {
            text: raw.to_string(),
        })
}

/// Rejects subjects longer than the tracker's column limit, counted in
/// characters rather than bytes.
pub fn check_subject_length(subject: &str) -> Result<(), FieldError> {
    if subject.chars().count() > SUBJECT_MAX_CHARS {
        return Err(FieldError::SubjectTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn unit_parse_optional_date_accepts_absent_and_empty_values() {
        assert_eq!(parse_optional_date(None), Ok(None));
        assert_eq!(parse_optional_date(Some("")), Ok(None));
    }

    #[test]
    fn unit_parse_optional_date_parses_day_month_year() {
        assert_eq!(
            parse_optional_date(Some("03.03.2023")),
            Ok(Some(date(2023, 3, 3)))
        );
        assert_eq!(
            parse_optional_date(Some("9.5.2023")),
            Ok(Some(date(2023, 5, 9)))
        );
    }

    #[test]
    fn unit_parse_optional_date_rejects_month_day_order() {
        assert_eq!(
            parse_optional_date(Some("12.21.2021")),
            Err(FieldError::InvalidDateFormat {
                text: "12.21.2021".to_string()
            })
        );
    }

    #[test]
    fn unit_parse_optional_date_rejects_truncated_year() {
        let result = parse_optional_date(Some("12.21.202"));
        assert!(matches!(
            result,
            Err(FieldError::InvalidDateFormat { .. })
        ));
    }

    #[test]
    fn unit_check_date_order_rejects_start_after_end() {
        let start = date(2023, 5, 10);
        let end = date(2023, 5, 9);
        assert_eq!(
            check_date_order(Some(start), Some(end)),
            Err(FieldError::StartAfterEnd { start, end })
        );
    }

    #[test]
    fn unit_check_date_order_allows_missing_sides() {
        assert_eq!(check_date_order(None, Some(date(2023, 5, 9))), Ok(()));
        assert_eq!(check_date_order(Some(date(2023, 5, 9)), None), Ok(()));
        assert_eq!(check_date_order(None, None), Ok(()));
    }

    #[test]
    fn unit_check_date_order_allows_equal_dates() {
        let day = date(2023, 5, 9);
        assert_eq!(check_date_order(Some(day), Some(day)), Ok(()));
    }

    #[test]
    fn unit_parse_estimate_accepts_whole_hours_and_absence() {
        assert_eq!(parse_estimate(None), Ok(None));
        assert_eq!(parse_estimate(Some("8")), Ok(Some(8)));
        assert_eq!(parse_estimate(Some(" 12 ")), Ok(Some(12)));
    }

    #[test]
    fn unit_parse_estimate_rejects_fractions_and_text() {
        assert_eq!(
            parse_estimate(Some("2.5")),
            Err(FieldError::InvalidEstimate {
                text: "2.5".to_string()
            })
        );
        assert_eq!(
            parse_estimate(Some("soon")),
            Err(FieldError::InvalidEstimate {
                text: "soon".to_string()
            })
        );
        assert_eq!(
            parse_estimate(Some("-4")),
            Err(FieldError::InvalidEstimate {
                text: "-4".to_string()
            })
        );
    }

    #[test]
    fn unit_check_subject_length_counts_characters_not_bytes() {
        let cyrillic = "ы".repeat(255);
        assert_eq!(check_subject_length(&cyrillic), Ok(()));
        let too_long = "ы".repeat(256);
        assert_eq!(check_subject_length(&too_long), Err(FieldError::SubjectTooLong));
    }

    #[test]
    fn unit_check_subject_length_accepts_boundary() {
        let subject = "a".repeat(255);
        assert_eq!(check_subject_length(&subject), Ok(()));
    }
}

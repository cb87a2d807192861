use chrono::{Local, NaiveDate};

/// Date layout used everywhere the bridge reads or writes dates.
pub const BRIDGE_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parses a `day.month.year` date, tolerating surrounding whitespace.
pub fn parse_bridge_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), BRIDGE_DATE_FORMAT).ok()
}

/// Renders a date in the bridge-wide `day.month.year` layout.
pub fn format_bridge_date(date: NaiveDate) -> String {
    date.format(BRIDGE_DATE_FORMAT).to_string()
}

/// Returns today's date in the server's local timezone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

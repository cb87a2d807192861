#![no_main]

use chrono::NaiveDate;
use ferry_tickets::parse_batch_input;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("fixed date");

    match parse_batch_input(&text, today) {
        Ok(items) => {
            for (index, item) in items.iter().enumerate() {
                assert_eq!(item.position, index + 1);
                assert!(!item.subject.is_empty());
                assert!(item.subject.chars().count() <= 255);
                assert!(item.due_date >= today);
            }
        }
        Err(error) => {
            // Failures must describe themselves without panicking.
            assert!(!error.to_string().is_empty());
        }
    }
});

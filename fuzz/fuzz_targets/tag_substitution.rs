#![no_main]

use ferry_tickets::{issue_link, scan_reference_tags, substitute_first_unlinked};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).into_owned();

    let mut rewritten = text.clone();
    for tag in scan_reference_tags(&text) {
        let Some(id) = tag.ticket_id else { continue };
        let link = issue_link("https://rm.example", id);
        let replacement = format!("[{}]({link})", tag.tag);
        rewritten = substitute_first_unlinked(&rewritten, &tag.tag, &replacement);
    }

    // A second pass over the rewritten text must change nothing: every
    // occurrence is either linked already or was never a tag.
    let mut second = rewritten.clone();
    for tag in scan_reference_tags(&rewritten) {
        let Some(id) = tag.ticket_id else { continue };
        let link = issue_link("https://rm.example", id);
        let replacement = format!("[{}]({link})", tag.tag);
        second = substitute_first_unlinked(&second, &tag.tag, &replacement);
    }
    assert_eq!(second, rewritten);
});

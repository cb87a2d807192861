//! `#t<id>` ticket references inside chat messages.

use std::sync::OnceLock;

use regex::Regex;

/// One `#t<id>` occurrence found in a message, in reading order.
/// `ticket_id` is `None` when the digit run does not fit a ticket id; such
/// a ticket cannot exist, so callers treat the reference as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTag {
    pub tag: String,
    pub ticket_id: Option<u64>,
}

impl ReferenceTag {
    /// The digit run as written, kept verbatim for notices even when it
    /// does not parse as an id.
    pub fn digits(&self) -> &str {
        &self.tag["#t".len()..]
    }
}

/// Cheap pre-filter so messages without references skip all tracker work.
pub fn contains_reference_tag(text: &str) -> bool {
    tag_pattern().is_match(text)
}

/// Collects every `#t<id>` occurrence, duplicates included.
pub fn scan_reference_tags(text: &str) -> Vec<ReferenceTag> {
    tag_pattern()
        .captures_iter(text)
        .filter_map(|captures| {
            let tag = captures.get(0)?.as_str().to_string();
            let ticket_id = captures.get(1)?.as_str().parse::<u64>().ok();
            Some(ReferenceTag { tag, ticket_id })
        })
        .collect()
}

/// Browser URL of a ticket.
pub fn issue_link(base_url: &str, ticket_id: u64) -> String {
    format!("{}/issues/{}", base_url.trim_end_matches('/'), ticket_id)
}

/// Replaces the first occurrence of `tag` that is not already part of a
/// markdown link, leaving the text untouched when every occurrence is
/// linked. Already-linked occurrences are recognised by the `[` directly in
/// front of them, which is what a previous substitution leaves behind.
pub fn substitute_first_unlinked(text: &str, tag: &str, replacement: &str) -> String {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(tag) {
        let start = search_from + offset;
        if text[..start].ends_with('[') {
            search_from = start + tag.len();
            continue;
        }
        let mut rewritten = String::with_capacity(text.len() + replacement.len());
        rewritten.push_str(&text[..start]);
        rewritten.push_str(replacement);
        rewritten.push_str(&text[start + tag.len()..]);
        return rewritten;
    }
    text.to_string()
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#t(\d+)").expect("tag pattern compiles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_contains_reference_tag_requires_digits() {
        assert!(contains_reference_tag("посмотри #t42 пожалуйста"));
        assert!(!contains_reference_tag("посмотри #task пожалуйста"));
        assert!(!contains_reference_tag("без ссылок"));
    }

    #[test]
    fn unit_scan_reference_tags_keeps_reading_order_and_duplicates() {
        let tags = scan_reference_tags("#t7 и #t100, потом снова #t7");
        assert_eq!(
            tags,
            vec![
                ReferenceTag {
                    tag: "#t7".to_string(),
                    ticket_id: Some(7)
                },
                ReferenceTag {
                    tag: "#t100".to_string(),
                    ticket_id: Some(100)
                },
                ReferenceTag {
                    tag: "#t7".to_string(),
                    ticket_id: Some(7)
                },
            ]
        );
    }

    #[test]
    fn unit_scan_reference_tags_takes_maximal_digit_run() {
        let tags = scan_reference_tags("#t421");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].ticket_id, Some(421));
    }

    #[test]
    fn regression_overflowing_id_is_kept_without_a_ticket_id() {
        let tags = scan_reference_tags("#t99999999999999999999999999");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag, "#t99999999999999999999999999");
        assert_eq!(tags[0].ticket_id, None);
        assert_eq!(tags[0].digits(), "99999999999999999999999999");
    }

    #[test]
    fn unit_issue_link_trims_trailing_slash() {
        assert_eq!(
            issue_link("https://redmine.example/", 42),
            "https://redmine.example/issues/42"
        );
    }

    #[test]
    fn unit_substitute_first_unlinked_replaces_leftmost_occurrence() {
        let rewritten = substitute_first_unlinked("см. #t42 и ещё раз #t42", "#t42", "[#t42](url)");
        assert_eq!(rewritten, "см. [#t42](url) и ещё раз #t42");
    }

    #[test]
    fn unit_substitute_first_unlinked_skips_already_linked_occurrence() {
        let rewritten =
            substitute_first_unlinked("см. [#t42](url) и ещё раз #t42", "#t42", "[#t42](url)");
        assert_eq!(rewritten, "см. [#t42](url) и ещё раз [#t42](url)");
    }

    #[test]
    fn unit_substitute_first_unlinked_handles_tag_at_start() {
        let rewritten = substitute_first_unlinked("#t1 в начале", "#t1", "[#t1](url)");
        assert_eq!(rewritten, "[#t1](url) в начале");
    }

    #[test]
    fn unit_substitute_first_unlinked_returns_input_when_all_linked() {
        let text = "только [#t42](url) здесь";
        assert_eq!(substitute_first_unlinked(text, "#t42", "[#t42](url)"), text);
    }

    #[test]
    fn unit_substitute_is_stable_for_prefix_tags_processed_left_to_right() {
        // #t42 is a prefix of #t421; after both passes the short tag must not
        // eat into the long tag's link.
        let mut text = "#t42 и #t421".to_string();
        for tag in scan_reference_tags(&text) {
            let id = tag.ticket_id.expect("fits");
            let replacement = format!("[{}](https://rm/issues/{})", tag.tag, id);
            text = substitute_first_unlinked(&text, &tag.tag, &replacement);
        }
        assert_eq!(
            text,
            "[#t42](https://rm/issues/42) и [#t421](https://rm/issues/421)"
        );
    }

    #[test]
    fn unit_substitute_twice_with_same_tag_is_idempotent() {
        let replacement = "[#t9](https://rm/issues/9)";
        let once = substitute_first_unlinked("fix #t9", "#t9", replacement);
        let twice = substitute_first_unlinked(&once, "#t9", replacement);
        assert_eq!(once, twice);
    }
}

const SHORTEN_PLACEHOLDER: &str = " [...]";

/// Picks the name shown to a user: full name when any part is set, else the username.
pub fn display_name(first_name: &str, last_name: &str, username: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

/// Collapses runs of whitespace and truncates on a word boundary, appending
/// `[...]` when anything was dropped. Width is counted in characters so
/// non-ASCII subjects truncate the same as ASCII ones.
pub fn shorten_text(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let placeholder_len = SHORTEN_PLACEHOLDER.chars().count();
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0usize;
    for word in &words {
        let sep = usize::from(!kept.is_empty());
        let next = used + sep + word.chars().count();
        if next + placeholder_len > width {
            break;
        }
        used = next;
        kept.push(word);
    }

    if kept.is_empty() {
        return SHORTEN_PLACEHOLDER.trim_start().to_string();
    }
    let mut out = kept.join(" ");
    out.push_str(SHORTEN_PLACEHOLDER);
    out
}

/// Singular/plural wording for ticket counts.
pub fn task_word(count: usize) -> &'static str {
    if count == 1 {
        "task"
    } else {
        "tasks"
    }
}

/// Capitalized variant of [`task_word`] for headings and link labels.
pub fn task_word_title(count: usize) -> &'static str {
    if count == 1 {
        "Task"
    } else {
        "Tasks"
    }
}

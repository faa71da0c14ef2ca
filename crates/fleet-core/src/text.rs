//! Character-safe text shortening used for task previews and result excerpts.

/// Keep at most `max_chars` characters of `s`.
///
/// Counts characters rather than bytes, so multi-byte text is never split.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Keep at most the last `max_chars` characters of `s`.
pub fn tail_chars(s: &str, max_chars: usize) -> &str {
    let total = s.chars().count();
    if total <= max_chars {
        return s;
    }
    match s.char_indices().nth(total - max_chars) {
        Some((start, _)) => &s[start..],
        None => "",
    }
}

/// One-line preview of a prompt: truncated to `max_chars` characters with
/// line breaks flattened to spaces so it renders in a single table cell.
pub fn task_preview(prompt: &str, max_chars: usize) -> String {
    truncate_chars(prompt, max_chars)
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_untouched() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn long_text_cut_at_char_count() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("hello", 0), "");
    }

    #[test]
    fn multibyte_never_split() {
        assert_eq!(truncate_chars("café au lait", 4), "café");
        assert_eq!(truncate_chars("hi🦀bye", 3), "hi🦀");
        assert_eq!(truncate_chars("———", 2), "——");
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail_chars("hello world", 5), "world");
        assert_eq!(tail_chars("hi", 5), "hi");
        assert_eq!(tail_chars("hi", 0), "");
        assert_eq!(tail_chars("a🦀b", 2), "🦀b");
    }

    #[test]
    fn preview_flattens_newlines() {
        assert_eq!(task_preview("fix\nthe\r\nbug", 100), "fix the  bug");
    }

    #[test]
    fn preview_truncates_before_flattening() {
        let prompt = format!("{}\nsecond line", "a".repeat(120));
        let preview = task_preview(&prompt, 100);
        assert_eq!(preview.chars().count(), 100);
        assert!(!preview.contains('\n'));
    }
}

//! Text shaping applied before embedding.

/// Builds the block that is embedded and stored for a file.
pub fn labeled_block(path: &str, content: &str) -> String {
    format!("File: {path}\n\n{content}")
}

/// Returns the first `max_chars` characters of `text`.
///
/// Cuts on a char boundary, so the result is always valid UTF-8 and
/// `truncate_chars(truncate_chars(t, n), n) == truncate_chars(t, n)`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_block_layout() {
        assert_eq!(labeled_block("src/a.rs", "fn a() {}"), "File: src/a.rs\n\nfn a() {}");
    }

    #[test]
    fn truncation_is_idempotent() {
        let long = "x".repeat(5000);
        let once = truncate_chars(&long, 3000);
        assert_eq!(once.chars().count(), 3000);
        assert_eq!(truncate_chars(once, 3000), once);

        let short = "short text";
        assert_eq!(truncate_chars(short, 3000), short);
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        let text = "äöü€漢字";
        assert_eq!(truncate_chars(text, 4), "äöü€");
        assert_eq!(truncate_chars(text, 0), "");
    }
}

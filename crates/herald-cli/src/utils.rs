//! Shared utilities

/// Shorten message text for one-line previews such as `/history`.
///
/// Counts characters rather than bytes, so accented or multi-byte text is
/// never cut inside a character; "..." marks that text was dropped.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

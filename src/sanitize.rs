//! Input sanitation for user chat messages.
//!
//! This is a best-effort cleanup pass (whitespace normalization, markup
//! stripping, length capping). It does not parse HTML and is not an
//! injection boundary.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest sanitized message (in characters) before truncation kicks in.
pub const MAX_SANITIZED_CHARS: usize = 4000;

/// Marker appended to truncated messages.
pub const TRUNCATION_MARKER: &str = "...";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").expect("static regex"));
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex"));

/// Normalize a raw user message.
///
/// Steps, in order:
/// - trim and collapse every whitespace run (newlines included) to one space
/// - drop `<script>...</script>` blocks (case-insensitive, across lines)
/// - drop any remaining `<...>` tags
/// - cap at [`MAX_SANITIZED_CHARS`] characters, appending [`TRUNCATION_MARKER`]
///
/// Empty input yields an empty string.
pub fn sanitize_message(message: &str) -> String {
    if message.is_empty() {
        return String::new();
    }

    let collapsed = WHITESPACE_RUN.replace_all(message.trim(), " ");
    let without_scripts = SCRIPT_BLOCK.replace_all(&collapsed, "");
    let stripped = MARKUP_TAG.replace_all(&without_scripts, "");

    let char_count = stripped.chars().count();
    if char_count > MAX_SANITIZED_CHARS {
        let mut truncated: String = stripped.chars().take(MAX_SANITIZED_CHARS).collect();
        truncated.push_str(TRUNCATION_MARKER);
        tracing::warn!(
            original_chars = char_count,
            limit = MAX_SANITIZED_CHARS,
            "Message truncated due to length limit"
        );
        return truncated;
    }

    stripped.into_owned()
}

/// Rough token estimate: one token per four characters.
///
/// The provider's reported usage is authoritative; this is only a local
/// approximation for logging.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

//! Utility functions for file and folder naming

use crate::types::Message;

/// Maximum length (in characters) of a sanitized path component
const MAX_COMPONENT_CHARS: usize = 100;

/// Characters that are invalid in file names on at least one major filesystem
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Map arbitrary text to a safe filesystem path component
///
/// Reserved characters become `_`, control characters (U+0000 to U+001F) are
/// dropped, and the result is capped at 100 characters and trimmed. Empty input
/// yields an empty string; callers supply their own fallback. Results made only
/// of dots (`.`, `..`) would name the current or parent directory and are also
/// returned empty.
///
/// # Examples
///
/// ```
/// use album_dl::utils::sanitize_name;
///
/// assert_eq!(sanitize_name(" a/b:c*d "), "a_b_c_d");
/// assert_eq!(sanitize_name(""), "");
/// assert_eq!(sanitize_name(".."), "");
/// ```
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let capped: String = raw
        .chars()
        .filter(|c| !matches!(*c, '\u{0}'..='\u{1f}'))
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_COMPONENT_CHARS)
        .collect();
    let trimmed = capped.trim();
    if trimmed.chars().all(|c| c == '.') {
        return String::new();
    }
    trimmed.to_string()
}

/// Destination filename for a message's media
///
/// Prefers the name declared by the source, then `<id><extension>`, then
/// `<id>.unknown`. If sanitizing leaves nothing, falls back to `<id>.bin`.
#[must_use]
pub fn media_filename(message: &Message) -> String {
    let media = message.media.as_ref();
    let declared = media
        .and_then(|m| m.name.as_deref())
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let candidate = declared.unwrap_or_else(|| {
        match media.and_then(|m| m.normalized_extension()) {
            Some(ext) => format!("{}{}", message.id, ext),
            None => format!("{}.unknown", message.id),
        }
    });

    let sanitized = sanitize_name(&candidate);
    if sanitized.is_empty() {
        format!("{}.bin", message.id)
    } else {
        sanitized
    }
}

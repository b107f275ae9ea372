//! Projections of the record list: display text and the non-empty subset.

use crate::records::Record;

/// Default ceiling on the flattened text, in characters.
pub const MAX_INPUT_CHARS: usize = 4000;

/// Records with a non-blank key or value, in their original order.
pub fn filter_non_empty(records: &[Record]) -> Vec<Record> {
    records.iter().filter(|r| !r.is_blank()).cloned().collect()
}

/// Joins non-empty records as `key: value` lines and truncates the result to
/// `max_chars` characters.
///
/// A record with a blank key contributes its value alone instead of
/// `: value`, so plain text entered as a single value passes through
/// unchanged.
pub fn flatten(records: &[Record], max_chars: usize) -> String {
    let lines: Vec<String> = records
        .iter()
        .filter(|r| !r.is_blank())
        .map(|r| {
            if r.key.trim().is_empty() {
                r.value.clone()
            } else {
                format!("{}: {}", r.key, r.value)
            }
        })
        .collect();
    truncate(&lines.join("\n"), max_chars)
}

/// First `max_chars` characters of `text`. Idempotent.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => text[..byte].to_string(),
        None => text.to_string(),
    }
}

/// `used/max` counter shown next to the input area.
pub fn counter(text: &str, max_chars: usize) -> String {
    format!("{}/{}", text.chars().count(), max_chars)
}

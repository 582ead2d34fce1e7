//! Title normalization and the title gate.
//!
//! Matching is exact after normalization: case, surrounding punctuation and
//! whitespace runs are ignored, nothing else is.

/// Characters stripped from both ends of a title, in addition to whitespace
const EDGE_CHARS: &[char] = &['"', '\'', '?', '!', '.', ','];

/// Canonicalize a title for comparison.
///
/// Strips surrounding whitespace, quotes, `?`, `!`, `.` and `,`, collapses
/// whitespace runs to a single space and lower-cases the result.
pub fn normalize(title: &str) -> String {
    title
        .trim_matches(|c: char| c.is_whitespace() || EDGE_CHARS.contains(&c))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether two titles denote the same work.
///
/// Absent titles never match; providers sometimes omit a result's title.
pub fn matches(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => normalize(a) == normalize(b),
        _ => false,
    }
}

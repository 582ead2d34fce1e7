//! Record consolidation: shaping raw provider payloads into records.
//!
//! Consolidation is per provider response. Nothing here merges records from
//! different providers.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::models::{fields, PartialRecord};

/// Raw Dimensions fields kept before derived fields are computed
pub const DIMENSIONS_SOURCE_FIELDS: [&str; 6] = [
    fields::AUTHORS,
    fields::DOI,
    fields::LINKOUT,
    "concepts",
    "terms",
    fields::JOURNAL,
];

/// Fields a shaped Dimensions record may contain
pub const DIMENSIONS_OUTPUT_FIELDS: [&str; 5] = [
    fields::AUTHORS,
    fields::DOI,
    fields::LINKOUT,
    fields::KEYWORDS,
    fields::JOURNAL_TITLE,
];

/// Keep only the allowed keys of `raw`, preserving their order.
pub fn allow_list(raw: &Map<String, Value>, allowed: &[&str]) -> Map<String, Value> {
    raw.iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Deduplicated union of keyword lists, in first-seen order.
///
/// Entries may be plain strings or objects carrying a `concept` or `name`.
pub fn keyword_union<'a>(lists: impl IntoIterator<Item = Option<&'a Value>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for list in lists.into_iter().flatten() {
        let Some(items) = list.as_array() else {
            continue;
        };
        for item in items {
            let keyword = match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => obj
                    .get("concept")
                    .or_else(|| obj.get("name"))
                    .and_then(Value::as_str),
                _ => None,
            };
            if let Some(keyword) = keyword {
                if seen.insert(keyword.to_string()) {
                    keywords.push(keyword.to_string());
                }
            }
        }
    }

    keywords
}

/// Shape one Dimensions publication.
///
/// Filter to the source allow-list, derive `keywords` from `terms` and
/// `concepts` and `journal_title` from `journal.title`, then filter again to
/// the output allow-list. Derived fields are only added when at least one of
/// their sources is present.
pub fn format_dimensions(raw: &Map<String, Value>) -> PartialRecord {
    let mut shaped = allow_list(raw, &DIMENSIONS_SOURCE_FIELDS);

    if shaped.contains_key("terms") || shaped.contains_key("concepts") {
        let keywords = keyword_union([shaped.get("terms"), shaped.get("concepts")]);
        shaped.insert(fields::KEYWORDS.to_string(), Value::from(keywords));
    }

    let journal_title = shaped
        .get(fields::JOURNAL)
        .and_then(|journal| journal.get("title"))
        .cloned();
    if let Some(title) = journal_title {
        shaped.insert(fields::JOURNAL_TITLE.to_string(), title);
    }

    PartialRecord::from(allow_list(&shaped, &DIMENSIONS_OUTPUT_FIELDS))
}

/// Take a verbatim JSON payload as a record.
///
/// Objects are used as-is; for arrays the first object element is used.
pub fn first_object(value: Value) -> Option<PartialRecord> {
    match value {
        Value::Object(map) => Some(PartialRecord::from(map)),
        Value::Array(items) => items.into_iter().find_map(|item| match item {
            Value::Object(map) => Some(PartialRecord::from(map)),
            _ => None,
        }),
        _ => None,
    }
}

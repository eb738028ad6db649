//! The tag vocabulary and its sentinel semantics.

use std::collections::BTreeMap;

use serde_json::Value;

/// Value substituted for any tag the index could not provide. Downstream
/// label sets must keep constant cardinality, so tags are filled, never
/// omitted.
pub const SENTINEL: &str = "UNTAGGED";

/// Tag name → source-document key. The `tags.` entries live under the
/// index's tag envelope; account and region are document-level fields.
const FIXED_VOCABULARY: [(&str, &str); 7] = [
    ("Environment", "tags.Environment"),
    ("Stack", "tags.Stack"),
    ("Application", "tags.Application"),
    ("Role", "tags.Role"),
    ("WorkLoad", "tags.WorkLoad"),
    ("accountname", "accountname"),
    ("region", "region"),
];

/// Normalized tag name → value. Ordered so label output is deterministic.
pub type TagSet = BTreeMap<String, String>;

/// The fully-sentineled set for a mapping: the fixed vocabulary plus the
/// mapping's additional labels, every value `UNTAGGED`.
///
/// Single source of truth for "fully populated but untagged" — the success
/// path starts from this set and overwrites what the index provides.
pub fn default_tag_set(additional_labels: &[String]) -> TagSet {
    let mut tags = TagSet::new();
    for (name, _) in FIXED_VOCABULARY {
        tags.insert(name.to_string(), SENTINEL.to_string());
    }
    for name in additional_labels {
        tags.insert(name.clone(), SENTINEL.to_string());
    }
    tags
}

/// Extract the vocabulary from a unique source document. Keys the document
/// lacks (or carries with a non-string value) keep the sentinel.
pub fn extract_tags(
    source: &serde_json::Map<String, Value>,
    additional_labels: &[String],
) -> TagSet {
    let mut tags = default_tag_set(additional_labels);
    for (name, key) in FIXED_VOCABULARY {
        if let Some(value) = source.get(key).and_then(Value::as_str) {
            tags.insert(name.to_string(), value.to_string());
        }
    }
    for name in additional_labels {
        let key = format!("tags.{name}");
        if let Some(value) = source.get(&key).and_then(Value::as_str) {
            tags.insert(name.clone(), value.to_string());
        }
    }
    tags
}

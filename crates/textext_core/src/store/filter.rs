//! Composable list filters.
//!
//! Remote backends receive filters as JSON query strings. Local backends
//! evaluate them with `matches`, using the same semantics:
//! - `Equal` on an array field matches when any element equals any value.
//! - `Contains` is array membership: any element equals any value. On a
//!   string field it is a substring match.
//! - `Search` is a case-insensitive substring match on a string field or on
//!   any string element of an array field.
//! - `Limit` caps the result after all predicates.

use super::{Document, Fields};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equal { field: String, values: Vec<Value> },
    Contains { field: String, values: Vec<Value> },
    Search { field: String, text: String },
    Limit(u32),
}

impl Filter {
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    /// Membership in an array attribute.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Contains {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn search(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Search {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn limit(limit: u32) -> Self {
        Self::Limit(limit)
    }

    /// Evaluates a predicate filter. `Limit` always matches.
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Self::Equal { field, values } => match fields.get(field) {
                Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
                Some(value) => values.contains(value),
                None => values.contains(&Value::Null),
            },
            Self::Contains { field, values } => match fields.get(field) {
                Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
                Some(Value::String(value)) => values
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|needle| value.contains(needle)),
                _ => false,
            },
            Self::Search { field, text } => {
                let needle = text.trim().to_lowercase();
                match fields.get(field) {
                    Some(Value::String(value)) => value.to_lowercase().contains(&needle),
                    Some(Value::Array(items)) => items.iter().any(|item| {
                        item.as_str()
                            .is_some_and(|value| value.to_lowercase().contains(&needle))
                    }),
                    _ => false,
                }
            }
            Self::Limit(_) => true,
        }
    }

    /// Encodes the filter in the backend's JSON query syntax.
    pub fn to_query(&self) -> String {
        let value = match self {
            Self::Equal { field, values } => {
                json!({ "method": "equal", "attribute": field, "values": values })
            }
            Self::Contains { field, values } => {
                json!({ "method": "contains", "attribute": field, "values": values })
            }
            Self::Search { field, text } => {
                json!({ "method": "search", "attribute": field, "values": [text] })
            }
            Self::Limit(limit) => json!({ "method": "limit", "values": [limit] }),
        };
        value.to_string()
    }
}

/// Applies predicates then the tightest limit, preserving input order.
pub fn apply(documents: Vec<Document>, filters: &[Filter]) -> Vec<Document> {
    let limit = filters
        .iter()
        .filter_map(|filter| match filter {
            Filter::Limit(limit) => Some(*limit as usize),
            _ => None,
        })
        .min();

    let matched = documents
        .into_iter()
        .filter(|document| filters.iter().all(|filter| filter.matches(&document.fields)));

    match limit {
        Some(limit) => matched.take(limit).collect(),
        None => matched.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, Filter};
    use crate::store::{Collection, Document};
    use serde_json::{json, Value};

    fn doc(id: &str, fields: Value) -> Document {
        Document {
            id: id.to_string(),
            collection: Collection::Meetings,
            created_at: 0,
            updated_at: 0,
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn equal_matches_array_membership() {
        let filter = Filter::equal("Attendees", "u2");
        assert!(filter.matches(&doc("a", json!({ "Attendees": ["u1", "u2"] })).fields));
        assert!(!filter.matches(&doc("b", json!({ "Attendees": ["u3"] })).fields));
    }

    #[test]
    fn contains_matches_array_membership_only_for_listed_values() {
        let filter = Filter::contains("Assignees", "u2");
        assert!(filter.matches(&doc("a", json!({ "Assignees": ["u1", "u2"] })).fields));
        assert!(!filter.matches(&doc("b", json!({ "Assignees": ["u22"] })).fields));
        assert!(!filter.matches(&doc("c", json!({})).fields));
    }

    #[test]
    fn equal_on_bool_field() {
        let filter = Filter::equal("Completed", false);
        assert!(filter.matches(&doc("a", json!({ "Completed": false })).fields));
        assert!(!filter.matches(&doc("b", json!({ "Completed": true })).fields));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let filter = Filter::search("username", "ADA");
        assert!(filter.matches(&doc("a", json!({ "username": "lovelace_ada" })).fields));
        assert!(!filter.matches(&doc("b", json!({ "username": 42 })).fields));
    }

    #[test]
    fn limit_applies_after_predicates() {
        let documents = vec![
            doc("a", json!({ "Category": "x" })),
            doc("b", json!({ "Category": "y" })),
            doc("c", json!({ "Category": "y" })),
        ];
        let filtered = apply(documents, &[Filter::equal("Category", "y"), Filter::limit(1)]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "b");
    }

    #[test]
    fn query_encoding_uses_method_attribute_values() {
        let encoded: Value =
            serde_json::from_str(&Filter::equal("Creator", "acct").to_query()).unwrap();
        assert_eq!(
            encoded,
            json!({ "method": "equal", "attribute": "Creator", "values": ["acct"] })
        );
        let contains: Value =
            serde_json::from_str(&Filter::contains("Attendees", "acct").to_query()).unwrap();
        assert_eq!(
            contains,
            json!({ "method": "contains", "attribute": "Attendees", "values": ["acct"] })
        );
        let limit: Value = serde_json::from_str(&Filter::limit(5).to_query()).unwrap();
        assert_eq!(limit, json!({ "method": "limit", "values": [5] }));
    }
}

//! Engine-independent field schema
//!
//! Processors describe the shape of their result with `FieldSchema`.
//! `to_mapping` is the one place where search-engine mapping syntax is
//! produced.

use serde_json::{json, Map, Value};

/// Shape of one indexed field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSchema {
    /// Exact-match string
    Keyword,
    /// Exact-match string with a full-text `text` sub-field
    KeywordWithText,
    /// Full-text string
    Text,
    /// Full-text string with an exact-match `keyword` sub-field
    TextWithKeyword { ignore_above: u32 },
    Long,
    Float,
    /// Arbitrary object, fields mapped dynamically
    DynamicObject,
    /// Object kept in the document but not indexed
    StoredOnly,
    /// Field kept in the document but not indexed
    Disabled,
    /// Object with explicitly mapped properties, in declaration order
    Object(Vec<(String, FieldSchema)>),
}

impl FieldSchema {
    /// Build an `Object` from `(name, schema)` pairs
    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, FieldSchema)>) -> Self {
        FieldSchema::Object(
            fields
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
        )
    }

    /// Render to search-engine mapping JSON
    pub fn to_mapping(&self) -> Value {
        match self {
            FieldSchema::Keyword => json!({"type": "keyword"}),
            FieldSchema::KeywordWithText => json!({
                "type": "keyword",
                "fields": {"text": {"type": "text"}}
            }),
            FieldSchema::Text => json!({"type": "text"}),
            FieldSchema::TextWithKeyword { ignore_above } => json!({
                "type": "text",
                "fields": {"keyword": {"type": "keyword", "ignore_above": ignore_above}}
            }),
            FieldSchema::Long => json!({"type": "long"}),
            FieldSchema::Float => json!({"type": "float"}),
            FieldSchema::DynamicObject => json!({"type": "object"}),
            FieldSchema::StoredOnly => json!({"type": "object", "enabled": false}),
            FieldSchema::Disabled => json!({"enabled": false}),
            FieldSchema::Object(fields) => {
                let mut properties = Map::new();
                for (name, schema) in fields {
                    properties.insert(name.clone(), schema.to_mapping());
                }
                json!({ "properties": properties })
            }
        }
    }
}

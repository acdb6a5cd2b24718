//! Common types used across the spares workspace

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ValidationError;

// ============================================================================
// Side-channel Values
// ============================================================================

/// Upstream fields not recognized by the canonical schema, in upstream order.
pub type ExtraFields = IndexMap<String, ExtraValue>;

/// A value captured in the extra-field side channel.
///
/// This is a closed set: anything the upstream can send as JSON maps onto
/// exactly one variant, which keeps table formatting exhaustive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<ExtraValue>),
    Map(IndexMap<String, ExtraValue>),
}

impl ExtraValue {
    /// Short name of the variant, used by field statistics
    pub fn kind(&self) -> &'static str {
        match self {
            ExtraValue::Null => "null",
            ExtraValue::Bool(_) => "boolean",
            ExtraValue::Number(_) => "number",
            ExtraValue::String(_) => "string",
            ExtraValue::List(_) => "list",
            ExtraValue::Map(_) => "map",
        }
    }

    /// Convert into a JSON value whose object keys are sorted, recursively
    pub fn to_canonical_json(&self) -> JsonValue {
        match self {
            ExtraValue::Null => JsonValue::Null,
            ExtraValue::Bool(b) => JsonValue::Bool(*b),
            ExtraValue::Number(n) => JsonValue::Number(n.clone()),
            ExtraValue::String(s) => JsonValue::String(s.clone()),
            ExtraValue::List(items) => {
                JsonValue::Array(items.iter().map(ExtraValue::to_canonical_json).collect())
            },
            ExtraValue::Map(map) => sorted_object(map),
        }
    }
}

impl From<JsonValue> for ExtraValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ExtraValue::Null,
            JsonValue::Bool(b) => ExtraValue::Bool(b),
            JsonValue::Number(n) => ExtraValue::Number(n),
            JsonValue::String(s) => ExtraValue::String(s),
            JsonValue::Array(items) => {
                ExtraValue::List(items.into_iter().map(ExtraValue::from).collect())
            },
            JsonValue::Object(map) => ExtraValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ExtraValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::String(value.to_string())
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        ExtraValue::Number(value.into())
    }
}

fn sorted_object(map: &IndexMap<String, ExtraValue>) -> JsonValue {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut object = serde_json::Map::new();
    for key in keys {
        if let Some(value) = map.get(key) {
            object.insert(key.clone(), value.to_canonical_json());
        }
    }
    JsonValue::Object(object)
}

/// Canonical text of an extra-field map.
///
/// Keys are sorted recursively and an absent map renders like an empty one,
/// so two maps with the same content always produce the same text.
pub fn canonical_extra_json(extra: Option<&ExtraFields>) -> String {
    match extra {
        Some(map) => sorted_object(map).to_string(),
        None => "{}".to_string(),
    }
}

// ============================================================================
// Canonical Record
// ============================================================================

/// The normalized representation of one catalog item.
///
/// `code` is the identity key and is supplied by the upstream system. `price`
/// and `updated_at` are kept as opaque text; they are only reformatted when
/// the record is serialized for the downstream consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Unique, immutable identity key
    pub code: String,

    /// Display name (required before the record is stored)
    pub name: String,

    pub description: Option<String>,

    #[serde(rename = "type")]
    pub spare_type: Option<String>,

    pub status: Option<String>,

    /// Price as upstream text, never parsed
    pub price: Option<String>,

    pub quantity: Option<i32>,

    /// Upstream modification timestamp, opaque text
    pub updated_at: Option<String>,

    /// Unrecognized upstream fields; `None` rather than empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<ExtraFields>,

    /// Assigned by the store on every write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl CanonicalRecord {
    /// Create a record with only the required fields set
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
            spare_type: None,
            status: None,
            price: None,
            quantity: None,
            updated_at: None,
            extra: None,
            synced_at: None,
        }
    }

    /// Check the invariants a record must satisfy before it is stored
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.is_empty() {
            return Err(ValidationError::MissingCode);
        }
        if self.name.is_empty() {
            return Err(ValidationError::MissingName {
                code: self.code.clone(),
            });
        }
        Ok(())
    }

    /// Look up a side-channel field by its upstream key
    pub fn extra_value(&self, key: &str) -> Option<&ExtraValue> {
        self.extra.as_ref().and_then(|extra| extra.get(key))
    }

    /// Canonical text of the side-channel fields
    pub fn extra_canonical_json(&self) -> String {
        canonical_extra_json(self.extra.as_ref())
    }
}

// ============================================================================
// Audit Log
// ============================================================================

/// Why a history snapshot was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// A sync run observed a difference against the stored state
    Sync,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
        }
    }
}

impl std::fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of a record as it was before an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Surrogate identity of the history row
    pub id: i64,

    /// The record state that was replaced
    #[serde(flatten)]
    pub snapshot: CanonicalRecord,

    /// When the snapshot was taken
    pub changed_at: DateTime<Utc>,

    /// Tag identifying what triggered the change
    pub reason: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_validate_requires_code_and_name() {
        assert_eq!(
            CanonicalRecord::new("", "Bolt").validate(),
            Err(ValidationError::MissingCode)
        );
        assert_eq!(
            CanonicalRecord::new("X1", "").validate(),
            Err(ValidationError::MissingName {
                code: "X1".to_string()
            })
        );
        assert!(CanonicalRecord::new("X1", "Bolt").validate().is_ok());
    }

    #[test]
    fn test_extra_value_from_json() {
        let value = ExtraValue::from(json!({"color": "red", "sizes": [1, 2], "ok": true}));
        let ExtraValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map.get("color"), Some(&ExtraValue::from("red")));
        assert_eq!(map.get("ok"), Some(&ExtraValue::Bool(true)));
        assert_eq!(map.get("sizes").map(ExtraValue::kind), Some("list"));
    }

    #[test]
    fn test_canonical_json_absent_equals_empty() {
        assert_eq!(canonical_extra_json(None), "{}");
        assert_eq!(canonical_extra_json(Some(&ExtraFields::new())), "{}");
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let mut inner = IndexMap::new();
        inner.insert("z".to_string(), ExtraValue::from(1_i64));
        inner.insert("a".to_string(), ExtraValue::from(2_i64));

        let mut extra = ExtraFields::new();
        extra.insert("weight".to_string(), ExtraValue::from("2kg"));
        extra.insert("dims".to_string(), ExtraValue::Map(inner));

        assert_eq!(
            canonical_extra_json(Some(&extra)),
            r#"{"dims":{"a":2,"z":1},"weight":"2kg"}"#
        );
    }

    #[test]
    fn test_record_serialization_omits_absent_extra() {
        let record = CanonicalRecord::new("X1", "Bolt");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("extra").is_none());
        assert_eq!(value["code"], json!("X1"));
        assert_eq!(value["type"], json!(null));
    }

    #[test]
    fn test_extra_fields_keep_insertion_order_through_serde() {
        let mut extra = ExtraFields::new();
        extra.insert("zeta".to_string(), ExtraValue::from("1"));
        extra.insert("alpha".to_string(), ExtraValue::from("2"));

        let text = serde_json::to_string(&extra).unwrap();
        assert_eq!(text, r#"{"zeta":"1","alpha":"2"}"#);

        let back: ExtraFields = serde_json::from_str(&text).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_change_reason_as_str() {
        assert_eq!(ChangeReason::Sync.as_str(), "sync");
        assert_eq!(ChangeReason::Sync.to_string(), "sync");
    }

    proptest! {
        #[test]
        fn canonical_json_ignores_key_order(
            entries in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8)
        ) {
            let forward: ExtraFields = entries
                .iter()
                .map(|(k, v)| (k.clone(), ExtraValue::from(*v)))
                .collect();
            let backward: ExtraFields = entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), ExtraValue::from(*v)))
                .collect();

            prop_assert_eq!(
                canonical_extra_json(Some(&forward)),
                canonical_extra_json(Some(&backward))
            );
        }
    }
}

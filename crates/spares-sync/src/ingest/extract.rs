//! Page extraction from heterogeneous upstream envelopes
//!
//! The integration platform has returned pages in several shapes over time.
//! Each shape is an [`Envelope`] and they are tried in [`EXTRACTION_CHAIN`]
//! order; the first match wins. The order matters: a payload such as
//! `{"data": [...], "meta": [...]}` must resolve to `data`, not to the first
//! list-valued field.

use serde_json::Value;

use crate::error::IngestionError;
use crate::normalize::{find_code, RawRecord};

/// A recognized response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// The payload itself is the list
    BareList,
    /// `{"data": [...]}`
    DataField,
    /// `{"spares": [...]}`
    SparesField,
    /// `{"items": [...]}`
    ItemsField,
    /// A single object carrying a code field
    SingleRecord,
    /// Any object: the first field holding a list
    FirstListField,
}

/// Envelopes in the order they are tried
pub const EXTRACTION_CHAIN: [Envelope; 6] = [
    Envelope::BareList,
    Envelope::DataField,
    Envelope::SparesField,
    Envelope::ItemsField,
    Envelope::SingleRecord,
    Envelope::FirstListField,
];

impl Envelope {
    fn matches(self, payload: &Value) -> bool {
        match self {
            Envelope::BareList => payload.is_array(),
            Envelope::DataField => field_is_list(payload, "data"),
            Envelope::SparesField => field_is_list(payload, "spares"),
            Envelope::ItemsField => field_is_list(payload, "items"),
            Envelope::SingleRecord => payload
                .as_object()
                .is_some_and(|map| find_code(map).is_some()),
            Envelope::FirstListField => payload
                .as_object()
                .is_some_and(|map| map.values().any(Value::is_array)),
        }
    }

    /// Take the list out of a payload this envelope matched
    fn take(self, payload: Value) -> Vec<Value> {
        let take_field = |payload: Value, key: &str| match payload {
            Value::Object(mut map) => match map.remove(key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        match self {
            Envelope::BareList => match payload {
                Value::Array(items) => items,
                _ => Vec::new(),
            },
            Envelope::DataField => take_field(payload, "data"),
            Envelope::SparesField => take_field(payload, "spares"),
            Envelope::ItemsField => take_field(payload, "items"),
            Envelope::SingleRecord => vec![payload],
            Envelope::FirstListField => match payload {
                Value::Object(map) => map
                    .into_iter()
                    .find_map(|(_, value)| match value {
                        Value::Array(items) => Some(items),
                        _ => None,
                    })
                    .unwrap_or_default(),
                _ => Vec::new(),
            },
        }
    }
}

fn field_is_list(payload: &Value, key: &str) -> bool {
    payload.get(key).is_some_and(Value::is_array)
}

/// Records pulled out of one page
#[derive(Debug, Default)]
pub struct Extracted {
    /// Shape that matched, `None` when nothing usable was found
    pub envelope: Option<Envelope>,
    pub records: Vec<RawRecord>,
}

/// Run the extraction chain over a decoded page.
///
/// A payload that matches no envelope is an empty page. A matched list that
/// contains anything other than objects is malformed.
pub fn extract_records(payload: Value, page: u32) -> Result<Extracted, IngestionError> {
    let Some(envelope) = EXTRACTION_CHAIN.into_iter().find(|e| e.matches(&payload)) else {
        return Ok(Extracted::default());
    };

    let records = envelope
        .take(payload)
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(IngestionError::malformed(
                page,
                format!("element {} of {:?} is not an object: {}", index, envelope, other),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Extracted {
        envelope: Some(envelope),
        records,
    })
}

//! Field normalization
//!
//! Upstream records arrive as loose JSON objects whose keys may be spelled in
//! camel case (`spareCode`) or snake case (`spare_code`). [`normalize`] maps
//! them onto a [`CanonicalRecord`] and keeps every key it does not recognize
//! in the record's `extra` map, in upstream order.

use serde_json::{Map, Value};
use spares_common::{CanonicalRecord, ExtraFields, ExtraValue, ValidationError};
use tracing::debug;

/// One record as received from the upstream system
pub type RawRecord = Map<String, Value>;

/// A canonical field and the two spellings it may arrive under
struct Alias {
    camel: &'static str,
    snake: &'static str,
}

const CODE: Alias = Alias {
    camel: "spareCode",
    snake: "spare_code",
};
const NAME: Alias = Alias {
    camel: "spareName",
    snake: "spare_name",
};
const DESCRIPTION: Alias = Alias {
    camel: "spareDescription",
    snake: "spare_description",
};
const TYPE: Alias = Alias {
    camel: "spareType",
    snake: "spare_type",
};
const STATUS: Alias = Alias {
    camel: "spareStatus",
    snake: "spare_status",
};
const PRICE: Alias = Alias {
    camel: "price",
    snake: "price",
};
const QUANTITY: Alias = Alias {
    camel: "quantity",
    snake: "quantity",
};
const UPDATED_AT: Alias = Alias {
    camel: "updatedAt",
    snake: "updated_at",
};

const ALIASES: [&Alias; 8] = [
    &CODE,
    &NAME,
    &DESCRIPTION,
    &TYPE,
    &STATUS,
    &PRICE,
    &QUANTITY,
    &UPDATED_AT,
];

/// Whether `key` is one of the spellings of a canonical field
pub fn is_known_key(key: &str) -> bool {
    ALIASES
        .iter()
        .any(|alias| alias.camel == key || alias.snake == key)
}

impl Alias {
    /// First non-null value, camel spelling first
    fn pick<'a>(&self, raw: &'a RawRecord) -> Option<&'a Value> {
        [self.camel, self.snake]
            .into_iter()
            .filter_map(|key| raw.get(key))
            .find(|value| !value.is_null())
    }
}

/// Code text when `value` can identify a record: any non-empty string,
/// whitespace included, or a non-zero number
pub fn usable_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// First usable code, camel spelling first
pub fn find_code(raw: &RawRecord) -> Option<String> {
    [CODE.camel, CODE.snake]
        .into_iter()
        .filter_map(|key| raw.get(key))
        .find_map(usable_code)
}

/// Map an upstream record onto the canonical schema.
///
/// Fails when no usable code is present or the quantity is not an integer.
/// A missing name is not rejected here; the store refuses such records.
pub fn normalize(raw: &RawRecord) -> Result<CanonicalRecord, ValidationError> {
    let code = find_code(raw).ok_or(ValidationError::MissingCode)?;

    let quantity = match QUANTITY.pick(raw) {
        Some(value) => parse_quantity(value).map_err(|()| ValidationError::InvalidQuantity {
            code: code.clone(),
            value: value.to_string(),
        })?,
        None => None,
    };

    let extra = collect_extra(raw);
    if let Some(ref fields) = extra {
        debug!(
            code = %code,
            keys = ?fields.keys().collect::<Vec<_>>(),
            "Captured extra fields"
        );
    }

    Ok(CanonicalRecord {
        name: NAME.pick(raw).and_then(text).unwrap_or_default(),
        description: DESCRIPTION.pick(raw).and_then(text),
        spare_type: TYPE.pick(raw).and_then(text),
        status: STATUS.pick(raw).and_then(text),
        price: PRICE.pick(raw).and_then(text),
        quantity,
        updated_at: UPDATED_AT.pick(raw).and_then(text),
        extra,
        synced_at: None,
        code,
    })
}

/// Render a scalar as opaque text; empty strings count as absent
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_quantity(value: &Value) -> Result<Option<i32>, ()> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return i32::try_from(i).map(Some).map_err(|_| ());
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 => {
                    Ok(Some(f as i32))
                },
                _ => Err(()),
            }
        },
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i32>() {
                return Ok(Some(i));
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 => {
                    Ok(Some(f as i32))
                },
                _ => Err(()),
            }
        },
        _ => Err(()),
    }
}

fn collect_extra(raw: &RawRecord) -> Option<ExtraFields> {
    let extra: ExtraFields = raw
        .iter()
        .filter(|(key, value)| !is_known_key(key) && !value.is_null())
        .map(|(key, value)| (key.clone(), ExtraValue::from(value.clone())))
        .collect();

    if extra.is_empty() {
        None
    } else {
        Some(extra)
    }
}

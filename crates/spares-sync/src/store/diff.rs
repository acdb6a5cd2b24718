//! Field-wise comparison of stored and incoming records

use serde::Serialize;
use spares_common::CanonicalRecord;

/// A field whose change produces a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedField {
    Name,
    Description,
    Type,
    Status,
    Price,
    Quantity,
    UpdatedAt,
    Extra,
}

/// Every tracked field in comparison order
pub const TRACKED_FIELDS: [TrackedField; 8] = [
    TrackedField::Name,
    TrackedField::Description,
    TrackedField::Type,
    TrackedField::Status,
    TrackedField::Price,
    TrackedField::Quantity,
    TrackedField::UpdatedAt,
    TrackedField::Extra,
];

impl TrackedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Name => "name",
            TrackedField::Description => "description",
            TrackedField::Type => "type",
            TrackedField::Status => "status",
            TrackedField::Price => "price",
            TrackedField::Quantity => "quantity",
            TrackedField::UpdatedAt => "updatedAt",
            TrackedField::Extra => "extra",
        }
    }

    fn differs(self, stored: &CanonicalRecord, incoming: &CanonicalRecord) -> bool {
        match self {
            TrackedField::Name => stored.name != incoming.name,
            TrackedField::Description => text(&stored.description) != text(&incoming.description),
            TrackedField::Type => text(&stored.spare_type) != text(&incoming.spare_type),
            TrackedField::Status => text(&stored.status) != text(&incoming.status),
            TrackedField::Price => text(&stored.price) != text(&incoming.price),
            TrackedField::Quantity => stored.quantity != incoming.quantity,
            TrackedField::UpdatedAt => text(&stored.updated_at) != text(&incoming.updated_at),
            TrackedField::Extra => {
                stored.extra_canonical_json() != incoming.extra_canonical_json()
            },
        }
    }
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Absent and empty compare equal
fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Tracked fields that differ between the stored and incoming state
pub fn changed_fields(stored: &CanonicalRecord, incoming: &CanonicalRecord) -> Vec<TrackedField> {
    TRACKED_FIELDS
        .into_iter()
        .filter(|field| field.differs(stored, incoming))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use spares_common::{ExtraFields, ExtraValue};

    fn bolt() -> CanonicalRecord {
        CanonicalRecord {
            price: Some("9.50".to_string()),
            quantity: Some(4),
            ..CanonicalRecord::new("A", "Bolt")
        }
    }

    #[test]
    fn test_identical_records_have_no_changes() {
        let stored = CanonicalRecord {
            synced_at: Some(Utc::now()),
            ..bolt()
        };
        assert!(changed_fields(&stored, &bolt()).is_empty());
    }

    #[test]
    fn test_absent_equals_empty() {
        let stored = CanonicalRecord {
            description: Some(String::new()),
            ..bolt()
        };
        assert!(changed_fields(&stored, &bolt()).is_empty());

        let with_empty_extra = CanonicalRecord {
            extra: Some(ExtraFields::new()),
            ..bolt()
        };
        assert!(changed_fields(&with_empty_extra, &bolt()).is_empty());
    }

    #[test]
    fn test_price_compared_as_text() {
        let incoming = CanonicalRecord {
            price: Some("9.5".to_string()),
            ..bolt()
        };
        assert_eq!(changed_fields(&bolt(), &incoming), vec![TrackedField::Price]);
    }

    #[test]
    fn test_multiple_changes_in_order() {
        let incoming = CanonicalRecord {
            name: "Hex bolt".to_string(),
            quantity: None,
            status: Some("RETIRED".to_string()),
            ..bolt()
        };
        assert_eq!(
            changed_fields(&bolt(), &incoming),
            vec![
                TrackedField::Name,
                TrackedField::Status,
                TrackedField::Quantity
            ]
        );
    }

    #[test]
    fn test_extra_key_order_is_ignored() {
        let mut forward = ExtraFields::new();
        forward.insert("a".to_string(), ExtraValue::from("1"));
        forward.insert("b".to_string(), ExtraValue::from("2"));
        let mut backward = ExtraFields::new();
        backward.insert("b".to_string(), ExtraValue::from("2"));
        backward.insert("a".to_string(), ExtraValue::from("1"));

        let stored = CanonicalRecord {
            extra: Some(forward),
            ..bolt()
        };
        let incoming = CanonicalRecord {
            extra: Some(backward.clone()),
            ..bolt()
        };
        assert!(changed_fields(&stored, &incoming).is_empty());

        backward.insert("c".to_string(), ExtraValue::Bool(true));
        let incoming = CanonicalRecord {
            extra: Some(backward),
            ..bolt()
        };
        assert_eq!(changed_fields(&stored, &incoming), vec![TrackedField::Extra]);
    }
}

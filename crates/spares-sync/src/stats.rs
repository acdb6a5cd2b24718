//! Catalog summaries over stored records

use indexmap::IndexMap;
use serde::Serialize;
use spares_common::{CanonicalRecord, ExtraValue};
use std::collections::BTreeMap;

/// Bucket for records without a status or type
pub const UNKNOWN_BUCKET: &str = "UNKNOWN";

/// Records analyzed by default in extra-field analysis
pub const DEFAULT_ANALYSIS_LIMIT: usize = 1000;

/// Sample values kept per extra key
pub const MAX_SAMPLE_VALUES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

impl CatalogStats {
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            *stats.by_status.entry(bucket(record.status.as_deref())).or_default() += 1;
            *stats.by_type.entry(bucket(record.spare_type.as_deref())).or_default() += 1;
        }

        stats
    }
}

fn bucket(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_BUCKET.to_string(),
    }
}

/// Usage of one extra key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraFieldUsage {
    pub count: usize,
    /// Share of analyzed records carrying the key, e.g. `"66.67%"`
    pub frequency: String,
    /// Value kinds seen, in first-seen order
    pub kinds: Vec<&'static str>,
    pub sample_values: Vec<ExtraValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraFieldStats {
    /// Records with at least one extra field, up to the limit
    pub records_analyzed: usize,
    pub fields_found: usize,
    pub fields: IndexMap<String, ExtraFieldUsage>,
}

impl ExtraFieldStats {
    /// Analyze the first `limit` records that carry extra fields
    pub fn from_records(records: &[CanonicalRecord], limit: usize) -> Self {
        let mut fields: IndexMap<String, ExtraFieldUsage> = IndexMap::new();
        let mut analyzed = 0;

        for extra in records
            .iter()
            .filter_map(|r| r.extra.as_ref())
            .filter(|extra| !extra.is_empty())
            .take(limit)
        {
            analyzed += 1;
            for (key, value) in extra {
                let usage = fields.entry(key.clone()).or_insert_with(|| ExtraFieldUsage {
                    count: 0,
                    frequency: String::new(),
                    kinds: Vec::new(),
                    sample_values: Vec::new(),
                });
                usage.count += 1;
                if !usage.kinds.contains(&value.kind()) {
                    usage.kinds.push(value.kind());
                }
                if usage.sample_values.len() < MAX_SAMPLE_VALUES {
                    usage.sample_values.push(value.clone());
                }
            }
        }

        for usage in fields.values_mut() {
            usage.frequency = frequency(usage.count, analyzed);
        }

        Self {
            records_analyzed: analyzed,
            fields_found: fields.len(),
            fields,
        }
    }
}

fn frequency(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", count as f64 * 100.0 / total as f64)
}

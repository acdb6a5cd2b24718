//! Delimited table serialization for the report API
//!
//! [`render`] turns records into one line per record, cells in field-spec
//! order, joined by a separator. There is no header row and no trailing
//! newline, and an empty record list renders as empty text. The output is a
//! pure function of its inputs.

pub mod format;

use spares_common::CanonicalRecord;

pub use format::{format_timestamp, format_value, CellValue};

/// Where a column takes its value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Code,
    Name,
    Description,
    Type,
    Status,
    Price,
    Quantity,
    UpdatedAt,
    /// A key of the record's extra fields
    Extra(String),
}

/// Formatting tag attached to a column.
///
/// `Price` and `Date` currently format like `Plain`; the tags mark columns
/// whose rules may diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Formatter {
    #[default]
    Plain,
    Price,
    Date,
}

impl Formatter {
    pub fn apply(self, value: CellValue<'_>) -> String {
        match self {
            Formatter::Plain | Formatter::Price | Formatter::Date => format_value(value),
        }
    }
}

/// One column of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub source: FieldSource,
    /// Column name expected by the report API
    pub name: String,
    pub formatter: Formatter,
}

impl FieldSpec {
    pub fn new(source: FieldSource, name: impl Into<String>, formatter: Formatter) -> Self {
        Self {
            source,
            name: name.into(),
            formatter,
        }
    }

    /// Column backed by an extra field of the same name
    pub fn extra(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(FieldSource::Extra(key.clone()), key, Formatter::Plain)
    }

    fn resolve<'a>(&'a self, record: &'a CanonicalRecord) -> CellValue<'a> {
        match &self.source {
            FieldSource::Code => CellValue::Text(&record.code),
            FieldSource::Name => CellValue::Text(&record.name),
            FieldSource::Description => record.description.as_deref().into(),
            FieldSource::Type => record.spare_type.as_deref().into(),
            FieldSource::Status => record.status.as_deref().into(),
            FieldSource::Price => record.price.as_deref().into(),
            FieldSource::Quantity => record
                .quantity
                .map_or(CellValue::Null, |q| CellValue::Integer(i64::from(q))),
            FieldSource::UpdatedAt => record.updated_at.as_deref().into(),
            FieldSource::Extra(key) => record.extra_value(key).into(),
        }
    }

    fn cell(&self, record: &CanonicalRecord) -> String {
        self.formatter.apply(self.resolve(record))
    }
}

/// The fixed column layout agreed with the report API
pub fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(FieldSource::Code, "spareCode", Formatter::Plain),
        FieldSpec::new(FieldSource::Name, "spareName", Formatter::Plain),
        FieldSpec::new(FieldSource::Description, "spareDescription", Formatter::Plain),
        FieldSpec::new(FieldSource::Type, "spareType", Formatter::Plain),
        FieldSpec::new(FieldSource::Status, "spareStatus", Formatter::Plain),
        FieldSpec::new(FieldSource::Price, "price", Formatter::Price),
        FieldSpec::new(FieldSource::Quantity, "quantity", Formatter::Plain),
        FieldSpec::new(FieldSource::UpdatedAt, "updatedAt", Formatter::Date),
    ]
}

/// Default columns followed by one column per distinct extra key, in
/// first-seen order across `records`
pub fn detect_fields(records: &[CanonicalRecord]) -> Vec<FieldSpec> {
    let mut fields = default_fields();
    let mut seen: Vec<&str> = Vec::new();

    for key in records
        .iter()
        .filter_map(|record| record.extra.as_ref())
        .flat_map(|extra| extra.keys())
    {
        if !seen.contains(&key.as_str()) {
            seen.push(key);
        }
    }

    fields.extend(seen.into_iter().map(FieldSpec::extra));
    fields
}

/// Render records with the given columns
pub fn render(records: &[CanonicalRecord], fields: &[FieldSpec], separator: &str) -> String {
    records
        .iter()
        .map(|record| {
            fields
                .iter()
                .map(|field| field.cell(record))
                .collect::<Vec<_>>()
                .join(separator)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render records with the default columns
pub fn render_default(records: &[CanonicalRecord], separator: &str) -> String {
    render(records, &default_fields(), separator)
}

/// Render records with the default columns plus every discovered extra field
pub fn render_with_all_fields(records: &[CanonicalRecord], separator: &str) -> String {
    render(records, &detect_fields(records), separator)
}

//! Cell formatting rules
//!
//! The report API parses cells by exact shape, so these rules are fixed:
//!
//! - absent or null: empty cell
//! - numbers: integers as digits, fractions without trailing zeros
//! - decimal text ending in zeros (`"12.000"`, `"9.50"`): trailing zeros trimmed
//! - date-time text (`YYYY-MM-DDTHH:MM:SS...`): exactly six fraction digits,
//!   zone marker dropped
//! - anything else: as-is

use regex::Regex;
use serde_json::Number;
use spares_common::ExtraValue;
use std::sync::LazyLock;

// Literal patterns: a typo panics on first use
#[allow(clippy::expect_used)]
static DECIMAL_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d*0$").expect("valid decimal text regex"));

#[allow(clippy::expect_used)]
static DATE_TIME_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("valid date-time prefix regex")
});

#[allow(clippy::expect_used)]
static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<base>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})(?:\.(?P<frac>\d*))?(?:[Zz]|[+-]\d{2}:?\d{2})?$",
    )
    .expect("valid date-time regex")
});

/// Number of fraction digits in a formatted timestamp
pub const TIMESTAMP_FRACTION_DIGITS: usize = 6;

/// A value about to be written into a cell
#[derive(Debug, Clone, Copy)]
pub enum CellValue<'a> {
    Null,
    Text(&'a str),
    Integer(i64),
    Number(&'a Number),
    Bool(bool),
    /// A list or map from the extra fields
    Nested(&'a ExtraValue),
}

impl<'a> From<Option<&'a str>> for CellValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(CellValue::Null, CellValue::Text)
    }
}

impl<'a> From<Option<&'a ExtraValue>> for CellValue<'a> {
    fn from(value: Option<&'a ExtraValue>) -> Self {
        match value {
            None | Some(ExtraValue::Null) => CellValue::Null,
            Some(ExtraValue::String(s)) => CellValue::Text(s),
            Some(ExtraValue::Number(n)) => CellValue::Number(n),
            Some(ExtraValue::Bool(b)) => CellValue::Bool(*b),
            Some(nested) => CellValue::Nested(nested),
        }
    }
}

/// Format one cell
pub fn format_value(value: CellValue<'_>) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Number(n) => format_number(n),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Text(text) => format_text(text),
        CellValue::Nested(nested) => serde_json::to_string(nested).unwrap_or_default(),
    }
}

fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) => trim_fraction(&f.to_string()).to_string(),
        None => n.to_string(),
    }
}

fn format_text(text: &str) -> String {
    if DECIMAL_TEXT.is_match(text) {
        return trim_fraction(text).to_string();
    }
    if DATE_TIME_PREFIX.is_match(text) {
        if let Some(formatted) = format_timestamp(text) {
            return formatted;
        }
    }
    text.to_string()
}

/// Strip trailing zero fraction digits and a bare trailing decimal point
fn trim_fraction(text: &str) -> &str {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.')
}

/// Canonical timestamp text, or `None` when the tail is not a fraction or zone
pub fn format_timestamp(text: &str) -> Option<String> {
    let captures = DATE_TIME.captures(text)?;
    let base = captures.name("base")?.as_str();
    let fraction = captures.name("frac").map_or("", |m| m.as_str());

    let mut digits: String = fraction.chars().take(TIMESTAMP_FRACTION_DIGITS).collect();
    while digits.len() < TIMESTAMP_FRACTION_DIGITS {
        digits.push('0');
    }

    Some(format!("{}.{}", base, digits))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number(value: serde_json::Value) -> String {
        let ExtraValue::Number(n) = ExtraValue::from(value) else {
            panic!("not a number");
        };
        format_value(CellValue::Number(&n))
    }

    fn text(value: &str) -> String {
        format_value(CellValue::Text(value))
    }

    #[test]
    fn test_patterns_compile() {
        // Forcing each static runs its constructor
        assert!(DECIMAL_TEXT.is_match("9.50"));
        assert!(!DECIMAL_TEXT.is_match("9.5"));
        assert!(DATE_TIME_PREFIX.is_match("2024-03-01T10:20:30 trailing"));
        assert!(DATE_TIME.is_match("2024-03-01T10:20:30.5Z"));
        assert!(!DATE_TIME.is_match("2024-03-01T10:20:30 trailing"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(number(json!(12.50)), "12.5");
        assert_eq!(number(json!(12.00)), "12");
        assert_eq!(number(json!(0)), "0");
        assert_eq!(number(json!(-3)), "-3");
        assert_eq!(number(json!(0.125)), "0.125");
        assert_eq!(format_value(CellValue::Integer(42)), "42");
    }

    #[test]
    fn test_decimal_text() {
        assert_eq!(text("12.000"), "12");
        assert_eq!(text("9.50"), "9.5");
        assert_eq!(text("3.00"), "3");
        assert_eq!(text("-7.10"), "-7.1");
        assert_eq!(text("9.5"), "9.5");
        assert_eq!(text("100"), "100");
        assert_eq!(text("1.0.0"), "1.0.0");
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(text("2024-01-05T10:00:00Z"), "2024-01-05T10:00:00.000000");
        assert_eq!(text("2024-01-05T10:00:00.5Z"), "2024-01-05T10:00:00.500000");
        assert_eq!(
            text("2024-01-05T10:00:00.123456789"),
            "2024-01-05T10:00:00.123456"
        );
        assert_eq!(
            text("2024-01-05T10:00:00.25+03:00"),
            "2024-01-05T10:00:00.250000"
        );
        assert_eq!(text("2024-01-05T10:00:00-0500"), "2024-01-05T10:00:00.000000");
    }

    #[test]
    fn test_non_timestamps_unchanged() {
        assert_eq!(text("2024-01-05"), "2024-01-05");
        assert_eq!(text("2024-01-05T10:00:00 local"), "2024-01-05T10:00:00 local");
        assert_eq!(text("Bolt M8"), "Bolt M8");
        assert_eq!(text(""), "");
    }

    #[test]
    fn test_null_bool_and_nested() {
        assert_eq!(format_value(CellValue::Null), "");
        assert_eq!(format_value(CellValue::from(None::<&str>)), "");
        assert_eq!(format_value(CellValue::Bool(true)), "true");

        let nested = ExtraValue::from(json!({"w": 2, "h": [1, 2]}));
        assert_eq!(format_value(CellValue::Nested(&nested)), r#"{"w":2,"h":[1,2]}"#);

        assert_eq!(format_value(CellValue::from(Some(&ExtraValue::Null))), "");
    }
}

//! Text -> typed value conversion
//!
//! Every user-entered or text-sourced value goes through `coerce` before it
//! reaches a `TableStore`. The reverse direction (value -> display text) lives
//! in `value::format_value`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::CoercionError;
use crate::value::{ColumnType, TypedValue};

/// Spellings treated as a null cell, compared case-insensitively
pub const NULL_MARKERS: &[&str] = &["none", "null", "nan", "nat", "<na>"];

/// Characters removed from numeric input before parsing
const GROUPING_CHARS: &[char] = &[',', '_', ' ', '\u{00A0}', '\u{202F}'];

/// Naive formats tried in order after RFC 3339
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Convert raw text into a value of the declared type.
///
/// Empty text and null markers yield `Ok(None)` for every type.
pub fn coerce(raw: &str, column_type: ColumnType) -> Result<Option<TypedValue>, CoercionError> {
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        return Ok(None);
    }

    let err = || CoercionError {
        input: raw.to_string(),
        expected: column_type,
    };

    let value = match column_type {
        ColumnType::Text => TypedValue::Text(raw.to_string()),
        ColumnType::Integer => TypedValue::Int(parse_integer(trimmed).ok_or_else(err)?),
        ColumnType::Float => TypedValue::Float(parse_number(trimmed).ok_or_else(err)?),
        ColumnType::Boolean => TypedValue::Bool(parse_bool(trimmed)),
        ColumnType::DateTime => TypedValue::Timestamp(parse_datetime(trimmed).ok_or_else(err)?),
    };
    Ok(Some(value))
}

pub fn is_null_marker(trimmed: &str) -> bool {
    trimmed.is_empty() || NULL_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m))
}

fn strip_grouping(s: &str) -> String {
    s.chars().filter(|c| !GROUPING_CHARS.contains(c)).collect()
}

/// Integer with optional grouping. An integral float literal ("12.0") is accepted.
pub fn parse_integer(s: &str) -> Option<i64> {
    let cleaned = strip_grouping(s);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(n);
    }
    let f = parse_float_literal(&cleaned)?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Finite or infinite float with optional grouping. NaN is a null marker, not a number.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned = strip_grouping(s);
    parse_float_literal(&cleaned)
}

fn parse_float_literal(cleaned: &str) -> Option<f64> {
    // Rust accepts "nan"/"inf" spellings; only digits-based input counts as numeric here
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|f| !f.is_nan())
}

/// "true", "1" and "yes" are true; any other text is false
pub fn parse_bool(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    matches!(lower.as_str(), "true" | "1" | "yes")
}

/// Locale-agnostic date/time parsing. Offsets are normalised to UTC.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Pick the narrowest type every non-null sample fits.
///
/// Used by text-based loaders (CSV) which carry no schema. Booleans must be
/// literal `true`/`false` here: the lenient edit-time rule would turn every
/// column into booleans.
pub fn infer_column_type<'a, I>(samples: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen_any = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;
    let mut all_datetime = true;

    for raw in samples {
        let s = raw.trim();
        if is_null_marker(s) {
            continue;
        }
        seen_any = true;
        // Plain digits only: grouping separators in a CSV field usually mean text
        if all_int && s.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && parse_float_literal(s).is_none() {
            all_float = false;
        }
        if all_bool && !(s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")) {
            all_bool = false;
        }
        if all_datetime && parse_datetime(s).is_none() {
            all_datetime = false;
        }
        if !(all_int || all_float || all_bool || all_datetime) {
            return ColumnType::Text;
        }
    }

    if !seen_any {
        ColumnType::Text
    } else if all_bool {
        ColumnType::Boolean
    } else if all_int {
        ColumnType::Integer
    } else if all_float {
        ColumnType::Float
    } else if all_datetime {
        ColumnType::DateTime
    } else {
        ColumnType::Text
    }
}

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Horizontal text alignment for a column's cells
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Declared type of a column. Fixed at load or column creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Numbers right-aligned, everything else left-aligned
    pub fn alignment(self) -> Alignment {
        if self.is_numeric() {
            Alignment::Right
        } else {
            Alignment::Left
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
        }
    }

    /// Parse a type name as written in settings or on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "str" | "utf8" => Some(ColumnType::Text),
            "integer" | "int" | "int64" => Some(ColumnType::Integer),
            "float" | "double" | "float64" => Some(ColumnType::Float),
            "boolean" | "bool" => Some(ColumnType::Boolean),
            "datetime" | "timestamp" | "date" => Some(ColumnType::DateTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-null cell value. Always consistent with its column's `ColumnType`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Text(String),
}

/// A cell: `None` is a null/empty cell
pub type CellValue = Option<TypedValue>;

impl TypedValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            TypedValue::Int(_) => ColumnType::Integer,
            TypedValue::Float(_) => ColumnType::Float,
            TypedValue::Bool(_) => ColumnType::Boolean,
            TypedValue::Timestamp(_) => ColumnType::DateTime,
            TypedValue::Text(_) => ColumnType::Text,
        }
    }

    /// Unformatted text form. Parses back through `coerce` to the same value,
    /// which is what clipboard copy and CSV export rely on.
    pub fn raw_text(&self) -> String {
        match self {
            TypedValue::Int(n) => n.to_string(),
            TypedValue::Float(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.1}", n)
                } else {
                    n.to_string()
                }
            }
            TypedValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            TypedValue::Timestamp(ts) => format_timestamp(ts),
            TypedValue::Text(s) => s.clone(),
        }
    }
}

/// Options that govern how values are rendered for display
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOptions {
    /// Decimal places shown for float columns
    pub float_decimals: usize,
    /// Grouping character inserted every three integer digits
    pub thousands_separator: char,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            float_decimals: 2,
            thousands_separator: ',',
        }
    }
}

/// Display text for a cell (`None` renders empty)
pub fn format_value(value: Option<&TypedValue>, opts: &DisplayOptions) -> String {
    match value {
        None => String::new(),
        Some(TypedValue::Int(n)) => group_integer(&n.unsigned_abs().to_string(), *n < 0, opts),
        Some(TypedValue::Float(n)) => format_float(*n, opts),
        Some(TypedValue::Bool(b)) => if *b { "true" } else { "false" }.to_string(),
        Some(TypedValue::Timestamp(ts)) => format_timestamp(ts),
        Some(TypedValue::Text(s)) => s.clone(),
    }
}

/// Format a float with grouping and a fixed number of decimals
pub fn format_float(n: f64, opts: &DisplayOptions) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let fixed = format!("{:.*}", opts.float_decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    // "-0.00" would be misleading once rounded
    let negative = n < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = group_integer(int_part, negative, opts);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_integer(digits: &str, negative: bool, opts: &DisplayOptions) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    let len = digits.len();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(opts.thousands_separator);
        }
        out.push(ch);
    }
    out
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        let s = ts.format("%Y-%m-%d %H:%M:%S%.f").to_string();
        s.trim_end_matches('0').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn opts() -> DisplayOptions {
        DisplayOptions::default()
    }

    #[test]
    fn test_integer_grouping() {
        assert_eq!(format_value(Some(&TypedValue::Int(0)), &opts()), "0");
        assert_eq!(format_value(Some(&TypedValue::Int(999)), &opts()), "999");
        assert_eq!(format_value(Some(&TypedValue::Int(1000)), &opts()), "1,000");
        assert_eq!(format_value(Some(&TypedValue::Int(1234567)), &opts()), "1,234,567");
        assert_eq!(format_value(Some(&TypedValue::Int(-1234567)), &opts()), "-1,234,567");
        assert_eq!(format_value(Some(&TypedValue::Int(i64::MIN)), &opts()), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_value(Some(&TypedValue::Float(1234.5)), &opts()), "1,234.50");
        assert_eq!(format_value(Some(&TypedValue::Float(-0.001)), &opts()), "0.00");
        assert_eq!(format_value(Some(&TypedValue::Float(-12.346)), &opts()), "-12.35");

        let whole = DisplayOptions { float_decimals: 0, ..opts() };
        assert_eq!(format_float(1234567.4, &whole), "1,234,567");
    }

    #[test]
    fn test_null_and_text_display() {
        assert_eq!(format_value(None, &opts()), "");
        assert_eq!(format_value(Some(&TypedValue::Text("a,b".into())), &opts()), "a,b");
        assert_eq!(format_value(Some(&TypedValue::Bool(true)), &opts()), "true");
    }

    #[test]
    fn test_timestamp_display() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(14, 5, 0).unwrap();
        assert_eq!(format_value(Some(&TypedValue::Timestamp(ts)), &opts()), "2024-03-09 14:05:00");

        let ts = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_milli_opt(14, 5, 0, 250).unwrap();
        assert_eq!(format_value(Some(&TypedValue::Timestamp(ts)), &opts()), "2024-03-09 14:05:00.25");
    }

    #[test]
    fn test_alignment_by_type() {
        assert_eq!(ColumnType::Integer.alignment(), Alignment::Right);
        assert_eq!(ColumnType::Float.alignment(), Alignment::Right);
        assert_eq!(ColumnType::Text.alignment(), Alignment::Left);
        assert_eq!(ColumnType::DateTime.alignment(), Alignment::Left);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ColumnType::from_name("Int64"), Some(ColumnType::Integer));
        assert_eq!(ColumnType::from_name("timestamp"), Some(ColumnType::DateTime));
        assert_eq!(ColumnType::from_name("blob"), None);
    }
}

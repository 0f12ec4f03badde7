//! Column totals and selection statistics.
//!
//! Totals are computed over visible rows only and are never stored in the
//! table; the presentation layer renders them as a pinned footer row.

use crate::coerce::parse_number;
use crate::table::TableStore;
use crate::value::{format_float, ColumnType, DisplayOptions, TypedValue};

/// Numeric reading of a cell, if it has one. Booleans and timestamps never count.
pub fn numeric_value(value: Option<&TypedValue>) -> Option<f64> {
    match value? {
        TypedValue::Int(n) => Some(*n as f64),
        TypedValue::Float(n) => Some(*n),
        TypedValue::Text(s) => parse_number(s.trim()),
        TypedValue::Bool(_) | TypedValue::Timestamp(_) => None,
    }
}

/// Sum per column over the given data rows.
///
/// `None` for Boolean/DateTime columns and for columns without a single numeric value.
pub fn totals(table: &TableStore, visible_rows: &[usize]) -> Vec<Option<f64>> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(col, column)| {
            if matches!(column.column_type, ColumnType::Boolean | ColumnType::DateTime) {
                return None;
            }
            let mut sum = None;
            for &row in visible_rows {
                if let Some(n) = table.get(row, col).ok().and_then(numeric_value) {
                    *sum.get_or_insert(0.0) += n;
                }
            }
            sum
        })
        .collect()
}

/// Render a total for the footer row
pub fn format_total(column_type: ColumnType, total: Option<f64>, opts: &DisplayOptions) -> String {
    match total {
        None => String::new(),
        Some(n) if column_type == ColumnType::Integer => {
            format_float(n, &DisplayOptions { float_decimals: 0, ..opts.clone() })
        }
        Some(n) => format_float(n, opts),
    }
}

/// Status-bar statistics for a selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionStats {
    /// Every selected cell, numeric or not
    pub count: usize,
    pub numeric_count: usize,
    pub sum: Option<f64>,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Statistics over `(data_row, col)` cells; out-of-range cells are skipped
pub fn selection_stats<I>(table: &TableStore, cells: I) -> SelectionStats
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut count = 0usize;
    let mut values: Vec<f64> = Vec::new();

    for (row, col) in cells {
        let Ok(value) = table.get(row, col) else {
            continue;
        };
        count += 1;
        if let Some(n) = numeric_value(value) {
            values.push(n);
        }
    }

    if values.is_empty() {
        return SelectionStats {
            count,
            ..SelectionStats::default()
        };
    }

    let sum: f64 = values.iter().sum();
    let avg = sum / values.len() as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    SelectionStats {
        count,
        numeric_count: values.len(),
        sum: Some(sum),
        average: Some(avg),
        min: Some(min),
        max: Some(max),
    }
}

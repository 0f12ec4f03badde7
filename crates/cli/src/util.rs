// Argument parsing helpers shared by the subcommands

use parqview_engine::sort::SortDirection;
use parqview_engine::{ColumnType, TableStore};

/// Resolve a column by exact name, then case-insensitive name, then 1-based ordinal
pub(crate) fn resolve_column(table: &TableStore, spec: &str) -> Result<usize, String> {
    let spec = spec.trim();
    if let Some(col) = table.column_index(spec) {
        return Ok(col);
    }
    let lower = spec.to_lowercase();
    if let Some(col) = table.columns().iter().position(|c| c.name.to_lowercase() == lower) {
        return Ok(col);
    }
    match spec.parse::<usize>() {
        Ok(n) if n >= 1 && n <= table.column_count() => Ok(n - 1),
        _ => Err(format!("no column '{}'", spec)),
    }
}

/// `COLUMN=PATTERN`; the pattern may be empty or contain '='
pub(crate) fn parse_filter(arg: &str) -> Result<(&str, &str), String> {
    arg.split_once('=')
        .filter(|(col, _)| !col.trim().is_empty())
        .ok_or_else(|| format!("invalid filter '{}' (expected COLUMN=PATTERN)", arg))
}

/// `COLUMN` or `COLUMN:asc` / `COLUMN:desc`
pub(crate) fn parse_sort(arg: &str) -> Result<(&str, SortDirection), String> {
    let (col, dir) = match arg.rsplit_once(':') {
        Some((col, dir)) => (col, dir),
        None => (arg, "asc"),
    };
    if col.trim().is_empty() {
        return Err(format!("invalid sort '{}' (expected COLUMN[:asc|desc])", arg));
    }
    let direction = match dir.trim().to_ascii_lowercase().as_str() {
        "asc" | "ascending" => SortDirection::Ascending,
        "desc" | "descending" => SortDirection::Descending,
        other => return Err(format!("invalid sort direction '{}'", other)),
    };
    Ok((col, direction))
}

/// A single-cell assignment: `ROW:COLUMN=VALUE`, ROW counted from 1
#[derive(Debug, PartialEq)]
pub(crate) struct CellAssignment<'a> {
    pub row: usize,
    pub column: &'a str,
    pub value: &'a str,
}

pub(crate) fn parse_assignment(arg: &str) -> Result<CellAssignment<'_>, String> {
    let invalid = || format!("invalid assignment '{}' (expected ROW:COLUMN=VALUE)", arg);
    let (target, value) = arg.split_once('=').ok_or_else(invalid)?;
    let (row, column) = target.split_once(':').ok_or_else(invalid)?;
    let row: usize = row.trim().parse().map_err(|_| invalid())?;
    if row == 0 || column.trim().is_empty() {
        return Err(invalid());
    }
    Ok(CellAssignment {
        row: row - 1,
        column: column.trim(),
        value,
    })
}

/// A new column: `NAME:TYPE` or `NAME:TYPE=DEFAULT`
pub(crate) fn parse_column_def(arg: &str) -> Result<(&str, ColumnType, Option<&str>), String> {
    let invalid = || format!("invalid column '{}' (expected NAME:TYPE[=DEFAULT])", arg);
    let (head, default) = match arg.split_once('=') {
        Some((head, default)) => (head, Some(default)),
        None => (arg, None),
    };
    let (name, type_name) = head.rsplit_once(':').ok_or_else(invalid)?;
    if name.trim().is_empty() {
        return Err(invalid());
    }
    let column_type =
        ColumnType::from_name(type_name).ok_or_else(|| format!("unknown column type '{}'", type_name))?;
    Ok((name.trim(), column_type, default))
}

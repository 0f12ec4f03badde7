//! Sort keys and the display permutation they produce.
//!
//! Sorting never reorders `TableStore` storage; it only yields a permutation
//! that `RowView::apply_sort` installs.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::table::TableStore;
use crate::value::TypedValue;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Current sort: unsorted, or one column in one direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState(Option<(usize, SortDirection)>);

impl SortState {
    pub fn unsorted() -> Self {
        Self(None)
    }

    pub fn by(column: usize, direction: SortDirection) -> Self {
        Self(Some((column, direction)))
    }

    pub fn get(&self) -> Option<(usize, SortDirection)> {
        self.0
    }

    pub fn column(&self) -> Option<usize> {
        self.0.map(|(col, _)| col)
    }

    pub fn is_sorted(&self) -> bool {
        self.0.is_some()
    }

    /// Direction indicator for a header, if that column is the sort column
    pub fn direction_for(&self, col: usize) -> Option<SortDirection> {
        match self.0 {
            Some((c, dir)) if c == col => Some(dir),
            _ => None,
        }
    }

    /// Header-click cycle: none -> ascending -> descending -> none.
    /// Clicking a different column always starts at ascending.
    pub fn cycle(self, col: usize) -> Self {
        match self.0 {
            Some((c, SortDirection::Ascending)) if c == col => Self::by(col, SortDirection::Descending),
            Some((c, SortDirection::Descending)) if c == col => Self::unsorted(),
            _ => Self::by(col, SortDirection::Ascending),
        }
    }

    /// Follow the sort column through a structural change; a deleted column unsorts
    pub fn remap_columns<F>(&mut self, f: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        self.0 = self.0.and_then(|(col, dir)| f(col).map(|c| (c, dir)));
    }
}

/// Normalized comparison key for one non-null cell
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Int(i64),
    Number(OrderedFloat<f64>),
    Bool(bool),
    Timestamp(NaiveDateTime),
    /// Trimmed + lowercase
    Text(String),
}

impl SortKey {
    fn from_value(value: &TypedValue) -> Self {
        match value {
            TypedValue::Int(n) => SortKey::Int(*n),
            TypedValue::Float(n) => SortKey::Number(OrderedFloat(*n)),
            TypedValue::Bool(b) => SortKey::Bool(*b),
            TypedValue::Timestamp(ts) => SortKey::Timestamp(*ts),
            TypedValue::Text(s) => SortKey::Text(s.trim().to_lowercase()),
        }
    }
}

/// Stable permutation of all data rows (view row -> data row).
///
/// Nulls go last in both directions. Equal keys keep ascending data order in
/// both directions, so descending is not simply ascending reversed.
pub fn sort_order(table: &TableStore, state: &SortState) -> Vec<usize> {
    let identity = || (0..table.row_count()).collect::<Vec<_>>();
    let Some((col, direction)) = state.get() else {
        return identity();
    };
    if col >= table.column_count() {
        return identity();
    }

    let mut keyed: Vec<(SortKey, usize)> = Vec::with_capacity(table.row_count());
    let mut nulls: Vec<usize> = Vec::new();
    for (data_row, row) in table.rows().enumerate() {
        match &row[col] {
            Some(value) => keyed.push((SortKey::from_value(value), data_row)),
            None => nulls.push(data_row),
        }
    }

    keyed.sort_by(|a, b| {
        let by_key = match direction {
            SortDirection::Ascending => a.0.cmp(&b.0),
            SortDirection::Descending => b.0.cmp(&a.0),
        };
        match by_key {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        }
    });

    keyed.into_iter().map(|(_, row)| row).chain(nulls).collect()
}

//! Filter and Row View Layer
//!
//! This module provides the view layer that maps between:
//! - View space (what the user sees, affected by sort/filter)
//! - Data space (canonical storage, row 0..N-1)
//!
//! Key invariants:
//! - Storage and undo history use data space
//! - The presentation layer uses view space
//! - Conversion happens at the session boundary only
//! - visible_mask is indexed by DATA row (not view row)

use std::collections::BTreeMap;

use crate::table::TableStore;
use crate::value::DisplayOptions;

// =============================================================================
// RowView: The core view layer mapping
// =============================================================================

/// Row view layer: maps between view space and data space
#[derive(Debug, Clone)]
pub struct RowView {
    /// Maps view_row index -> data_row index
    /// Identity by default: [0, 1, 2, ..., N-1]
    /// After sort: permuted to reflect sort order
    row_order: Vec<usize>,

    /// Visibility mask indexed by DATA row
    /// true = visible, false = hidden by filter
    visible_mask: Vec<bool>,

    /// Cached DATA rows that are visible, in view order.
    /// Rebuilt when filters change OR sort changes.
    visible_rows: Vec<usize>,
}

impl RowView {
    /// Initialize identity mapping for N rows
    pub fn new(row_count: usize) -> Self {
        Self {
            row_order: (0..row_count).collect(),
            visible_mask: vec![true; row_count],
            visible_rows: (0..row_count).collect(),
        }
    }

    /// Number of visible rows
    pub fn visible_count(&self) -> usize {
        self.visible_rows.len()
    }

    /// Visible data rows in display order
    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_rows
    }

    /// Data row shown at the nth visible position
    pub fn nth_visible(&self, n: usize) -> Option<usize> {
        self.visible_rows.get(n).copied()
    }

    /// Visible position of a data row (None if hidden or out of range)
    pub fn visible_position(&self, data_row: usize) -> Option<usize> {
        if !self.is_data_row_visible(data_row) {
            return None;
        }
        self.visible_rows.iter().position(|&d| d == data_row)
    }

    /// Check if a data row is visible
    pub fn is_data_row_visible(&self, data_row: usize) -> bool {
        data_row < self.visible_mask.len() && self.visible_mask[data_row]
    }

    // -------------------------------------------------------------------------
    // Internal rebuilders
    // -------------------------------------------------------------------------

    fn rebuild_visible_cache(&mut self) {
        self.visible_rows = self
            .row_order
            .iter()
            .copied()
            .filter(|&data_row| data_row < self.visible_mask.len() && self.visible_mask[data_row])
            .collect();
    }

    // -------------------------------------------------------------------------
    // Mutators
    // -------------------------------------------------------------------------

    /// Apply a sort permutation. The permutation maps view_row -> data_row.
    pub fn apply_sort(&mut self, permutation: Vec<usize>) {
        self.row_order = permutation;
        self.rebuild_visible_cache();
    }

    /// Apply filter visibility (mask indexed by data row)
    pub fn apply_filter(&mut self, visible_mask: Vec<bool>) {
        self.visible_mask = visible_mask;
        self.rebuild_visible_cache();
    }
}

// =============================================================================
// FilterSet: per-column substring predicates
// =============================================================================

/// Case-insensitive substring filters keyed by column ordinal.
/// A column without an entry is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    /// Patterns stored lowercased for matching
    patterns: BTreeMap<usize, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pattern for a column. An empty pattern clears the filter.
    pub fn set_filter(&mut self, col: usize, pattern: &str) {
        if pattern.is_empty() {
            self.patterns.remove(&col);
        } else {
            self.patterns.insert(col, pattern.to_lowercase());
        }
    }

    pub fn clear_filter(&mut self, col: usize) {
        self.patterns.remove(&col);
    }

    pub fn clear_all(&mut self) {
        self.patterns.clear();
    }

    pub fn get(&self, col: usize) -> Option<&str> {
        self.patterns.get(&col).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.patterns.iter().map(|(&c, p)| (c, p.as_str()))
    }

    /// Rewrite column ordinals after a structural change; filters on removed columns are dropped
    pub fn remap_columns<F>(&mut self, f: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        self.patterns = std::mem::take(&mut self.patterns)
            .into_iter()
            .filter_map(|(col, pattern)| f(col).map(|c| (c, pattern)))
            .collect();
    }

    /// Does one data row pass every filter?
    pub fn row_passes(&self, table: &TableStore, row: usize, opts: &DisplayOptions) -> bool {
        self.patterns.iter().all(|(&col, pattern)| {
            // A filter on a column that no longer exists constrains nothing
            if col >= table.column_count() {
                return true;
            }
            table.display(row, col, opts).to_lowercase().contains(pattern.as_str())
        })
    }
}

/// Visibility per data row. Pure function of (table, filters).
pub fn visible_mask(table: &TableStore, filters: &FilterSet, opts: &DisplayOptions) -> Vec<bool> {
    if filters.is_empty() {
        return vec![true; table.row_count()];
    }
    (0..table.row_count())
        .map(|row| filters.row_passes(table, row, opts))
        .collect()
}

/// Visible data rows in ascending data order
pub fn visible_rows(table: &TableStore, filters: &FilterSet, opts: &DisplayOptions) -> Vec<usize> {
    visible_mask(table, filters, opts)
        .into_iter()
        .enumerate()
        .filter_map(|(row, visible)| visible.then_some(row))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

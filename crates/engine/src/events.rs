//! Change records returned by every mutating `EditSession` call.
//!
//! A front end repaints from these instead of diffing the whole table.
//! Changes produced by undo, redo or reload carry `ChangeOrigin::System` so
//! an observer never mistakes them for fresh user edits.

/// Who caused a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeOrigin {
    #[default]
    User,
    /// Undo/redo replay or a reload from disk
    System,
}

/// What must be refreshed after one session operation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Changes {
    /// Row set or order changed (insert/delete, filter, sort, reload)
    pub rows: bool,
    /// Column set changed (insert/delete, reload)
    pub columns: bool,
    /// Cells whose value changed, as (data_row, col)
    pub cells: Vec<(usize, usize)>,
    /// Footer totals were recomputed
    pub totals: bool,
    /// Column widths were recomputed
    pub widths: bool,
    /// Dirty state after the operation
    pub dirty: bool,
    /// Undo/redo availability may have changed
    pub history: bool,
    pub origin: ChangeOrigin,
}

impl Changes {
    pub fn new(origin: ChangeOrigin) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    /// Whole-table refresh, used after load, reload and new-table
    pub fn everything(origin: ChangeOrigin) -> Self {
        Self {
            rows: true,
            columns: true,
            cells: Vec::new(),
            totals: true,
            widths: true,
            dirty: false,
            history: true,
            origin,
        }
    }

    pub fn is_system(&self) -> bool {
        self.origin == ChangeOrigin::System
    }

    /// Does the view need anything repainted?
    pub fn is_empty(&self) -> bool {
        !(self.rows || self.columns || self.totals || self.widths || self.history) && self.cells.is_empty()
    }
}

//! EditSession: the single owner of a loaded table and everything derived from it.
//!
//! Coordinate spaces:
//! - Callers address rows by VIEW row (position among the visible, sorted rows)
//! - Storage, history and `Changes::cells` use DATA rows
//! - Conversion happens here and nowhere else
//!
//! After every mutation the view (filter mask + sort order), totals and
//! column widths are rebuilt, so readers never observe stale derived state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::aggregate::{self, format_total, SelectionStats};
use crate::coerce::coerce;
use crate::error::{CoercionError, SessionError, TableError};
use crate::events::{ChangeOrigin, Changes};
use crate::filter::{visible_mask, FilterSet, RowView};
use crate::history::{CellChange, CommandStack, EditCommand};
use crate::layout::{column_widths, WidthLimits};
use crate::sort::{sort_order, SortState};
use crate::table::{TableSource, TableStore};
use crate::value::{Alignment, ColumnType, DisplayOptions};

const APP_NAME: &str = "Parquet File Viewer";
const UNTITLED: &str = "Untitled";

/// Whether cell content may be changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Viewing,
    Editing,
}

impl Mode {
    pub fn is_editing(self) -> bool {
        self == Mode::Editing
    }
}

/// Answer to "you have unsaved changes"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsavedChoice {
    Save,
    Discard,
    Cancel,
}

/// Outcome of a guarded transition (open, new, leave editing)
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Completed(Changes),
    Cancelled,
}

impl Transition {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Transition::Cancelled)
    }
}

/// Rectangular selection in view coordinates, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    /// Corners may be given in any order
    pub fn new(row_a: usize, col_a: usize, row_b: usize, col_b: usize) -> Self {
        Self {
            start_row: row_a.min(row_b),
            start_col: col_a.min(col_b),
            end_row: row_a.max(row_b),
            end_col: col_a.max(col_b),
        }
    }

    pub fn cell(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn cell_count(&self) -> usize {
        let rows = (self.end_row - self.start_row).saturating_add(1);
        let cols = (self.end_col - self.start_col).saturating_add(1);
        rows.saturating_mul(cols)
    }
}

/// A pasted cell that failed coercion and was left untouched
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCell {
    pub view_row: usize,
    pub col: usize,
    pub error: CoercionError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasteOutcome {
    pub changes: Changes,
    /// Cells written (unchanged values are not counted)
    pub applied: usize,
    pub rejected: Vec<RejectedCell>,
    /// Clipboard cells that fell outside the table
    pub clipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub display: DisplayOptions,
    /// Undo depth; 0 keeps every edit
    pub history_limit: usize,
    pub widths: WidthLimits,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            display: DisplayOptions::default(),
            history_limit: 0,
            widths: WidthLimits::default(),
        }
    }
}

pub struct EditSession {
    source: Box<dyn TableSource>,
    options: SessionOptions,
    table: TableStore,
    path: Option<PathBuf>,
    mode: Mode,
    history: CommandStack,
    /// Rows or columns were inserted/deleted since the last save or load
    structural_dirty: bool,
    filters: FilterSet,
    sort: SortState,
    view: RowView,
    totals: Vec<Option<f64>>,
    widths: Vec<usize>,
}

impl EditSession {
    /// Session over an empty, untitled table in viewing mode
    pub fn new(source: Box<dyn TableSource>, options: SessionOptions) -> Self {
        let history = CommandStack::with_limit(options.history_limit);
        let mut session = Self {
            source,
            options,
            table: TableStore::new(),
            path: None,
            mode: Mode::Viewing,
            history,
            structural_dirty: false,
            filters: FilterSet::new(),
            sort: SortState::unsorted(),
            view: RowView::new(0),
            totals: Vec::new(),
            widths: Vec::new(),
        };
        session.refresh();
        session
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Replace the table with a file's contents. Filters, sort and history reset;
    /// the session returns to viewing mode. A load failure leaves everything as it was.
    pub fn open<F>(&mut self, path: &Path, resolve: F) -> Result<Transition, SessionError>
    where
        F: FnOnce() -> UnsavedChoice,
    {
        if self.confirm_unsaved(resolve)? == Some(UnsavedChoice::Cancel) {
            return Ok(Transition::Cancelled);
        }
        let table = TableStore::load(self.source.as_ref(), path)?;
        info!(
            "opened {} ({} rows, {} columns)",
            path.display(),
            table.row_count(),
            table.column_count()
        );
        self.filters.clear_all();
        self.sort = SortState::unsorted();
        self.install(table);
        self.path = Some(path.to_path_buf());
        self.mode = Mode::Viewing;
        Ok(Transition::Completed(self.finish(Changes::everything(ChangeOrigin::System))))
    }

    /// Start an empty untitled table, ready for editing
    pub fn new_table<F>(&mut self, resolve: F) -> Result<Transition, SessionError>
    where
        F: FnOnce() -> UnsavedChoice,
    {
        if self.confirm_unsaved(resolve)? == Some(UnsavedChoice::Cancel) {
            return Ok(Transition::Cancelled);
        }
        self.filters.clear_all();
        self.sort = SortState::unsorted();
        self.install(TableStore::new());
        self.path = None;
        self.mode = Mode::Editing;
        debug!("new untitled table");
        Ok(Transition::Completed(self.finish(Changes::everything(ChangeOrigin::System))))
    }

    /// Enter editing mode with a fresh history
    pub fn enable_editing(&mut self) -> Changes {
        if self.mode.is_editing() {
            return self.finish(Changes::new(ChangeOrigin::User));
        }
        self.mode = Mode::Editing;
        self.history.clear();
        let mut changes = Changes::new(ChangeOrigin::User);
        changes.history = true;
        self.finish(changes)
    }

    /// Leave editing mode. With unsaved changes `resolve` decides:
    /// Save must succeed, Discard reloads from disk, Cancel stays in editing.
    pub fn disable_editing<F>(&mut self, resolve: F) -> Result<Transition, SessionError>
    where
        F: FnOnce() -> UnsavedChoice,
    {
        if !self.mode.is_editing() {
            return Ok(Transition::Completed(self.finish(Changes::new(ChangeOrigin::User))));
        }
        let mut changes = match self.confirm_unsaved(resolve)? {
            Some(UnsavedChoice::Cancel) => return Ok(Transition::Cancelled),
            Some(UnsavedChoice::Discard) => self.reload()?,
            Some(UnsavedChoice::Save) | None => Changes::new(ChangeOrigin::User),
        };
        self.mode = Mode::Viewing;
        self.history.clear();
        changes.history = true;
        Ok(Transition::Completed(self.finish(changes)))
    }

    /// Write to the current path. Success clears history and the dirty state;
    /// failure leaves both untouched.
    pub fn save(&mut self) -> Result<Changes, SessionError> {
        let path = self.path.clone().ok_or(SessionError::NoDestination)?;
        self.write_to(&path)
    }

    /// Write to a new path, which becomes the session's path on success
    pub fn save_as(&mut self, path: &Path) -> Result<Changes, SessionError> {
        let changes = self.write_to(path)?;
        self.path = Some(path.to_path_buf());
        Ok(changes)
    }

    fn write_to(&mut self, path: &Path) -> Result<Changes, SessionError> {
        if let Err(e) = self.table.to_sink(self.source.as_ref(), path) {
            warn!("save to {} failed: {}", path.display(), e);
            return Err(e.into());
        }
        info!("saved {} rows to {}", self.table.row_count(), path.display());
        self.history.clear();
        self.structural_dirty = false;
        let mut changes = Changes::new(ChangeOrigin::User);
        changes.history = true;
        Ok(self.finish(changes))
    }

    /// Ask about unsaved changes. `None` means there was nothing to ask about.
    fn confirm_unsaved<F>(&mut self, resolve: F) -> Result<Option<UnsavedChoice>, SessionError>
    where
        F: FnOnce() -> UnsavedChoice,
    {
        if !self.is_dirty() {
            return Ok(None);
        }
        let choice = resolve();
        debug!("unsaved changes resolved as {:?}", choice);
        if choice == UnsavedChoice::Save {
            self.save()?;
        }
        Ok(Some(choice))
    }

    /// Throw away all changes: reload the backing file, or start empty when there is none
    fn reload(&mut self) -> Result<Changes, SessionError> {
        let table = match &self.path {
            Some(path) => TableStore::load(self.source.as_ref(), path)?,
            None => TableStore::new(),
        };
        self.install(table);
        Ok(Changes::everything(ChangeOrigin::System))
    }

    /// Swap in a freshly loaded table and reset per-table state
    fn install(&mut self, table: TableStore) {
        self.table = table;
        self.history.clear();
        self.structural_dirty = false;
        let cols = self.table.column_count();
        self.filters.remap_columns(|c| (c < cols).then_some(c));
        self.sort.remap_columns(|c| (c < cols).then_some(c));
    }

    // -------------------------------------------------------------------------
    // Cell edits (undoable)
    // -------------------------------------------------------------------------

    /// Coerce `text` into the column's type and store it.
    /// A coercion failure changes nothing and records nothing.
    pub fn edit_cell(&mut self, view_row: usize, col: usize, text: &str) -> Result<Changes, SessionError> {
        self.require_editing()?;
        let row = self.data_row(view_row)?;
        let column_type = self.table.column(col)?.column_type;
        let new_value = coerce(text, column_type).map_err(|e| {
            warn!("rejected edit at ({}, {}): {}", row, col, e);
            e
        })?;
        let old_value = self.table.get(row, col)?.cloned();
        if old_value == new_value {
            return Ok(self.finish(Changes::new(ChangeOrigin::User)));
        }
        self.commit(EditCommand::single(row, col, old_value, new_value))
    }

    /// Set every cell in the range to null as one undoable step
    pub fn clear_cells(&mut self, range: CellRange) -> Result<Changes, SessionError> {
        self.require_editing()?;
        self.check_range(&range)?;
        let changes = self.clear_changes(&range);
        self.commit(EditCommand::new("Clear cells", changes))
    }

    /// Tab-separated raw text of the range, one line per visible row
    pub fn copy(&self, range: CellRange) -> Result<String, SessionError> {
        self.check_range(&range)?;
        let (rows, cols) = self.clip_range(&range);
        let mut lines = Vec::with_capacity(rows.len());
        for &row in &rows {
            let fields: Vec<String> = cols
                .clone()
                .map(|col| {
                    self.table
                        .get(row, col)
                        .ok()
                        .flatten()
                        .map(|v| v.raw_text())
                        .unwrap_or_default()
                })
                .collect();
            lines.push(fields.join("\t"));
        }
        Ok(lines.join("\n"))
    }

    /// Copy then clear, as one undoable step
    pub fn cut(&mut self, range: CellRange) -> Result<(String, Changes), SessionError> {
        self.require_editing()?;
        let text = self.copy(range)?;
        let changes = self.clear_changes(&range);
        let changes = self.commit(EditCommand::new("Cut", changes))?;
        Ok((text, changes))
    }

    /// Paste tab-separated text with its top-left at the anchor.
    ///
    /// Each cell is coerced on its own: good cells are written as one command,
    /// bad cells keep their value and are reported. Anything past the table edge is dropped.
    pub fn paste(&mut self, view_row: usize, col: usize, text: &str) -> Result<PasteOutcome, SessionError> {
        self.require_editing()?;
        self.data_row(view_row)?;
        self.table.column(col)?;

        // An empty clipboard pastes nothing; it does not null the anchor
        if text.trim_end_matches(['\r', '\n']).is_empty() {
            return Ok(PasteOutcome {
                changes: self.finish(Changes::new(ChangeOrigin::User)),
                applied: 0,
                rejected: Vec::new(),
                clipped: 0,
            });
        }

        let mut pending = Vec::new();
        let mut rejected = Vec::new();
        let mut clipped = 0usize;

        for (i, line) in clipboard_lines(text).into_iter().enumerate() {
            for (j, field) in line.split('\t').enumerate() {
                let (target_view_row, target_col) = (view_row + i, col + j);
                let (Some(row), Ok(column)) = (
                    self.view.nth_visible(target_view_row),
                    self.table.column(target_col),
                ) else {
                    clipped += 1;
                    continue;
                };
                match coerce(field, column.column_type) {
                    Ok(new_value) => {
                        let old_value = self.table.get(row, target_col)?.cloned();
                        if old_value != new_value {
                            pending.push(CellChange {
                                row,
                                col: target_col,
                                old_value,
                                new_value,
                            });
                        }
                    }
                    Err(error) => rejected.push(RejectedCell {
                        view_row: target_view_row,
                        col: target_col,
                        error,
                    }),
                }
            }
        }

        if !rejected.is_empty() {
            warn!("paste rejected {} cell(s)", rejected.len());
        }
        let applied = pending.len();
        let changes = self.commit(EditCommand::new("Paste", pending))?;
        Ok(PasteOutcome {
            changes,
            applied,
            rejected,
            clipped,
        })
    }

    fn clear_changes(&self, range: &CellRange) -> Vec<CellChange> {
        let (rows, cols) = self.clip_range(range);
        let mut changes = Vec::new();
        for &row in &rows {
            for col in cols.clone() {
                if let Ok(Some(old)) = self.table.get(row, col) {
                    changes.push(CellChange {
                        row,
                        col,
                        old_value: Some(old.clone()),
                        new_value: None,
                    });
                }
            }
        }
        changes
    }

    /// User write path: apply new values, then record the command
    fn commit(&mut self, command: EditCommand) -> Result<Changes, SessionError> {
        let mut changes = Changes::new(ChangeOrigin::User);
        if command.is_empty() {
            return Ok(self.finish(changes));
        }
        for change in command.changes() {
            self.table.set(change.row, change.col, change.new_value.clone())?;
            changes.cells.push((change.row, change.col));
        }
        debug!("{}: {} cell(s)", command.description(), command.changes().len());
        self.history.push(command);
        changes.rows = self.view_depends_on_values();
        changes.history = true;
        Ok(self.finish(changes))
    }

    // -------------------------------------------------------------------------
    // Undo / redo
    // -------------------------------------------------------------------------

    pub fn undo(&mut self) -> Option<Changes> {
        if !self.mode.is_editing() {
            return None;
        }
        let command = self.history.undo()?;
        debug!("undo: {}", command.description());
        Some(self.write_system(&command, false))
    }

    pub fn redo(&mut self) -> Option<Changes> {
        if !self.mode.is_editing() {
            return None;
        }
        let command = self.history.redo()?;
        debug!("redo: {}", command.description());
        Some(self.write_system(&command, true))
    }

    /// System write path: replays history without recording a new command
    fn write_system(&mut self, command: &EditCommand, forward: bool) -> Changes {
        let mut changes = Changes::new(ChangeOrigin::System);
        let apply = |change: &CellChange| {
            let value = if forward { &change.new_value } else { &change.old_value };
            (change.row, change.col, value.clone())
        };
        let writes: Vec<_> = if forward {
            command.changes().iter().map(apply).collect()
        } else {
            command.changes().iter().rev().map(apply).collect()
        };
        for (row, col, value) in writes {
            match self.table.set(row, col, value) {
                Ok(()) => changes.cells.push((row, col)),
                Err(e) => warn!("skipping stale history entry: {}", e),
            }
        }
        changes.rows = self.view_depends_on_values();
        changes.history = true;
        self.finish(changes)
    }

    // -------------------------------------------------------------------------
    // Structural edits (not undoable)
    // -------------------------------------------------------------------------

    /// Insert a null row before the given view row; `visible_row_count()` appends
    pub fn insert_row(&mut self, view_at: usize) -> Result<Changes, SessionError> {
        self.require_editing()?;
        let visible = self.view.visible_count();
        let at = if view_at == visible {
            self.table.row_count()
        } else {
            self.data_row(view_at)?
        };
        self.table.insert_row(at)?;
        self.history.remap_rows(|r| Some(if r >= at { r + 1 } else { r }));
        debug!("inserted row at data row {}", at);
        Ok(self.structural(true, false))
    }

    /// Delete rows given as view rows. All indices are checked before anything changes.
    pub fn delete_rows(&mut self, view_rows: &BTreeSet<usize>) -> Result<Changes, SessionError> {
        self.require_editing()?;
        let data_rows = view_rows
            .iter()
            .map(|&v| self.data_row(v))
            .collect::<Result<BTreeSet<usize>, _>>()?;
        if data_rows.is_empty() {
            return Ok(self.finish(Changes::new(ChangeOrigin::User)));
        }
        self.table.delete_rows(&data_rows)?;
        self.history.remap_rows(|r| {
            if data_rows.contains(&r) {
                None
            } else {
                Some(r - data_rows.range(..r).count())
            }
        });
        debug!("deleted {} row(s)", data_rows.len());
        Ok(self.structural(true, false))
    }

    /// Insert a typed column; `default_text` is coerced and backfilled into every row
    pub fn insert_column(
        &mut self,
        at: usize,
        name: &str,
        column_type: ColumnType,
        default_text: &str,
    ) -> Result<Changes, SessionError> {
        self.require_editing()?;
        let default = coerce(default_text, column_type)?;
        self.table.insert_column(at, name, column_type, default)?;
        let shift = |c: usize| Some(if c >= at { c + 1 } else { c });
        self.history.remap_columns(shift);
        self.filters.remap_columns(shift);
        self.sort.remap_columns(shift);
        debug!("inserted column '{}' ({}) at {}", name, column_type, at);
        Ok(self.structural(false, true))
    }

    pub fn delete_columns(&mut self, ordinals: &BTreeSet<usize>) -> Result<Changes, SessionError> {
        self.require_editing()?;
        if ordinals.is_empty() {
            return Ok(self.finish(Changes::new(ChangeOrigin::User)));
        }
        self.table.delete_columns(ordinals)?;
        let shift = |c: usize| {
            if ordinals.contains(&c) {
                None
            } else {
                Some(c - ordinals.range(..c).count())
            }
        };
        self.history.remap_columns(shift);
        self.filters.remap_columns(shift);
        self.sort.remap_columns(shift);
        debug!("deleted {} column(s)", ordinals.len());
        Ok(self.structural(true, true))
    }

    fn structural(&mut self, rows: bool, columns: bool) -> Changes {
        self.structural_dirty = true;
        let mut changes = Changes::new(ChangeOrigin::User);
        changes.rows = rows || self.view_depends_on_values();
        changes.columns = columns;
        changes.history = true;
        self.finish(changes)
    }

    // -------------------------------------------------------------------------
    // Sort / filter (view only, allowed in any mode)
    // -------------------------------------------------------------------------

    /// Advance the header-click cycle for a column
    pub fn cycle_sort(&mut self, col: usize) -> Result<Changes, SessionError> {
        self.table.column(col)?;
        self.set_sort(self.sort.cycle(col))
    }

    pub fn set_sort(&mut self, state: SortState) -> Result<Changes, SessionError> {
        if let Some(col) = state.column() {
            self.table.column(col)?;
        }
        self.sort = state;
        Ok(self.view_changed())
    }

    /// Case-insensitive substring filter on displayed text; empty pattern clears
    pub fn set_filter(&mut self, col: usize, pattern: &str) -> Result<Changes, SessionError> {
        self.table.column(col)?;
        self.filters.set_filter(col, pattern);
        Ok(self.view_changed())
    }

    pub fn clear_filter(&mut self, col: usize) -> Changes {
        self.filters.clear_filter(col);
        self.view_changed()
    }

    pub fn clear_filters(&mut self) -> Changes {
        self.filters.clear_all();
        self.view_changed()
    }

    fn view_changed(&mut self) -> Changes {
        let mut changes = Changes::new(ChangeOrigin::User);
        changes.rows = true;
        self.finish(changes)
    }

    // -------------------------------------------------------------------------
    // Read-only accessors
    // -------------------------------------------------------------------------

    pub fn table(&self) -> &TableStore {
        &self.table
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Window title, e.g. "sales* - Parquet File Viewer"
    pub fn title(&self) -> String {
        let name = self
            .path
            .as_deref()
            .and_then(|p| p.file_stem())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNTITLED.to_string());
        let marker = if self.is_dirty() { "*" } else { "" };
        format!("{}{} - {}", name, marker, APP_NAME)
    }

    /// Data rows in display order
    pub fn visible_rows(&self) -> &[usize] {
        self.view.visible_rows()
    }

    pub fn visible_row_count(&self) -> usize {
        self.view.visible_count()
    }

    /// Data row behind a view row
    pub fn data_row_of(&self, view_row: usize) -> Option<usize> {
        self.view.nth_visible(view_row)
    }

    /// View row showing a data row (None when filtered out)
    pub fn view_row_of(&self, data_row: usize) -> Option<usize> {
        self.view.visible_position(data_row)
    }

    /// Display text of a cell by view row; out of range renders empty
    pub fn display(&self, view_row: usize, col: usize) -> String {
        match self.view.nth_visible(view_row) {
            Some(row) => self.table.display(row, col, &self.options.display),
            None => String::new(),
        }
    }

    pub fn alignment(&self, col: usize) -> Alignment {
        self.table
            .column(col)
            .map(|c| c.column_type.alignment())
            .unwrap_or_default()
    }

    /// Sum per column over visible rows
    pub fn totals(&self) -> &[Option<f64>] {
        &self.totals
    }

    /// Footer text per column
    pub fn totals_display(&self) -> Vec<String> {
        self.table
            .columns()
            .iter()
            .zip(&self.totals)
            .map(|(column, total)| format_total(column.column_type, *total, &self.options.display))
            .collect()
    }

    pub fn column_widths(&self) -> &[usize] {
        &self.widths
    }

    /// Status-bar numbers for a selection; parts outside the table are ignored
    pub fn selection_stats(&self, range: CellRange) -> SelectionStats {
        let (rows, cols) = self.clip_range(&range);
        let cells = rows
            .iter()
            .flat_map(|&row| cols.clone().map(move |col| (row, col)));
        aggregate::selection_stats(&self.table, cells)
    }

    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty() || self.structural_dirty
    }

    /// Data coordinates whose value differs from before the recorded edits
    pub fn modified_cells(&self) -> BTreeSet<(usize, usize)> {
        let mut original: BTreeMap<(usize, usize), _> = BTreeMap::new();
        for command in self.history.applied() {
            for change in command.changes() {
                original
                    .entry((change.row, change.col))
                    .or_insert(&change.old_value);
            }
        }
        original
            .into_iter()
            .filter(|&((row, col), old)| self.table.get(row, col).ok().flatten() != old.as_ref())
            .map(|(cell, _)| cell)
            .collect()
    }

    pub fn can_undo(&self) -> bool {
        self.mode.is_editing() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.mode.is_editing() && self.history.can_redo()
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_editing(&self) -> Result<(), SessionError> {
        if self.mode.is_editing() {
            Ok(())
        } else {
            Err(SessionError::ReadOnly)
        }
    }

    fn data_row(&self, view_row: usize) -> Result<usize, TableError> {
        self.view.nth_visible(view_row).ok_or(TableError::RowOutOfBounds {
            row: view_row,
            rows: self.view.visible_count(),
        })
    }

    /// The top-left corner must exist; the far corner is clipped
    fn check_range(&self, range: &CellRange) -> Result<(), SessionError> {
        self.data_row(range.start_row)?;
        self.table.column(range.start_col)?;
        Ok(())
    }

    /// Data rows (display order) and columns covered by a view range
    fn clip_range(&self, range: &CellRange) -> (Vec<usize>, std::ops::Range<usize>) {
        let visible = self.view.visible_rows();
        let row_end = range.end_row.saturating_add(1).min(visible.len());
        let rows = visible
            .get(range.start_row..row_end)
            .map(|r| r.to_vec())
            .unwrap_or_default();
        let col_end = range.end_col.saturating_add(1).min(self.table.column_count());
        let cols = range.start_col.min(col_end)..col_end;
        (rows, cols)
    }

    /// Filtering or sorting make row membership depend on cell values
    fn view_depends_on_values(&self) -> bool {
        !self.filters.is_empty() || self.sort.is_sorted()
    }

    /// Rebuild view, totals and widths from scratch
    fn refresh(&mut self) {
        let mask = visible_mask(&self.table, &self.filters, &self.options.display);
        let order = sort_order(&self.table, &self.sort);
        let mut view = RowView::new(self.table.row_count());
        view.apply_filter(mask);
        view.apply_sort(order);
        self.view = view;

        self.totals = aggregate::totals(&self.table, self.view.visible_rows());
        let totals_display = self.totals_display();
        self.widths = column_widths(
            &self.table,
            self.view.visible_rows(),
            &totals_display,
            &self.options.display,
            self.options.widths,
        );
    }

    fn finish(&mut self, mut changes: Changes) -> Changes {
        self.refresh();
        changes.totals = true;
        changes.widths = true;
        changes.dirty = self.is_dirty();
        changes
    }
}

/// Split clipboard text into lines, ignoring one trailing line break
fn clipboard_lines(text: &str) -> Vec<&str> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{sample_table, MemorySource};
    use crate::value::TypedValue;

    fn session() -> (EditSession, MemorySource) {
        let source = MemorySource::new();
        source.insert("people.parquet", sample_table());
        let mut session = EditSession::new(Box::new(source.clone()), SessionOptions::default());
        session
            .open(Path::new("people.parquet"), || UnsavedChoice::Cancel)
            .unwrap();
        (session, source)
    }

    fn editing() -> (EditSession, MemorySource) {
        let (mut session, source) = session();
        session.enable_editing();
        (session, source)
    }

    fn text(session: &EditSession, view_row: usize, col: usize) -> String {
        session.display(view_row, col)
    }

    #[test]
    fn test_open_starts_clean_in_viewing() {
        let (session, _) = session();
        assert_eq!(session.mode(), Mode::Viewing);
        assert!(!session.is_dirty());
        assert_eq!(session.visible_row_count(), 3);
        assert_eq!(session.title(), "people - Parquet File Viewer");
    }

    #[test]
    fn test_edit_requires_editing_mode() {
        let (mut session, _) = session();
        let err = session.edit_cell(0, 1, "Zed").unwrap_err();
        assert!(matches!(err, SessionError::ReadOnly));
        assert_eq!(text(&session, 0, 1), "Ann");
    }

    #[test]
    fn test_edit_undo_redo_scenario() {
        let (mut session, _) = editing();
        let changes = session.edit_cell(1, 1, "Bob").unwrap();
        assert_eq!(changes.cells, vec![(1, 1)]);
        assert_eq!(changes.origin, ChangeOrigin::User);
        assert!(session.is_dirty());
        assert_eq!(session.title(), "people* - Parquet File Viewer");

        let changes = session.undo().unwrap();
        assert!(changes.is_system());
        assert!(!session.is_dirty());
        assert_eq!(text(&session, 1, 1), "Ben");

        session.redo().unwrap();
        assert!(session.is_dirty());
        assert_eq!(text(&session, 1, 1), "Bob");
    }

    #[test]
    fn test_coercion_failure_changes_nothing() {
        let (mut session, _) = editing();
        let err = session.edit_cell(0, 0, "12x").unwrap_err();
        assert!(matches!(err, SessionError::Coercion(_)));
        assert_eq!(text(&session, 0, 0), "1");
        assert!(!session.can_undo());
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_unchanged_value_records_nothing() {
        let (mut session, _) = editing();
        session.edit_cell(0, 0, "1").unwrap();
        assert!(!session.can_undo());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let (mut session, _) = editing();
        session.edit_cell(0, 1, "A").unwrap();
        session.undo();
        assert!(session.can_redo());
        session.edit_cell(0, 1, "B").unwrap();
        assert!(!session.can_redo());
    }

    #[test]
    fn test_edit_through_sorted_view_targets_data_row() {
        let (mut session, _) = editing();
        // Descending by id: view 0 is data row 2 ("Cid")
        session.cycle_sort(0).unwrap();
        session.cycle_sort(0).unwrap();
        assert_eq!(text(&session, 0, 1), "Cid");

        let changes = session.edit_cell(0, 1, "Cy").unwrap();
        assert_eq!(changes.cells, vec![(2, 1)]);
        assert_eq!(session.table().get(2, 1).unwrap(), Some(&TypedValue::Text("Cy".into())));
    }

    #[test]
    fn test_filter_hides_rows_and_totals_follow() {
        let (mut session, _) = editing();
        assert_eq!(session.totals()[0], Some(6.0));
        session.set_filter(1, "N").unwrap();
        // "Ann" and "Ben" match
        assert_eq!(session.visible_rows(), &[0, 1]);
        assert_eq!(session.totals()[0], Some(3.0));
        assert_eq!(session.totals_display()[0], "3");

        session.clear_filters();
        assert_eq!(session.visible_row_count(), 3);
    }

    #[test]
    fn test_paste_partial_acceptance() {
        let (mut session, _) = editing();
        let outcome = session.paste(0, 0, "10\tX\nbad\tY\n7\tZ\t extra\n").unwrap();
        assert_eq!(outcome.applied, 5);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].view_row, 1);
        assert_eq!(outcome.rejected[0].col, 0);
        assert_eq!(outcome.clipped, 1);
        assert_eq!(text(&session, 1, 0), "2");
        assert_eq!(text(&session, 1, 1), "Y");

        // One command for the whole paste
        session.undo().unwrap();
        assert!(!session.can_undo());
        assert_eq!(text(&session, 0, 0), "1");
        assert_eq!(text(&session, 2, 1), "Cid");
    }

    #[test]
    fn test_paste_empty_clipboard_is_a_no_op() {
        let (mut session, _) = editing();
        for clip in ["", "\n", "\r\n"] {
            let outcome = session.paste(0, 1, clip).unwrap();
            assert_eq!(outcome.applied, 0);
            assert_eq!(outcome.clipped, 0);
            assert!(outcome.rejected.is_empty());
        }
        assert_eq!(text(&session, 0, 1), "Ann");
        assert!(!session.can_undo());
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_select_all_range_does_not_overflow() {
        let (mut session, _) = editing();
        let all = CellRange::new(0, 0, usize::MAX, usize::MAX);
        assert_eq!(all.cell_count(), usize::MAX);
        assert_eq!(session.selection_stats(all).count, 6);
        assert_eq!(session.copy(all).unwrap(), "1\tAnn\n2\tBen\n3\tCid");

        session.clear_cells(all).unwrap();
        assert_eq!(session.modified_cells().len(), 6);
    }

    #[test]
    fn test_copy_cut_round_trip() {
        let (mut session, _) = editing();
        let range = CellRange::new(0, 0, 1, 1);
        assert_eq!(session.copy(range).unwrap(), "1\tAnn\n2\tBen");

        let (clip, _) = session.cut(range).unwrap();
        assert_eq!(session.display(0, 1), "");
        assert_eq!(session.modified_cells().len(), 4);

        session.paste(0, 0, &clip).unwrap();
        assert_eq!(text(&session, 1, 1), "Ben");
        assert!(session.modified_cells().is_empty());
    }

    #[test]
    fn test_delete_rows_remaps_history() {
        let (mut session, _) = editing();
        session.edit_cell(2, 1, "Cyd").unwrap();
        session.delete_rows(&BTreeSet::from([0])).unwrap();
        assert!(session.is_dirty());
        assert_eq!(text(&session, 1, 1), "Cyd");

        // The edit moved from data row 2 to 1 and still undoes in place
        let changes = session.undo().unwrap();
        assert_eq!(changes.cells, vec![(1, 1)]);
        assert_eq!(text(&session, 1, 1), "Cid");
        // Structural change keeps the session dirty
        assert!(session.is_dirty());
    }

    #[test]
    fn test_delete_rows_out_of_bounds_changes_nothing() {
        let (mut session, _) = editing();
        let err = session.delete_rows(&BTreeSet::from([1, 9])).unwrap_err();
        assert!(matches!(err, SessionError::Table(TableError::RowOutOfBounds { .. })));
        assert_eq!(session.table().row_count(), 3);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_insert_column_and_delete_columns() {
        let (mut session, _) = editing();
        session.set_filter(1, "b").unwrap();
        session
            .insert_column(1, "score", ColumnType::Float, "1.5")
            .unwrap();
        assert_eq!(session.table().column(1).unwrap().name, "score");
        // The name filter followed its column to ordinal 2
        assert_eq!(session.filters().get(2), Some("b"));
        assert_eq!(session.totals()[1], Some(1.5));

        let err = session.insert_column(0, "name", ColumnType::Text, "").unwrap_err();
        assert!(matches!(err, SessionError::Table(TableError::DuplicateName(_))));

        session.delete_columns(&BTreeSet::from([2])).unwrap();
        assert!(session.filters().is_empty());
        assert_eq!(session.visible_row_count(), 3);
    }

    #[test]
    fn test_insert_row_appends_at_end() {
        let (mut session, _) = editing();
        session.insert_row(3).unwrap();
        assert_eq!(session.table().row_count(), 4);
        assert_eq!(session.display(3, 0), "");
        assert!(session.insert_row(9).is_err());
    }

    #[test]
    fn test_save_clears_history_and_dirty() {
        let (mut session, source) = editing();
        session.edit_cell(0, 1, "Anne").unwrap();
        session.save().unwrap();
        assert!(!session.is_dirty());
        assert!(!session.can_undo());
        let saved = source.get("people.parquet").unwrap();
        assert_eq!(saved.get(0, 1).unwrap(), Some(&TypedValue::Text("Anne".into())));
    }

    #[test]
    fn test_save_failure_keeps_dirty() {
        let (mut session, source) = editing();
        session.edit_cell(0, 1, "Anne").unwrap();
        source.fail_saves(true);
        assert!(matches!(session.save(), Err(SessionError::Save(_))));
        assert!(session.is_dirty());
        assert!(session.can_undo());
    }

    #[test]
    fn test_disable_editing_cancel_stays() {
        let (mut session, _) = editing();
        session.edit_cell(0, 1, "Anne").unwrap();
        let outcome = session.disable_editing(|| UnsavedChoice::Cancel).unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(session.mode(), Mode::Editing);
        assert_eq!(text(&session, 0, 1), "Anne");
    }

    #[test]
    fn test_disable_editing_discard_reloads() {
        let (mut session, _) = editing();
        session.edit_cell(0, 1, "Anne").unwrap();
        session.delete_rows(&BTreeSet::from([2])).unwrap();
        let outcome = session.disable_editing(|| UnsavedChoice::Discard).unwrap();
        match outcome {
            Transition::Completed(changes) => assert!(changes.is_system()),
            Transition::Cancelled => panic!("expected completion"),
        }
        assert_eq!(session.mode(), Mode::Viewing);
        assert!(!session.is_dirty());
        assert_eq!(session.table().row_count(), 3);
        assert_eq!(text(&session, 0, 1), "Ann");
    }

    #[test]
    fn test_disable_editing_save_failure_stays_editing() {
        let (mut session, source) = editing();
        session.edit_cell(0, 1, "Anne").unwrap();
        source.fail_saves(true);
        assert!(session.disable_editing(|| UnsavedChoice::Save).is_err());
        assert_eq!(session.mode(), Mode::Editing);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_resolver_not_called_when_clean() {
        let (mut session, _) = editing();
        let outcome = session
            .disable_editing(|| panic!("no prompt expected"))
            .unwrap();
        assert!(!outcome.is_cancelled());
    }

    #[test]
    fn test_open_failure_keeps_table() {
        let (mut session, _) = session();
        assert!(session.open(Path::new("missing.parquet"), || UnsavedChoice::Cancel).is_err());
        assert_eq!(session.table().row_count(), 3);
        assert_eq!(session.path(), Some(Path::new("people.parquet")));
    }

    #[test]
    fn test_new_table_and_save_needs_destination() {
        let (mut session, _) = session();
        session.new_table(|| UnsavedChoice::Cancel).unwrap();
        assert_eq!(session.table().column_count(), 0);
        assert_eq!(session.mode(), Mode::Editing);
        assert_eq!(session.title(), "Untitled - Parquet File Viewer");
        session.insert_column(0, "a", ColumnType::Text, "").unwrap();
        assert!(matches!(session.save(), Err(SessionError::NoDestination)));

        session.save_as(Path::new("new.parquet")).unwrap();
        assert_eq!(session.title(), "new - Parquet File Viewer");
    }

    #[test]
    fn test_selection_stats_counts_every_cell() {
        let (session, _) = session();
        let stats = session.selection_stats(CellRange::new(0, 0, 2, 1));
        assert_eq!(stats.count, 6);
        assert_eq!(stats.sum, Some(6.0));
        assert_eq!(stats.average, Some(2.0));
    }

    #[test]
    fn test_column_widths_track_edits() {
        let (mut session, _) = editing();
        assert_eq!(session.column_widths()[1], 4);
        session.edit_cell(0, 1, "Bartholomew").unwrap();
        assert_eq!(session.column_widths()[1], 11);
    }

    #[test]
    fn test_clipboard_lines() {
        assert_eq!(clipboard_lines("a\tb\r\nc\r\n"), vec!["a\tb", "c"]);
        assert_eq!(clipboard_lines("x"), vec!["x"]);
    }
}

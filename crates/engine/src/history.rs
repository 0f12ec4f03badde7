//! Undo/Redo history for cell edits
//!
//! Linear log: recording a new command discards everything that was undone.
//! Only cell values are recorded; structural changes (row/column insert and
//! delete) rewrite stored coordinates via `remap_rows` / `remap_columns`.

use crate::value::CellValue;

#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    pub row: usize,
    pub col: usize,
    pub old_value: CellValue,
    pub new_value: CellValue,
}

/// One logical user action. Multi-cell actions (paste, clear selection)
/// are a single command so they undo atomically.
#[derive(Clone, Debug, PartialEq)]
pub struct EditCommand {
    description: String,
    changes: Vec<CellChange>,
}

impl EditCommand {
    pub fn new(description: impl Into<String>, changes: Vec<CellChange>) -> Self {
        Self {
            description: description.into(),
            changes,
        }
    }

    pub fn single(row: usize, col: usize, old_value: CellValue, new_value: CellValue) -> Self {
        Self::new("Edit cell", vec![CellChange { row, col, old_value, new_value }])
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn changes(&self) -> &[CellChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Rebuild with rewritten coordinates; changes mapped to `None` are dropped
    fn remapped<F>(&self, f: F) -> Self
    where
        F: Fn(&CellChange) -> Option<(usize, usize)>,
    {
        let changes = self
            .changes
            .iter()
            .filter_map(|change| {
                f(change).map(|(row, col)| CellChange {
                    row,
                    col,
                    old_value: change.old_value.clone(),
                    new_value: change.new_value.clone(),
                })
            })
            .collect();
        Self {
            description: self.description.clone(),
            changes,
        }
    }
}

pub struct CommandStack {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
    /// None keeps every command
    max_entries: Option<usize>,
    /// Undo depth at the last save/load. None once that state is unreachable.
    save_point: Option<usize>,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandStack {
    /// Unbounded history
    pub fn new() -> Self {
        Self::with_limit(0)
    }

    /// Keep at most `max_entries` commands; 0 means no limit
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: (max_entries > 0).then_some(max_entries),
            save_point: Some(0),
        }
    }

    pub fn push(&mut self, command: EditCommand) {
        if command.is_empty() {
            return;
        }

        // Redo branch is gone; if the save point lived on it, clean is unreachable
        if let Some(point) = self.save_point {
            if point > self.undo_stack.len() {
                self.save_point = None;
            }
        }
        self.undo_stack.push(command);
        self.redo_stack.clear();

        // Limit history size
        if self.max_entries.is_some_and(|max| self.undo_stack.len() > max) {
            self.undo_stack.remove(0);
            self.save_point = match self.save_point {
                Some(0) | None => None,
                Some(point) => Some(point - 1),
            };
        }
    }

    /// Pop the last command for undo; the caller applies its old values
    pub fn undo(&mut self) -> Option<EditCommand> {
        let command = self.undo_stack.pop()?;
        self.redo_stack.push(command.clone());
        Some(command)
    }

    /// Pop from the redo stack; the caller applies its new values
    pub fn redo(&mut self) -> Option<EditCommand> {
        let command = self.redo_stack.pop()?;
        self.undo_stack.push(command.clone());
        Some(command)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Applied commands, oldest first
    pub fn applied(&self) -> &[EditCommand] {
        &self.undo_stack
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.save_point = Some(0);
    }

    /// True when the applied commands differ from the last save point
    pub fn is_dirty(&self) -> bool {
        self.save_point != Some(self.undo_stack.len())
    }

    /// Rewrite row coordinates after rows were inserted or deleted.
    /// `f` maps an old row to its new row, or `None` if the row is gone.
    pub fn remap_rows<F>(&mut self, f: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        self.remap(|c| f(c.row).map(|row| (row, c.col)));
    }

    /// Rewrite column ordinals after columns were inserted or deleted
    pub fn remap_columns<F>(&mut self, f: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        self.remap(|c| f(c.col).map(|col| (c.row, col)));
    }

    fn remap<F>(&mut self, f: F)
    where
        F: Fn(&CellChange) -> Option<(usize, usize)>,
    {
        // Dropping whole commands shifts depths, so the save point cannot be tracked
        let before = (self.undo_stack.len(), self.redo_stack.len());
        self.undo_stack = self
            .undo_stack
            .iter()
            .map(|cmd| cmd.remapped(&f))
            .filter(|cmd| !cmd.is_empty())
            .collect();
        self.redo_stack = self
            .redo_stack
            .iter()
            .map(|cmd| cmd.remapped(&f))
            .filter(|cmd| !cmd.is_empty())
            .collect();
        if (self.undo_stack.len(), self.redo_stack.len()) != before {
            self.save_point = None;
        }
    }
}

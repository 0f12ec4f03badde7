use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, SaveError, TableError};
use crate::value::{format_value, CellValue, ColumnType, DisplayOptions, TypedValue};

/// External file collaborator: reads and writes whole tables.
///
/// The physical format is entirely the implementor's business; the engine
/// only ever sees a rectangular, typed `TableStore`.
pub trait TableSource {
    fn load(&self, path: &Path) -> Result<TableStore, LoadError>;
    fn save(&self, path: &Path, table: &TableStore) -> Result<(), SaveError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// In-memory table: ordered typed columns and dense rows.
///
/// Invariants:
/// - every row has exactly `columns.len()` cells
/// - column names are unique
/// - a cell's value type matches its column (enforced by callers of `set`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableStore {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl TableStore {
    /// Empty table with no columns ("new file")
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: Vec<Column>) -> Result<Self, LoadError> {
        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(LoadError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Load a full table from a source
    pub fn load(source: &dyn TableSource, path: &Path) -> Result<Self, LoadError> {
        source.load(path)
    }

    /// Serialize current state. Never mutates, never touches dirty state.
    pub fn to_sink(&self, sink: &dyn TableSource, path: &Path) -> Result<(), SaveError> {
        sink.save(path, self)
    }

    /// Append a row while building a table. Rejects ragged input.
    pub fn push_row(&mut self, cells: Vec<CellValue>) -> Result<(), LoadError> {
        if cells.len() != self.columns.len() {
            return Err(LoadError::Ragged {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        self.rows.push(cells);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, col: usize) -> Result<&Column, TableError> {
        self.columns.get(col).ok_or(TableError::ColumnOutOfBounds {
            col,
            cols: self.columns.len(),
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row(&self, row: usize) -> Result<&[CellValue], TableError> {
        self.rows
            .get(row)
            .map(|r| r.as_slice())
            .ok_or(TableError::RowOutOfBounds {
                row,
                rows: self.rows.len(),
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<(), TableError> {
        if row >= self.rows.len() {
            return Err(TableError::RowOutOfBounds {
                row,
                rows: self.rows.len(),
            });
        }
        if col >= self.columns.len() {
            return Err(TableError::ColumnOutOfBounds {
                col,
                cols: self.columns.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Option<&TypedValue>, TableError> {
        self.check_cell(row, col)?;
        Ok(self.rows[row][col].as_ref())
    }

    /// Overwrite a cell. Type checking is the caller's job.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) -> Result<(), TableError> {
        self.check_cell(row, col)?;
        self.rows[row][col] = value;
        Ok(())
    }

    /// Display text of a cell; out-of-range cells render empty
    pub fn display(&self, row: usize, col: usize, opts: &DisplayOptions) -> String {
        match self.get(row, col) {
            Ok(value) => format_value(value, opts),
            Err(_) => String::new(),
        }
    }

    /// Insert a fully-null row at `at`, shifting later rows down. `at == row_count` appends.
    pub fn insert_row(&mut self, at: usize) -> Result<(), TableError> {
        if at > self.rows.len() {
            return Err(TableError::RowOutOfBounds {
                row: at,
                rows: self.rows.len(),
            });
        }
        self.rows.insert(at, vec![None; self.columns.len()]);
        Ok(())
    }

    /// Remove rows given in pre-deletion coordinates; survivors compact with no gaps
    pub fn delete_rows(&mut self, indices: &BTreeSet<usize>) -> Result<(), TableError> {
        if let Some(&last) = indices.iter().next_back() {
            if last >= self.rows.len() {
                return Err(TableError::RowOutOfBounds {
                    row: last,
                    rows: self.rows.len(),
                });
            }
        }
        let mut index = 0;
        self.rows.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        Ok(())
    }

    /// Insert a column at `at`, backfilling every row with `default`
    pub fn insert_column(
        &mut self,
        at: usize,
        name: &str,
        column_type: ColumnType,
        default: CellValue,
    ) -> Result<(), TableError> {
        if self.column_index(name).is_some() {
            return Err(TableError::DuplicateName(name.to_string()));
        }
        if at > self.columns.len() {
            return Err(TableError::ColumnOutOfBounds {
                col: at,
                cols: self.columns.len(),
            });
        }
        if let Some(value) = &default {
            if value.column_type() != column_type {
                return Err(TableError::TypeMismatch {
                    expected: column_type,
                    found: value.column_type(),
                });
            }
        }

        self.columns.insert(at, Column::new(name, column_type));
        for row in &mut self.rows {
            row.insert(at, default.clone());
        }
        Ok(())
    }

    /// Remove columns given in pre-deletion ordinals; later ordinals shift down
    pub fn delete_columns(&mut self, ordinals: &BTreeSet<usize>) -> Result<(), TableError> {
        if let Some(&last) = ordinals.iter().next_back() {
            if last >= self.columns.len() {
                return Err(TableError::ColumnOutOfBounds {
                    col: last,
                    cols: self.columns.len(),
                });
            }
        }
        // Remove from the back so earlier ordinals stay valid
        for &col in ordinals.iter().rev() {
            self.columns.remove(col);
            for row in &mut self.rows {
                row.remove(col);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableStore {
        let mut table = TableStore::with_columns(vec![
            Column::new("id", ColumnType::Integer),
            Column::new("name", ColumnType::Text),
        ])
        .unwrap();
        for (id, name) in [(1, "Ann"), (2, "Ben"), (3, "Cid")] {
            table
                .push_row(vec![Some(TypedValue::Int(id)), Some(TypedValue::Text(name.into()))])
                .unwrap();
        }
        table
    }

    fn text(table: &TableStore, row: usize, col: usize) -> String {
        table.display(row, col, &DisplayOptions::default())
    }

    #[test]
    fn test_get_out_of_bounds() {
        let table = sample();
        assert_eq!(table.get(3, 0), Err(TableError::RowOutOfBounds { row: 3, rows: 3 }));
        assert_eq!(table.get(0, 2), Err(TableError::ColumnOutOfBounds { col: 2, cols: 2 }));
    }

    #[test]
    fn test_push_row_rejects_ragged() {
        let mut table = sample();
        let err = table.push_row(vec![None]).unwrap_err();
        assert!(matches!(err, LoadError::Ragged { row: 3, expected: 2, found: 1 }));
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_duplicate_columns_rejected_on_build() {
        let err = TableStore::with_columns(vec![
            Column::new("a", ColumnType::Text),
            Column::new("a", ColumnType::Integer),
        ])
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn test_delete_rows_compacts() {
        let mut table = sample();
        table.delete_rows(&BTreeSet::from([1])).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, 0).unwrap(), Some(&TypedValue::Int(3)));
    }

    #[test]
    fn test_delete_rows_out_of_bounds_is_atomic() {
        let mut table = sample();
        let err = table.delete_rows(&BTreeSet::from([0, 7])).unwrap_err();
        assert_eq!(err, TableError::RowOutOfBounds { row: 7, rows: 3 });
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_insert_row_shifts_and_appends() {
        let mut table = sample();
        table.insert_row(1).unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.get(1, 0).unwrap(), None);
        assert_eq!(text(&table, 2, 1), "Ben");

        table.insert_row(4).unwrap();
        assert_eq!(table.row_count(), 5);
        assert!(table.insert_row(9).is_err());
    }

    #[test]
    fn test_insert_column_backfills_default() {
        let mut table = sample();
        table
            .insert_column(1, "active", ColumnType::Boolean, Some(TypedValue::Bool(true)))
            .unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.column(1).unwrap().name, "active");
        for row in table.rows() {
            assert_eq!(row.len(), 3);
            assert_eq!(row[1], Some(TypedValue::Bool(true)));
        }
        assert_eq!(text(&table, 0, 2), "Ann");
    }

    #[test]
    fn test_insert_column_errors() {
        let mut table = sample();
        assert_eq!(
            table.insert_column(0, "name", ColumnType::Text, None),
            Err(TableError::DuplicateName("name".into()))
        );
        assert_eq!(
            table.insert_column(0, "score", ColumnType::Float, Some(TypedValue::Int(1))),
            Err(TableError::TypeMismatch { expected: ColumnType::Float, found: ColumnType::Integer })
        );
        assert!(table.insert_column(5, "x", ColumnType::Text, None).is_err());
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_delete_columns_shifts_ordinals() {
        let mut table = sample();
        table.insert_column(2, "city", ColumnType::Text, None).unwrap();
        table.delete_columns(&BTreeSet::from([0, 1])).unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.column(0).unwrap().name, "city");
        assert!(table.rows().all(|r| r.len() == 1));
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = TableStore::new();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }
}

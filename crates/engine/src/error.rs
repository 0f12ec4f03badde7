use std::path::PathBuf;

use thiserror::Error;

use crate::value::ColumnType;

/// Source could not be read into a rectangular table. Prior state is untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
}

/// Table could not be written. In-memory state and dirty flag are untouched.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cannot write {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("cannot encode table: {0}")]
    Encode(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
}

/// User text does not fit the column's declared type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{input}' is not a valid {expected}")]
pub struct CoercionError {
    pub input: String,
    pub expected: ColumnType,
}

/// Structural or addressing misuse of a `TableStore`. Nothing is mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("column '{0}' already exists")]
    DuplicateName(String),
    #[error("row {row} out of bounds ({rows} rows)")]
    RowOutOfBounds { row: usize, rows: usize },
    #[error("column {col} out of bounds ({cols} columns)")]
    ColumnOutOfBounds { col: usize, cols: usize },
    #[error("value of type {found} does not fit column of type {expected}")]
    TypeMismatch { expected: ColumnType, found: ColumnType },
}

/// Everything an `EditSession` operation can report. All variants are recoverable.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("editing is not enabled")]
    ReadOnly,
    #[error("no file to save to")]
    NoDestination,
}

//! Tabular edit-session engine: typed table storage, undoable cell edits,
//! view-only sort and filter, totals, and the `EditSession` that keeps them
//! consistent.

pub mod aggregate;
pub mod coerce;
pub mod error;
pub mod events;
pub mod filter;
pub mod history;
pub mod layout;
pub mod session;
pub mod sort;
pub mod table;
pub mod value;

#[cfg(test)]
pub mod harness;

pub use error::{CoercionError, LoadError, SaveError, SessionError, TableError};
pub use events::{ChangeOrigin, Changes};
pub use session::{
    CellRange, EditSession, Mode, PasteOutcome, RejectedCell, SessionOptions, Transition, UnsavedChoice,
};
pub use table::{Column, TableSource, TableStore};
pub use value::{Alignment, CellValue, ColumnType, DisplayOptions, TypedValue};

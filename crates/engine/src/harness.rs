//! Test harness for session operations without touching the filesystem.
//!
//! `MemorySource` is a `TableSource` backed by a shared map of path -> table.
//! Clones share state, so a test can hand one clone to an `EditSession` and
//! keep another to inspect what was saved or to inject save failures.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{LoadError, SaveError};
use crate::table::{Column, TableSource, TableStore};
use crate::value::{ColumnType, TypedValue};

#[derive(Default)]
struct Store {
    tables: RefCell<HashMap<PathBuf, TableStore>>,
    fail_saves: Cell<bool>,
}

#[derive(Clone, Default)]
pub struct MemorySource {
    store: Rc<Store>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, table: TableStore) {
        self.store.tables.borrow_mut().insert(path.into(), table);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<TableStore> {
        self.store.tables.borrow().get(path.as_ref()).cloned()
    }

    /// Make every subsequent save fail with an I/O error
    pub fn fail_saves(&self, fail: bool) {
        self.store.fail_saves.set(fail);
    }
}

impl TableSource for MemorySource {
    fn load(&self, path: &Path) -> Result<TableStore, LoadError> {
        self.get(path).ok_or_else(|| LoadError::Io {
            path: path.to_path_buf(),
            message: "not found".to_string(),
        })
    }

    fn save(&self, path: &Path, table: &TableStore) -> Result<(), SaveError> {
        if self.store.fail_saves.get() {
            return Err(SaveError::Io {
                path: path.to_path_buf(),
                message: "disk full".to_string(),
            });
        }
        self.insert(path, table.clone());
        Ok(())
    }
}

/// `id: Integer`, `name: Text` with rows (1, Ann), (2, Ben), (3, Cid)
pub fn sample_table() -> TableStore {
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

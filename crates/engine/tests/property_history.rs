// Property-based tests for undo/redo over arbitrary edit sequences.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::path::Path;

use proptest::prelude::*;
use parqview_engine::{
    Column, ColumnType, EditSession, LoadError, SaveError, SessionOptions, TableSource, TableStore,
    TypedValue, UnsavedChoice,
};

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

const ROWS: usize = 6;

struct Fixed;

impl TableSource for Fixed {
    fn load(&self, _path: &Path) -> Result<TableStore, LoadError> {
        let mut table = TableStore::with_columns(vec![
            Column::new("qty", ColumnType::Integer),
            Column::new("price", ColumnType::Float),
            Column::new("label", ColumnType::Text),
        ])
        .unwrap();
        for i in 0..ROWS {
            table
                .push_row(vec![
                    Some(TypedValue::Int(i as i64)),
                    (i % 2 == 0).then(|| TypedValue::Float(i as f64 * 1.5)),
                    Some(TypedValue::Text(format!("item {i}"))),
                ])
                .unwrap();
        }
        Ok(table)
    }

    fn save(&self, _path: &Path, _table: &TableStore) -> Result<(), SaveError> {
        Ok(())
    }
}

fn session() -> EditSession {
    let mut session = EditSession::new(Box::new(Fixed), SessionOptions::default());
    session
        .open(Path::new("fixed.parquet"), || UnsavedChoice::Cancel)
        .unwrap();
    session.enable_editing();
    session
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Arbitrary cell text: numbers, words, blanks and some junk that fails coercion
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"-?[0-9]{1,5}",
        2 => r"-?[0-9]{1,4}\.[0-9]{1,2}",
        2 => r"[a-z ]{0,8}",
        1 => Just(String::new()),
    ]
}

fn arb_edit() -> impl Strategy<Value = (usize, usize, String)> {
    (0..ROWS, 0..3usize, arb_text())
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_128())]

    #[test]
    fn undo_all_restores_original_redo_all_restores_edited(
        edits in prop::collection::vec(arb_edit(), 1..25)
    ) {
        let mut session = session();
        let original = session.table().clone();

        for (row, col, text) in &edits {
            // Coercion failures are expected for junk input and must not mutate
            let before = session.table().clone();
            if session.edit_cell(*row, *col, text).is_err() {
                prop_assert_eq!(session.table(), &before);
            }
        }
        let edited = session.table().clone();

        while session.can_undo() {
            prop_assert!(session.undo().is_some());
        }
        prop_assert_eq!(session.table(), &original);
        prop_assert!(!session.is_dirty());

        while session.can_redo() {
            prop_assert!(session.redo().is_some());
        }
        prop_assert_eq!(session.table(), &edited);
    }

    #[test]
    fn modified_cells_match_diff_against_original(
        edits in prop::collection::vec(arb_edit(), 1..25)
    ) {
        let mut session = session();
        let original = session.table().clone();
        for (row, col, text) in &edits {
            let _ = session.edit_cell(*row, *col, text);
        }

        let mut expected = std::collections::BTreeSet::new();
        for row in 0..ROWS {
            for col in 0..3 {
                if original.get(row, col).unwrap() != session.table().get(row, col).unwrap() {
                    expected.insert((row, col));
                }
            }
        }
        prop_assert_eq!(session.modified_cells(), expected);
    }
}

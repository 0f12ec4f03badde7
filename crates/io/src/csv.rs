// CSV/TSV import/export

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use log::{debug, warn};
use parqview_engine::coerce::{coerce, infer_column_type};
use parqview_engine::{Column, LoadError, SaveError, TableStore};

use crate::write_atomically;

pub fn import(path: &Path) -> Result<TableStore, LoadError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter).map_err(|e| with_path(e, path))
}

pub fn import_tsv(path: &Path) -> Result<TableStore, LoadError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, b'\t').map_err(|e| with_path(e, path))
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<TableStore, LoadError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter).map_err(|e| with_path(e, path))
}

fn with_path(err: LoadError, path: &Path) -> LoadError {
    match err {
        LoadError::Parse { message, .. } => LoadError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Higher field count breaks ties: more columns = more likely real delimiter
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let io_err = |e: std::io::Error| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            warn!("{} is not UTF-8, decoding as Windows-1252", path.display());
            // Common for Excel-exported CSVs
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Blank headers get a positional name; repeats get a numeric suffix
fn unique_headers<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::new();
    for (i, header) in raw.into_iter().enumerate() {
        let base = match header.trim() {
            "" => format!("column_{}", i + 1),
            name => name.to_string(),
        };
        let mut name = base.clone();
        let mut n = 2;
        while seen.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

/// First record is the header; column types are inferred from the data records.
fn import_from_string(content: &str, delimiter: u8) -> Result<TableStore, LoadError> {
    let parse_err = |message: String| LoadError::Parse {
        path: Default::default(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let Some(header) = records.next() else {
        return Ok(TableStore::new());
    };
    let header = header.map_err(|e| parse_err(e.to_string()))?;
    let names = unique_headers(header.iter());
    let width = names.len();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for result in records {
        let record = result.map_err(|e| parse_err(e.to_string()))?;
        // A fully blank line carries no row
        if record.len() == 1 && record.get(0) == Some("") && width > 1 {
            continue;
        }
        if record.len() != width {
            return Err(LoadError::Ragged {
                row: raw_rows.len(),
                expected: width,
                found: record.len(),
            });
        }
        raw_rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    let columns: Vec<Column> = names
        .into_iter()
        .enumerate()
        .map(|(col, name)| {
            let column_type = infer_column_type(raw_rows.iter().map(|r| r[col].as_str()));
            Column::new(name, column_type)
        })
        .collect();

    let mut table = TableStore::with_columns(columns)?;
    for raw in &raw_rows {
        let mut cells = Vec::with_capacity(width);
        for (col, field) in raw.iter().enumerate() {
            let column_type = table.columns()[col].column_type;
            cells.push(coerce(field, column_type).map_err(|e| parse_err(e.to_string()))?);
        }
        table.push_row(cells)?;
    }

    debug!(
        "parsed delimited text: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

pub fn export(table: &TableStore, path: &Path) -> Result<(), SaveError> {
    export_with_delimiter(table, path, b',')
}

pub fn export_tsv(table: &TableStore, path: &Path) -> Result<(), SaveError> {
    export_with_delimiter(table, path, b'\t')
}

/// Header row then one record per row; values are written unformatted.
/// Like the parquet writer, the target is only replaced once the whole file is written.
fn export_with_delimiter(table: &TableStore, path: &Path, delimiter: u8) -> Result<(), SaveError> {
    let io_err = |message: String| SaveError::Io {
        path: path.to_path_buf(),
        message,
    };
    write_atomically(path, |partial| {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(partial)
            .map_err(|e| io_err(e.to_string()))?;

        if table.column_count() > 0 {
            writer
                .write_record(table.columns().iter().map(|c| c.name.as_str()))
                .map_err(|e| io_err(e.to_string()))?;
        }

        for row in table.rows() {
            let record: Vec<String> = row
                .iter()
                .map(|cell| cell.as_ref().map(|v| v.raw_text()).unwrap_or_default())
                .collect();
            writer.write_record(&record).map_err(|e| io_err(e.to_string()))?;
        }

        writer.flush().map_err(|e| io_err(e.to_string()))
    })?;
    debug!("wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    use parqview_engine::{ColumnType, TypedValue};

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Name|Age|City\nAlice|30|Paris\nBob|25|London\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        // Semicolon delimiter but commas appear inside quoted fields
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_semicolon_csv_import_infers_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "Name;Age;City\nAlice;30;Paris\nBob;;London\n").unwrap();

        let table = import(&path).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Age", "City"]);
        assert_eq!(table.column(1).unwrap().column_type, ColumnType::Integer);
        assert_eq!(table.get(0, 1).unwrap(), Some(&TypedValue::Int(30)));
        assert_eq!(table.get(1, 1).unwrap(), None);
        assert_eq!(table.get(1, 2).unwrap(), Some(&TypedValue::Text("London".into())));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = import_from_string("a,b\n1,2\n3\n", b',').unwrap_err();
        assert!(matches!(err, LoadError::Ragged { row: 1, expected: 2, found: 1 }));
    }

    #[test]
    fn test_headers_made_unique() {
        assert_eq!(
            unique_headers(["id", "", "id", "id"]),
            vec!["id", "column_2", "id_2", "id_3"]
        );
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        let table = import_from_string("", b',').unwrap();
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "café" with 0xE9 for é
        fs::write(&path, b"name\ncaf\xe9\n").unwrap();
        let table = import(&path).unwrap();
        assert_eq!(table.get(0, 0).unwrap(), Some(&TypedValue::Text("café".into())));
    }

    #[test]
    fn test_tsv_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.tsv");

        let mut table = TableStore::with_columns(vec![
            Column::new("Name", ColumnType::Text),
            Column::new("Value", ColumnType::Float),
            Column::new("Count", ColumnType::Integer),
        ])
        .unwrap();
        table
            .push_row(vec![
                Some(TypedValue::Text("Alice, Jr.".into())),
                Some(TypedValue::Float(4.0)),
                Some(TypedValue::Int(1_000_000)),
            ])
            .unwrap();
        table
            .push_row(vec![Some(TypedValue::Text("Bob".into())), Some(TypedValue::Float(17.25)), None])
            .unwrap();

        export_tsv(&table, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains('\t'), "TSV should contain tab characters");
        // Raw values, no display grouping
        assert!(content.contains("1000000"));

        let imported = import_tsv(&path).unwrap();
        assert_eq!(imported, table);
    }

    #[test]
    fn test_failed_export_leaves_original_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        fs::write(&path, "region,amount\nnorth,10\n").unwrap();
        // A directory squatting on the partial path makes the write fail
        fs::create_dir(crate::partial_path(&path)).unwrap();

        let mut table = TableStore::with_columns(vec![Column::new("region", ColumnType::Text)]).unwrap();
        table.push_row(vec![Some(TypedValue::Text("south".into()))]).unwrap();

        let err = export(&table, &path).unwrap_err();
        assert!(matches!(err, SaveError::Io { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "region,amount\nnorth,10\n");
    }

    #[test]
    fn test_export_replaces_target_and_cleans_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        fs::write(&path, "old\n").unwrap();

        let mut table = TableStore::with_columns(vec![Column::new("region", ColumnType::Text)]).unwrap();
        table.push_row(vec![Some(TypedValue::Text("south".into()))]).unwrap();

        export(&table, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "region\nsouth\n");
        assert!(!crate::partial_path(&path).exists());
    }
}

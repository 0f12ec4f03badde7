// File I/O: Parquet and CSV/TSV behind the engine's TableSource seam

pub mod csv;
pub mod parquet;

use std::path::{Path, PathBuf};

use log::debug;
use parqview_engine::{LoadError, SaveError, TableSource, TableStore};

/// On-disk formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Parquet,
    Csv,
    Tsv,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => Some(FileFormat::Parquet),
            "csv" | "txt" => Some(FileFormat::Csv),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Parquet => "parquet",
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
        }
    }
}

/// Sibling file a save is written to before it replaces the target
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Run `write` against the partial path, then rename it over `path`.
///
/// On any failure the partial file is removed and `path` is left as it was.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<(), SaveError>
where
    F: FnOnce(&Path) -> Result<(), SaveError>,
{
    let partial = partial_path(path);
    let result = write(&partial).and_then(|()| {
        std::fs::rename(&partial, path).map_err(|e| SaveError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

fn describe(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| path.display().to_string())
}

/// Filesystem-backed collaborator used by real front ends
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl TableSource for FileSource {
    fn load(&self, path: &Path) -> Result<TableStore, LoadError> {
        let format =
            FileFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat(describe(path)))?;
        debug!("loading {} as {}", path.display(), format.name());
        match format {
            FileFormat::Parquet => parquet::import(path),
            FileFormat::Csv => csv::import(path),
            FileFormat::Tsv => csv::import_tsv(path),
        }
    }

    fn save(&self, path: &Path, table: &TableStore) -> Result<(), SaveError> {
        let format =
            FileFormat::from_path(path).ok_or_else(|| SaveError::UnsupportedFormat(describe(path)))?;
        debug!("saving {} as {}", path.display(), format.name());
        match format {
            FileFormat::Parquet => parquet::export(table, path),
            FileFormat::Csv => csv::export(table, path),
            FileFormat::Tsv => csv::export_tsv(table, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.parquet")), Some(FileFormat::Parquet));
        assert_eq!(FileFormat::from_path(Path::new("a.PQ")), Some(FileFormat::Parquet));
        assert_eq!(FileFormat::from_path(Path::new("a.csv")), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_path(Path::new("a.tsv")), Some(FileFormat::Tsv));
        assert_eq!(FileFormat::from_path(Path::new("a.xlsx")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_partial_path_is_a_sibling() {
        assert_eq!(
            partial_path(Path::new("/data/sales.csv")),
            PathBuf::from("/data/sales.csv.partial")
        );
    }

    #[test]
    fn test_write_atomically_keeps_target_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.csv");
        std::fs::write(&path, "a\n1\n").unwrap();

        let result = write_atomically(&path, |partial| {
            std::fs::write(partial, "half").unwrap();
            Err(SaveError::Encode("boom".into()))
        });

        assert!(matches!(result, Err(SaveError::Encode(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_unsupported_format_errors() {
        let err = FileSource.load(Path::new("book.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == ".xlsx"));
        let err = FileSource.save(Path::new("book"), &TableStore::new()).unwrap_err();
        assert!(matches!(err, SaveError::UnsupportedFormat(_)));
    }
}

// Most-recently-opened files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Newest first, no duplicates, at most `RecentFiles::LIMIT` entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentFiles(Vec<PathBuf>);

impl RecentFiles {
    pub const LIMIT: usize = 5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Move (or add) a path to the front
    pub fn push(&mut self, path: &Path) {
        self.0.retain(|p| p != path);
        self.0.insert(0, path.to_path_buf());
        self.0.truncate(Self::LIMIT);
    }

    pub fn remove(&mut self, path: &Path) {
        self.0.retain(|p| p != path);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(|p| p.as_path())
    }

    pub fn most_recent(&self) -> Option<&Path> {
        self.0.first().map(|p| p.as_path())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Re-apply the cap and dedup after deserializing a hand-edited file
    pub(crate) fn normalize(&mut self) {
        let mut seen: Vec<PathBuf> = Vec::with_capacity(self.0.len());
        for p in self.0.drain(..) {
            if !seen.contains(&p) {
                seen.push(p);
            }
        }
        seen.truncate(Self::LIMIT);
        self.0 = seen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_front_inserts() {
        let mut recent = RecentFiles::new();
        recent.push(Path::new("a.parquet"));
        recent.push(Path::new("b.parquet"));
        assert_eq!(recent.most_recent(), Some(Path::new("b.parquet")));
    }

    #[test]
    fn test_push_deduplicates() {
        let mut recent = RecentFiles::new();
        for name in ["a", "b", "c", "a"] {
            recent.push(Path::new(name));
        }
        let names: Vec<&Path> = recent.iter().collect();
        assert_eq!(names, vec![Path::new("a"), Path::new("c"), Path::new("b")]);
    }

    #[test]
    fn test_capped_at_five() {
        let mut recent = RecentFiles::new();
        for i in 0..8 {
            recent.push(&PathBuf::from(format!("f{i}.parquet")));
        }
        assert_eq!(recent.len(), RecentFiles::LIMIT);
        assert_eq!(recent.most_recent(), Some(Path::new("f7.parquet")));
        assert!(!recent.iter().any(|p| p == Path::new("f2.parquet")));
    }

    #[test]
    fn test_normalize() {
        let mut recent: RecentFiles =
            serde_json::from_str(r#"["a","a","b","c","d","e","f"]"#).unwrap();
        recent.normalize();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent.iter().last(), Some(Path::new("e")));
    }
}

//! Saved filter list.
//!
//! The filter chain is persisted as a pretty-printed JSON array of
//! `{ "name", "pattern", "type" }` records, by default at
//! `~/.config/logtidy/filters.json`. A missing file is an empty list.

use crate::filter::Filter;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while reading or writing the filter file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not determine home directory (HOME is not set)")]
    NoHomeDirectory,
    #[error("I/O error on filter file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse filters in {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("failed to serialize filters: {0}")]
    Serialize(String),
}

/// Persists an ordered filter list to a JSON file.
#[derive(Debug, Clone)]
pub struct FilterStore {
    path: PathBuf,
}

impl FilterStore {
    /// Opens the store at the default location.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::at(Self::default_path()?))
    }

    /// Opens the store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `~/.config/logtidy/filters.json`.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let home = std::env::var_os("HOME").ok_or(StoreError::NoHomeDirectory)?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("logtidy")
            .join("filters.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved filters in order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Parse` if the file is not a JSON filter array or
    /// any record is invalid (unknown type, pattern that no longer compiles).
    pub fn load(&self) -> Result<Vec<Filter>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no filter file, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let filters: Vec<Filter> =
            serde_json::from_str(&content).map_err(|e| StoreError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        debug!(path = %self.path.display(), count = filters.len(), "loaded filters");
        Ok(filters)
    }

    /// Writes `filters`, replacing the file. Creates the parent directory.
    pub fn save(&self, filters: &[Filter]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(filters)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(path = %self.path.display(), count = filters.len(), "saved filters");
        Ok(())
    }

    /// Appends a filter to the end of the saved chain.
    pub fn add(&self, filter: Filter) -> Result<Vec<Filter>, StoreError> {
        let mut filters = self.load()?;
        filters.push(filter);
        self.save(&filters)?;
        Ok(filters)
    }

    /// Removes every saved filter called `name` and returns how many went.
    pub fn remove(&self, name: &str) -> Result<usize, StoreError> {
        let mut filters = self.load()?;
        let before = filters.len();
        filters.retain(|filter| filter.name() != name);
        let removed = before - filters.len();

        if removed > 0 {
            self.save(&filters)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;
    use tempfile::TempDir;

    fn sample_filters() -> Vec<Filter> {
        vec![
            Filter::new("test1", "^ERROR", FilterKind::Remove).unwrap(),
            Filter::new("test2", "INFO", FilterKind::Keep).unwrap(),
        ]
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FilterStore::at(temp_dir.path().join("filters.json"));

        store.save(&sample_filters()).expect("Save failed");
        let loaded = store.load().expect("Load failed");

        assert_eq!(loaded, sample_filters());
        assert!(loaded[0].matches("ERROR: x"));
        assert!(loaded[1].matches("INFO: y"));
    }

    #[test]
    fn test_load_nonexistent_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FilterStore::at(temp_dir.path().join("nonexistent.json"));

        let filters = store.load().expect("Load should not fail on a missing file");
        assert!(filters.is_empty());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("dir").join("filters.json");
        let store = FilterStore::at(&path);

        store.save(&sample_filters()).expect("Save failed");
        assert!(path.exists());
    }

    #[test]
    fn test_saved_format() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FilterStore::at(temp_dir.path().join("filters.json"));
        store.save(&sample_filters()).expect("Save failed");

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["type"], "remove");
        assert_eq!(value[1]["type"], "keep");
        assert_eq!(value[1]["pattern"], "INFO");
    }

    #[test]
    fn test_load_rejects_bad_pattern() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FilterStore::at(temp_dir.path().join("filters.json"));
        fs::write(
            store.path(),
            r#"[{ "name": "broken", "pattern": "([", "type": "remove" }]"#,
        )
        .unwrap();

        let result = store.load();
        assert!(matches!(result, Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_load_rejects_unknown_type() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FilterStore::at(temp_dir.path().join("filters.json"));
        fs::write(
            store.path(),
            r#"[{ "name": "odd", "pattern": "x", "type": "maybe" }]"#,
        )
        .unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("invalid filter type"));
    }

    #[test]
    fn test_add_and_remove() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FilterStore::at(temp_dir.path().join("filters.json"));

        store
            .add(Filter::new("a", "A", FilterKind::Remove).unwrap())
            .unwrap();
        store
            .add(Filter::new("b", "B", FilterKind::Keep).unwrap())
            .unwrap();
        let all = store
            .add(Filter::new("a", "AA", FilterKind::Remove).unwrap())
            .unwrap();
        assert_eq!(all.len(), 3);

        assert_eq!(store.remove("a").unwrap(), 2);
        assert_eq!(store.remove("missing").unwrap(), 0);

        let remaining = store.load().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name(), "b");
    }
}

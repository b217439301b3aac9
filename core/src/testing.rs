//! In-memory [`DictionaryBackend`] for tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ofti_types::EntryPath;

use crate::dictionary::{DictionaryBackend, DictionaryError};

/// Entries are shared by every file unless a file's top-level keywords are
/// set explicitly with [`FakeDictionary::with_keywords`].
#[derive(Default)]
pub struct FakeDictionary {
    entries: Mutex<Vec<(String, String)>>,
    keywords: HashMap<String, Vec<String>>,
    path_keywords: HashMap<PathBuf, Vec<String>>,
    failing_files: HashSet<String>,
    subkeys: HashMap<String, Vec<String>>,
    enums: HashMap<String, Vec<String>>,
    info: HashMap<String, Vec<String>>,
    reject_writes: bool,
    writes: Mutex<Vec<(PathBuf, String, String)>>,
    reads: AtomicUsize,
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl FakeDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Top-level keywords for files named `name`.
    #[must_use]
    pub fn with_keywords(mut self, name: &str, keys: &[&str]) -> Self {
        self.keywords
            .insert(name.to_string(), keys.iter().map(ToString::to_string).collect());
        self
    }

    /// Top-level keywords for the file at exactly `path`; wins over
    /// [`FakeDictionary::with_keywords`].
    #[must_use]
    pub fn with_file_keywords(mut self, path: &Path, keys: &[&str]) -> Self {
        self.path_keywords
            .insert(path.to_path_buf(), keys.iter().map(ToString::to_string).collect());
        self
    }

    /// Makes top-level listing fail for files named `name`.
    #[must_use]
    pub fn with_failing_file(mut self, name: &str) -> Self {
        self.failing_files.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_subkeys(mut self, key: &str, keys: &[&str]) -> Self {
        self.subkeys
            .insert(key.to_string(), keys.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn with_enum(mut self, key: &str, values: &[&str]) -> Self {
        self.enums
            .insert(key.to_string(), values.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn with_info(mut self, key: &str, lines: &[&str]) -> Self {
        self.info
            .insert(key.to_string(), lines.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    pub fn writes(&self) -> Vec<(PathBuf, String, String)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn derived_children(&self, parent: Option<&str>) -> Vec<String> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let mut children: Vec<String> = Vec::new();
        for (key, _) in entries.iter() {
            let rest = match parent {
                None => Some(key.as_str()),
                Some(parent) => key
                    .strip_prefix(parent)
                    .and_then(|r| r.strip_prefix('.')),
            };
            if let Some(child) = rest.and_then(|r| r.split('.').next())
                && !child.is_empty()
                && !children.iter().any(|c| c == child)
            {
                children.push(child.to_string());
            }
        }
        children
    }
}

impl DictionaryBackend for FakeDictionary {
    fn list_keywords(
        &self,
        file: &Path,
        key: Option<&EntryPath>,
    ) -> Result<Vec<String>, DictionaryError> {
        match key {
            None => {
                let name = file_name(file);
                if self.failing_files.contains(&name) {
                    return Err(DictionaryError::Failed(format!("cannot open {name}")));
                }
                if let Some(keys) = self.path_keywords.get(file) {
                    return Ok(keys.clone());
                }
                Ok(self
                    .keywords
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| self.derived_children(None)))
            }
            Some(key) => Ok(self
                .subkeys
                .get(key.as_str())
                .cloned()
                .unwrap_or_else(|| self.derived_children(Some(key.as_str())))),
        }
    }

    fn read_entry(&self, _file: &Path, key: &EntryPath) -> Result<String, DictionaryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.value(key.as_str())
            .ok_or_else(|| DictionaryError::Failed(format!("Failed to read entry {key}.")))
    }

    fn write_entry(&self, file: &Path, key: &EntryPath, value: &str) -> Result<(), DictionaryError> {
        if self.reject_writes {
            return Err(DictionaryError::Failed("write rejected".to_string()));
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((file.to_path_buf(), key.to_string(), value.to_string()));
        }
        if let Ok(mut entries) = self.entries.lock() {
            match entries.iter_mut().find(|(k, _)| k == key.as_str()) {
                Some((_, v)) => *v = value.to_string(),
                None => entries.push((key.to_string(), value.to_string())),
            }
        }
        Ok(())
    }

    fn entry_info(&self, _file: &Path, key: &EntryPath) -> Vec<String> {
        self.info.get(key.as_str()).cloned().unwrap_or_default()
    }

    fn entry_enum_values(&self, _file: &Path, key: &EntryPath) -> Vec<String> {
        self.enums.get(key.as_str()).cloned().unwrap_or_default()
    }
}

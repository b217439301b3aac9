//! Per-entry metadata shown by the browser and used by the editor.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ofti_types::{EntryPath, ValueKind, choose_kind, looks_like_dict};

use crate::dictionary::DictionaryBackend;

pub const UNREADABLE_VALUE: &str = "<error reading value>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub value: String,
    pub kind: ValueKind,
    pub subkeys: Vec<String>,
    pub comments: Vec<String>,
    pub info: Vec<String>,
}

impl EntryMeta {
    /// True for entries the browser drills into instead of editing.
    #[must_use]
    pub fn is_dict(&self) -> bool {
        matches!(self.kind, ValueKind::Dict)
    }

    /// Loads everything known about `key`. A failed read is recorded as
    /// [`UNREADABLE_VALUE`] instead of aborting.
    pub fn load(backend: &dyn DictionaryBackend, file: &Path, key: &EntryPath) -> Self {
        let value = backend.read_entry(file, key).unwrap_or_else(|err| {
            tracing::debug!(file = %file.display(), key = %key, "Read failed: {err}");
            UNREADABLE_VALUE.to_string()
        });
        let subkeys = backend.list_keywords(file, Some(key)).unwrap_or_default();

        let mut kind = choose_kind(key.as_str(), &value);
        if !subkeys.is_empty() || looks_like_dict(&value) {
            kind = ValueKind::Dict;
        }
        let enum_values = backend.entry_enum_values(file, key);
        if !enum_values.is_empty() {
            kind = ValueKind::Enum(enum_values);
        }

        let mut info = vec![format!("Type: {}", kind.label())];
        if let ValueKind::Enum(values) = &kind {
            info.push(format!("Allowed values: {}", values.join(", ")));
        }
        info.extend(backend.entry_info(file, key));
        info.extend(boundary_condition_info(backend, file, key));

        Self {
            value,
            kind,
            subkeys,
            comments: entry_comments(file, key),
            info,
        }
    }

    /// Text matched by in-file search: key, value and comments.
    #[must_use]
    pub fn search_text(&self, key: &str) -> String {
        let mut text = format!("{key}\n{}", self.value);
        for comment in &self.comments {
            text.push('\n');
            text.push_str(comment);
        }
        text.to_lowercase()
    }
}

/// Metadata memoized per `(file, key)`.
#[derive(Debug, Default)]
pub struct EntryCache {
    enabled: bool,
    entries: HashMap<(PathBuf, EntryPath), EntryMeta>,
}

impl EntryCache {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: HashMap::new(),
        }
    }

    pub fn get_or_load(
        &mut self,
        backend: &dyn DictionaryBackend,
        file: &Path,
        key: &EntryPath,
    ) -> EntryMeta {
        if !self.enabled {
            return EntryMeta::load(backend, file, key);
        }
        self.entries
            .entry((file.to_path_buf(), key.clone()))
            .or_insert_with(|| EntryMeta::load(backend, file, key))
            .clone()
    }

    /// Drops `key`, its ancestors and its descendants in `file`.
    pub fn invalidate(&mut self, file: &Path, key: &EntryPath) {
        let prefix = format!("{key}.");
        self.entries.retain(|(f, k), _| {
            if f != file {
                return true;
            }
            let related = k == key
                || k.as_str().starts_with(&prefix)
                || key.as_str().starts_with(&format!("{k}."));
            !related
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Comment lines directly above the first line mentioning the key's leaf.
///
/// Matching is a case-insensitive substring search over raw file text, so it
/// can pick up an earlier mention of the same word.
#[must_use]
pub fn entry_comments(file: &Path, key: &EntryPath) -> Vec<String> {
    let Ok(text) = fs::read_to_string(file) else {
        return Vec::new();
    };
    comments_above(&text, key.leaf())
}

fn comments_above(text: &str, leaf: &str) -> Vec<String> {
    let needle = leaf.to_lowercase();
    let lines: Vec<&str> = text.lines().collect();
    let Some(index) = lines
        .iter()
        .position(|line| line.to_lowercase().contains(&needle))
    else {
        return Vec::new();
    };

    let mut comments: Vec<String> = lines[..index]
        .iter()
        .rev()
        .map(|line| line.trim_start())
        .take_while(|line| line.starts_with("//") || line.starts_with("/*") || line.starts_with('*'))
        .map(ToString::to_string)
        .collect();
    comments.reverse();
    comments
}

/// `type`/`value` summary for keys below `boundaryField.<patch>`.
#[must_use]
pub fn boundary_condition_info(
    backend: &dyn DictionaryBackend,
    file: &Path,
    key: &EntryPath,
) -> Vec<String> {
    let Some(patch) = key.boundary_patch() else {
        return Vec::new();
    };
    let patch_key = EntryPath::new("boundaryField").child(patch);
    let read = |leaf: &str| {
        backend
            .read_entry(file, &patch_key.child(leaf))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let mut info = Vec::with_capacity(2);
    match read("type") {
        Some(bc_type) => info.push(format!("BC {patch} type: {bc_type}")),
        None => info.push(format!("BC {patch}: missing required entry 'type'")),
    }
    match read("value") {
        Some(value) => info.push(format!("BC {patch} value: {value}")),
        None => info.push(format!("BC {patch}: value entry not found")),
    }
    info
}

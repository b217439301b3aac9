//! Core domain types for ofti.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod sanitize;
mod validation;

pub use sanitize::{TAB_WIDTH, display_lines, expand_tabs, strip_control};
pub use validation::{
    ValidationError, ValueKind, autoformat_value, choose_kind, is_scalar_value, looks_like_dict,
    normalize_scalar_token,
};

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Entry paths
// ============================================================================

/// Dotted key path into a dictionary, e.g. `boundaryField.inlet.value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPath(String);

impl EntryPath {
    /// Builds a path from dotted text. Leading and trailing dots are dropped.
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().trim_matches('.').to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self::new(segment)
        } else {
            Self(format!("{}.{}", self.0, segment.trim_matches('.')))
        }
    }

    /// Parent path, or `None` for a top-level key.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Last segment of the path.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Patch name for keys below `boundaryField.<patch>`.
    #[must_use]
    pub fn boundary_patch(&self) -> Option<&str> {
        let mut parts = self.segments();
        if parts.next()? != "boundaryField" {
            return None;
        }
        parts.next()
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Case layout
// ============================================================================

/// Top-level groups of dictionary files in a case directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseSection {
    System,
    Constant,
    /// Initial-condition directories (`0`, `0.orig`, ...).
    Initial,
}

impl CaseSection {
    pub const ALL: [CaseSection; 3] = [Self::System, Self::Constant, Self::Initial];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Constant => "constant",
            Self::Initial => "0*",
        }
    }
}

impl fmt::Display for CaseSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// UI options
// ============================================================================

/// Rendering preferences shared between config and the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub ascii_only: bool,
    pub high_contrast: bool,
    pub reduced_motion: bool,
}

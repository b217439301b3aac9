//! Screen, modal and task state for the app state machine.

use std::path::PathBuf;

use ofti_core::{EntryMeta, FileCheck, PickerEntry};
use ofti_tools::{CleanAction, Diagnostic, JobRecord, PromptStep, PromptedTool, ToolEntry, ToolRun};
use ofti_types::{CaseSection, EntryPath, ValueKind};
use tempfile::NamedTempFile;

use crate::ui::{DraftInput, MenuState, ViewerState};

// ============================================================================
// Screens
// ============================================================================

/// What a menu screen is listing. Rows beyond the kind's own items are the
/// trailing `Back` of submenus.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuKind {
    Main,
    Sections,
    Files {
        section: CaseSection,
        files: Vec<PathBuf>,
    },
    /// Limited-mode actions for one file.
    NoFoamFile(PathBuf),
    Tools(Vec<ToolEntry>),
    Scripts(Vec<PathBuf>),
    Diagnostics,
    Logs(Vec<PathBuf>),
    LogActions(PathBuf),
    CheckResults(Vec<FileCheck>),
    Jobs(Vec<JobRecord>),
    /// Running jobs offered for `SIGTERM`.
    StopJobs(Vec<JobRecord>),
    /// `log.<solver>*` files for the residual timeline.
    ResidualLogs(Vec<PathBuf>),
    SearchResults(Vec<SearchHit>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuScreen {
    pub kind: MenuKind,
    pub menu: MenuState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerState {
    pub dir: PathBuf,
    pub entries: Vec<PickerEntry>,
    pub menu: MenuState,
}

/// One level of the entry browser: the keys below `prefix` (top level when
/// `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserLevel {
    pub prefix: Option<EntryPath>,
    pub keys: Vec<String>,
    pub selected: usize,
}

impl BrowserLevel {
    #[must_use]
    pub fn full_key(&self, index: usize) -> Option<EntryPath> {
        let key = self.keys.get(index)?;
        Some(match &self.prefix {
            Some(prefix) => prefix.child(key),
            None => EntryPath::new(key),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserState {
    pub file: PathBuf,
    pub rel: String,
    pub levels: Vec<BrowserLevel>,
    pub preview: Option<EntryMeta>,
    pub last_search: Option<String>,
}

impl BrowserState {
    #[must_use]
    pub fn level(&self) -> Option<&BrowserLevel> {
        self.levels.last()
    }

    pub fn level_mut(&mut self) -> Option<&mut BrowserLevel> {
        self.levels.last_mut()
    }

    #[must_use]
    pub fn selected_key(&self) -> Option<EntryPath> {
        let level = self.level()?;
        level.full_key(level.selected)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub file: PathBuf,
    pub rel: String,
    pub key: EntryPath,
    pub original: String,
    pub kind: ValueKind,
    pub subkeys: Vec<String>,
    pub input: DraftInput,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Picker(PickerState),
    Menu(MenuScreen),
    Browser(BrowserState),
    Editor(EditorState),
    Viewer(ViewerState),
}

/// A top-level key of a case file, as listed by global search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub file: PathBuf,
    pub rel: String,
    pub key: String,
}

impl SearchHit {
    /// `rel<TAB>key`, the line handed to fzf.
    #[must_use]
    pub fn line(&self) -> String {
        format!("{}\t{}", self.rel, self.key)
    }
}

// ============================================================================
// Modals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPurpose {
    CommandLine,
    BrowserSearch,
    ViewerSearch,
    GlobalFilter,
    FoamHelp,
    /// Path of the case to compare dictionaries against.
    CompareCase,
    ToolArgs {
        tool: PromptedTool,
        steps: Vec<PromptStep>,
        answers: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptState {
    pub label: String,
    pub input: DraftInput,
    pub purpose: PromptPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPurpose {
    SaveInvalid { value: String },
    Clean(CleanAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmState {
    pub lines: Vec<String>,
    pub purpose: ConfirmPurpose,
}

/// Overlays drawn above the current screen. Any key dismisses a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Prompt(PromptState),
    Confirm(ConfirmState),
    Message { title: String, lines: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

// ============================================================================
// Deferred work
// ============================================================================

/// Blocking work queued by a key press and run on the next tick, after the
/// `Running ...` status has been drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTask {
    RunTool {
        run: ToolRun,
        diagnostic: Option<Diagnostic>,
    },
    Verify,
    BuildSearchIndex,
    StartBackground {
        solver: String,
    },
    StartParallel {
        solver: String,
        launcher: String,
        subdomains: u32,
    },
    CaseDoctor,
    CompareDicts {
        other: PathBuf,
    },
    FoamHelp {
        args: Vec<String>,
    },
}

impl PendingTask {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::RunTool { run, .. } => run.name.clone(),
            Self::Verify => "syntax check".to_string(),
            Self::BuildSearchIndex => "search index".to_string(),
            Self::StartBackground { solver } => format!("{solver} (background)"),
            Self::StartParallel {
                solver, subdomains, ..
            } => format!("{solver} on {subdomains} ranks"),
            Self::CaseDoctor => "case doctor".to_string(),
            Self::CompareDicts { .. } => "dictionary compare".to_string(),
            Self::FoamHelp { .. } => "foamHelp".to_string(),
        }
    }
}

/// A program that needs the terminal. The binary suspends the UI, runs it
/// and reports back through [`crate::App::complete_external`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalRequest {
    /// Interactive editor; the terminal is handed over.
    Edit { argv: Vec<String> },
    /// fzf reading `input` on stdin; the chosen line comes back.
    Fzf { argv: Vec<String>, input: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalOutcome {
    Exited { success: bool },
    Selected(Option<String>),
    Failed(String),
}

/// What to do with an [`ExternalOutcome`].
#[derive(Debug)]
pub(crate) enum ExternalPurpose {
    EditEntry {
        file: PathBuf,
        key: EntryPath,
        original: String,
        temp: NamedTempFile,
    },
    EditFile,
    GlobalSearch,
}

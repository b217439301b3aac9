//! The `App` state machine.
//!
//! [`App`] owns a stack of screens plus an optional modal. The TUI reads
//! state through the accessors here and forwards key presses back through
//! [`App::handle_key`]. Blocking work is queued as a [`PendingTask`] and run
//! by [`App::tick`]; programs that need the terminal are surfaced as an
//! [`ExternalRequest`].
//!
//! Every subprocess goes through the injected [`CommandRunner`] and every
//! dictionary access through the injected [`DictionaryBackend`], so the whole
//! machine runs against fakes in tests.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ofti_config::{KeyAction, Keymap, OftiConfig};
use ofti_core::{
    CaseMetadata, DictionaryBackend, DictionaryError, EntryCache, FoamDictionary,
    ensure_environment,
};
use ofti_tools::{mpi_launcher, program_available};
use ofti_utils::{CommandRunner, SystemRunner, pid_is_alive, terminate_pid};

use crate::state::{
    ExternalPurpose, ExternalRequest, MenuKind, MenuScreen, Modal, PendingTask, PromptPurpose,
    PromptState, Screen, SearchHit, StatusKind, StatusMessage,
};
use crate::ui::{DraftInput, Key, MenuState};

mod actions;
mod browser;
mod commands;
mod external;
mod init;
mod navigation;


pub use commands::NO_FOAM_REASON;
pub use navigation::MainAction;

pub const NOT_A_CASE_MESSAGE: &str = "Not an OpenFOAM case (missing system/controlDict).";
pub const NO_CASE_MESSAGE: &str = "No case loaded. Pick a case folder first.";

/// Environment variable lookup.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Everything the app reaches outside itself.
pub struct AppDeps {
    pub runner: Arc<dyn CommandRunner>,
    pub backend: Arc<dyn DictionaryBackend>,
    pub env: EnvLookup,
    /// Checked before leaving no-foam mode.
    pub check_foam: fn() -> Result<(), DictionaryError>,
    pub pid_alive: fn(u32) -> bool,
    /// Sends `SIGTERM` when a job is stopped.
    pub terminate: fn(u32) -> io::Result<()>,
    /// `mpirun` or `mpiexec`, whichever resolves first.
    pub mpi_launcher: Option<String>,
    pub fzf_available: bool,
}

impl AppDeps {
    /// Real processes, `foamDictionary`, and the process environment.
    #[must_use]
    pub fn system() -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        Self {
            backend: Arc::new(FoamDictionary::new(Arc::clone(&runner))),
            runner,
            env: Arc::new(|name| env::var(name).ok()),
            check_foam: ensure_environment,
            pid_alive: pid_is_alive,
            terminate: terminate_pid,
            mpi_launcher: mpi_launcher(program_available).map(ToString::to_string),
            fzf_available: program_available("fzf"),
        }
    }
}

pub struct App {
    config: OftiConfig,
    keymap: Keymap,
    deps: AppDeps,
    /// Why the app is in no-foam mode, if it is.
    limited: Option<String>,
    metadata: Option<CaseMetadata>,
    screens: Vec<Screen>,
    modal: Option<Modal>,
    status: Option<StatusMessage>,
    cache: EntryCache,
    pending: Option<PendingTask>,
    external: Option<ExternalRequest>,
    external_purpose: Option<ExternalPurpose>,
    search_index: Vec<SearchHit>,
    viewport_rows: usize,
    should_quit: bool,
    ticks: usize,
}

impl App {
    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn config(&self) -> &OftiConfig {
        &self.config
    }

    #[must_use]
    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    #[must_use]
    pub fn case_dir(&self) -> Option<&Path> {
        self.metadata.as_ref().map(|m| m.path.as_path())
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&CaseMetadata> {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.limited.is_some()
    }

    #[must_use]
    pub fn limited_reason(&self) -> Option<&str> {
        self.limited.as_deref()
    }

    /// The active screen.
    #[must_use]
    pub fn screen(&self) -> Option<&Screen> {
        self.screens.last()
    }

    #[must_use]
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    #[must_use]
    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Frames ticked so far; drives the busy spinner.
    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.ticks
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    /// Rows available to the viewer body; set by the renderer every frame.
    pub fn set_viewport_rows(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
    }

    #[must_use]
    pub fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn handle_key(&mut self, key: Key) {
        if self.pending.is_some() || self.external.is_some() {
            return;
        }
        if self.modal.is_some() {
            self.modal_key(key);
            return;
        }

        let in_editor = matches!(self.screen(), Some(Screen::Editor(_)));
        let action = key.action(&self.keymap);
        if !in_editor {
            if key == Key::CtrlC {
                self.request_quit();
                return;
            }
            if action == Some(KeyAction::Command) {
                self.open_prompt(":", PromptPurpose::CommandLine);
                return;
            }
        }
        self.status = None;

        match self.screens.last() {
            Some(Screen::Picker(_)) => self.picker_key(key, action),
            Some(Screen::Menu(_)) => self.menu_key(action),
            Some(Screen::Browser(_)) => self.browser_key(key, action),
            Some(Screen::Editor(_)) => self.editor_key(key),
            Some(Screen::Viewer(_)) => self.viewer_key(key, action),
            None => self.request_quit(),
        }
    }

    /// Bracketed paste goes into whichever text field is focused.
    pub fn handle_paste(&mut self, text: &str) {
        if let Some(Modal::Prompt(prompt)) = &mut self.modal {
            prompt.input.enter_text(text);
        } else if let Some(Screen::Editor(editor)) = self.screens.last_mut() {
            editor.input.enter_text(text);
        }
    }

    fn modal_key(&mut self, key: Key) {
        let Some(modal) = self.modal.take() else {
            return;
        };
        match modal {
            Modal::Message { .. } => {}
            Modal::Confirm(confirm) => {
                if matches!(key, Key::Char('y' | 'Y')) {
                    self.confirmed(confirm.purpose);
                }
            }
            Modal::Prompt(mut prompt) => match key {
                Key::Enter => self.submit_prompt(prompt),
                Key::Esc | Key::CtrlC => {}
                other => {
                    edit_input(&mut prompt.input, other);
                    self.modal = Some(Modal::Prompt(prompt));
                }
            },
        }
    }

    // ========================================================================
    // Ticks
    // ========================================================================

    /// Runs the queued task, if any. Called once per frame after drawing.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if let Some(task) = self.pending.take() {
            tracing::debug!(task = %task.label(), "Running pending task");
            self.run_pending(task);
        }
    }

    pub(crate) fn queue(&mut self, task: PendingTask) {
        self.set_info(format!("Running {}...", task.label()));
        self.pending = Some(task);
    }

    // ========================================================================
    // Helpers shared by the submodules
    // ========================================================================

    pub(crate) fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    pub(crate) fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(message = %text, "Status error");
        self.status = Some(StatusMessage {
            kind: StatusKind::Error,
            text,
        });
    }

    pub(crate) fn env_var(&self, name: &str) -> Option<String> {
        (self.deps.env)(name)
    }

    /// The case directory, or an error status when none is loaded.
    pub(crate) fn require_case(&mut self) -> Option<PathBuf> {
        let dir = self.case_dir().map(Path::to_path_buf);
        if dir.is_none() {
            self.set_error(NO_CASE_MESSAGE);
        }
        dir
    }

    pub(crate) fn push_menu(&mut self, kind: MenuKind, menu: MenuState) {
        self.screens.push(Screen::Menu(MenuScreen { kind, menu }));
    }

    /// Pops the active screen. The root screen stays.
    pub(crate) fn pop_screen(&mut self) {
        if self.screens.len() > 1 {
            self.screens.pop();
        }
    }

    pub(crate) fn open_prompt(&mut self, label: impl Into<String>, purpose: PromptPurpose) {
        self.open_prompt_with(label, String::new(), purpose);
    }

    pub(crate) fn open_prompt_with(
        &mut self,
        label: impl Into<String>,
        initial: String,
        purpose: PromptPurpose,
    ) {
        let mut input = DraftInput::default();
        input.set_text(initial);
        self.modal = Some(Modal::Prompt(PromptState {
            label: label.into(),
            input,
            purpose,
        }));
    }

    pub(crate) fn show_message(&mut self, title: impl Into<String>, lines: Vec<String>) {
        self.modal = Some(Modal::Message {
            title: title.into(),
            lines,
        });
    }
}

/// Line-editing keys shared by the editor and prompts. Returns false for
/// keys that are not editing keys.
pub(crate) fn edit_input(input: &mut DraftInput, key: Key) -> bool {
    match key {
        Key::Char(c) => input.enter_char(c),
        Key::Backspace => input.delete_char(),
        Key::Delete => input.delete_char_forward(),
        Key::Left => input.move_cursor_left(),
        Key::Right => input.move_cursor_right(),
        Key::Home => input.move_cursor_home(),
        Key::End => input.move_cursor_end(),
        Key::CtrlU => input.clear(),
        Key::CtrlW => input.delete_word_backwards(),
        _ => return false,
    }
    true
}

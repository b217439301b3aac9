//! Construction, case loading and the case-folder picker.

use std::path::Path;

use ofti_config::OftiConfig;
use ofti_core::{CaseMetadata, DictionaryBackend, EntryCache, PickerEntry, is_case_dir, list_directory};

use super::{App, AppDeps, MainAction};
use crate::state::{MenuKind, MenuScreen, PickerState, Screen};
use crate::ui::MenuState;

const DEFAULT_VIEWPORT_ROWS: usize = 20;

impl App {
    /// Opens `start` as a case, or the case picker when it is not one.
    /// `limited` carries the reason for starting in no-foam mode.
    pub fn new(config: OftiConfig, start: &Path, limited: Option<String>, deps: AppDeps) -> Self {
        if let Some(reason) = &limited {
            tracing::warn!(%reason, "Starting in no-foam mode");
        }
        let mut app = Self {
            keymap: config.keymap(),
            cache: EntryCache::new(config.enable_entry_cache),
            config,
            deps,
            limited,
            metadata: None,
            screens: Vec::new(),
            modal: None,
            status: None,
            pending: None,
            external: None,
            external_purpose: None,
            search_index: Vec::new(),
            viewport_rows: DEFAULT_VIEWPORT_ROWS,
            should_quit: false,
            ticks: 0,
        };
        if is_case_dir(start) {
            app.load_case(start);
        } else {
            app.open_picker(start);
        }
        app
    }

    pub(crate) fn load_case(&mut self, dir: &Path) {
        self.cache.clear();
        self.search_index.clear();
        self.metadata = Some(self.gather_metadata(dir));
        self.screens = vec![Screen::Menu(main_menu())];
        tracing::info!(case = %dir.display(), limited = self.limited.is_some(), "Loaded case");
    }

    /// Re-reads banner facts after anything that may change them.
    pub(crate) fn refresh_metadata(&mut self) {
        if let Some(dir) = self.case_dir().map(Path::to_path_buf) {
            self.metadata = Some(self.gather_metadata(&dir));
        }
    }

    fn gather_metadata(&self, dir: &Path) -> CaseMetadata {
        let backend: Option<&dyn DictionaryBackend> = if self.limited.is_some() {
            None
        } else {
            Some(self.deps.backend.as_ref())
        };
        CaseMetadata::gather(dir, backend, self.deps.runner.as_ref(), |name| {
            self.env_var(name)
        })
    }

    /// Shows `dir` in the picker, replacing the current picker screen.
    pub(crate) fn open_picker(&mut self, dir: &Path) {
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let entries = match list_directory(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                self.set_error(format!("Failed to read {}: {err}", dir.display()));
                let mut entries = vec![PickerEntry::UseThisFolder];
                if dir.parent().is_some() {
                    entries.push(PickerEntry::Parent);
                }
                entries
            }
        };
        let labels = entries.iter().map(PickerEntry::label).collect();
        let menu = MenuState::new(format!("Select case folder: {}", dir.display()), labels);
        let picker = Screen::Picker(PickerState { dir, entries, menu });
        match self.screens.last_mut() {
            Some(screen @ Screen::Picker(_)) => *screen = picker,
            _ => self.screens.push(picker),
        }
    }

    /// Loads `dir` if it is a case.
    pub(crate) fn use_folder(&mut self, dir: &Path) {
        if is_case_dir(dir) {
            self.load_case(dir);
        } else {
            self.set_error(super::NOT_A_CASE_MESSAGE);
        }
    }
}

fn main_menu() -> MenuScreen {
    MenuScreen {
        kind: MenuKind::Main,
        menu: MenuState::new(
            "Main menu",
            MainAction::ALL.iter().map(|a| a.label().to_string()).collect(),
        ),
    }
}

//! Entry browser and single-value editor.

use std::path::Path;

use ofti_config::KeyAction;
use ofti_core::{UNREADABLE_VALUE, record_edit, relative_display};
use ofti_types::{EntryPath, autoformat_value};
use ofti_utils::split_args;

use super::{App, edit_input};
use crate::state::{
    BrowserLevel, BrowserState, ConfirmPurpose, ConfirmState, EditorState, Modal, PendingTask,
    PromptPurpose, Screen,
};
use crate::ui::{DraftInput, Key};

pub const BROWSER_HELP: &str = "j/k or arrows: move, l/e/Right/Enter: edit, h/Left/q: back, \
v: view file, o: $EDITOR, /: search, n: next match, ?: help";

pub const SAVED_MESSAGE: &str = "Saved successfully.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save value.";

#[derive(Debug, Clone, Copy)]
enum Move {
    Up,
    Down,
    Top,
    Bottom,
}

impl App {
    // ========================================================================
    // Browser
    // ========================================================================

    /// Opens `file` at the top level, selecting `focus` when given.
    pub(crate) fn open_browser(&mut self, file: &Path, focus: Option<&str>) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let rel = relative_display(&case_dir, file);
        let keys = match self.deps.backend.list_keywords(file, None) {
            Ok(keys) => keys,
            Err(err) => {
                self.set_error(format!("{rel}: {err}"));
                return;
            }
        };
        if keys.is_empty() {
            self.set_error(format!("No entries found in {rel}."));
            return;
        }
        let selected = focus
            .and_then(|key| keys.iter().position(|k| k == key))
            .unwrap_or(0);
        self.screens.push(Screen::Browser(BrowserState {
            file: file.to_path_buf(),
            rel,
            levels: vec![BrowserLevel {
                prefix: None,
                keys,
                selected,
            }],
            preview: None,
            last_search: None,
        }));
        self.refresh_preview();
    }

    /// Reloads the preview pane for the selected key.
    pub(crate) fn refresh_preview(&mut self) {
        let Some(Screen::Browser(browser)) = self.screens.last_mut() else {
            return;
        };
        browser.preview = browser
            .selected_key()
            .map(|key| self.cache.get_or_load(self.deps.backend.as_ref(), &browser.file, &key));
    }

    pub(super) fn browser_key(&mut self, key: Key, action: Option<KeyAction>) {
        let action = if key == Key::Char('e') {
            Some(KeyAction::Select)
        } else {
            action
        };
        match action {
            Some(KeyAction::Up) => self.browser_move(Move::Up),
            Some(KeyAction::Down) => self.browser_move(Move::Down),
            Some(KeyAction::Top) => self.browser_move(Move::Top),
            Some(KeyAction::Bottom) => self.browser_move(Move::Bottom),
            Some(KeyAction::Select) => self.browser_select(),
            Some(KeyAction::Back | KeyAction::Quit) => self.browser_back(),
            Some(KeyAction::View) => {
                if let Some(Screen::Browser(browser)) = self.screens.last() {
                    let file = browser.file.clone();
                    self.view_file(&file);
                }
            }
            Some(KeyAction::EditExternal) => self.edit_entry_external(),
            Some(KeyAction::Search) => {
                self.open_prompt("Search (keys/values/comments):", PromptPurpose::BrowserSearch);
            }
            Some(KeyAction::NextMatch) => {
                let last = match self.screens.last() {
                    Some(Screen::Browser(browser)) => browser.last_search.clone(),
                    _ => None,
                };
                match last {
                    Some(query) => self.browser_search(&query),
                    None => self.set_error("No previous search."),
                }
            }
            Some(KeyAction::Help) => self.show_message("Browser help", vec![BROWSER_HELP.to_string()]),
            _ => {}
        }
    }

    fn browser_move(&mut self, movement: Move) {
        let Some(Screen::Browser(browser)) = self.screens.last_mut() else {
            return;
        };
        let Some(level) = browser.level_mut() else {
            return;
        };
        let last = level.keys.len().saturating_sub(1);
        level.selected = match movement {
            Move::Up => level.selected.saturating_sub(1),
            Move::Down => (level.selected + 1).min(last),
            Move::Top => 0,
            Move::Bottom => last,
        };
        self.refresh_preview();
    }

    /// Drills into a sub-dictionary or opens the editor.
    fn browser_select(&mut self) {
        let Some(Screen::Browser(browser)) = self.screens.last() else {
            return;
        };
        let Some(key) = browser.selected_key() else {
            return;
        };
        let file = browser.file.clone();
        let rel = browser.rel.clone();
        let meta = match &browser.preview {
            Some(meta) => meta.clone(),
            None => self.cache.get_or_load(self.deps.backend.as_ref(), &file, &key),
        };

        if meta.is_dict() {
            let subkeys = if meta.subkeys.is_empty() {
                self.deps
                    .backend
                    .list_keywords(&file, Some(&key))
                    .unwrap_or_default()
            } else {
                meta.subkeys
            };
            if subkeys.is_empty() {
                self.set_error(format!("No sub-keys under {key}."));
                return;
            }
            if let Some(Screen::Browser(browser)) = self.screens.last_mut() {
                browser.levels.push(BrowserLevel {
                    prefix: Some(key),
                    keys: subkeys,
                    selected: 0,
                });
            }
            self.refresh_preview();
            return;
        }

        if meta.value == UNREADABLE_VALUE {
            self.set_error(format!("Failed to read entry {key}."));
            return;
        }
        self.screens.push(Screen::Editor(EditorState {
            file,
            rel,
            key,
            input: DraftInput::with_text(&meta.value),
            original: meta.value,
            kind: meta.kind,
            subkeys: meta.subkeys,
        }));
    }

    fn browser_back(&mut self) {
        let Some(Screen::Browser(browser)) = self.screens.last_mut() else {
            return;
        };
        if browser.levels.len() > 1 {
            browser.levels.pop();
            self.refresh_preview();
        } else {
            self.pop_screen();
        }
    }

    /// Next key at the current level whose key, value or comments contain
    /// `query` (case-insensitive), wrapping around.
    pub(crate) fn browser_search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let Some(Screen::Browser(browser)) = self.screens.last_mut() else {
            return;
        };
        browser.last_search = Some(query.to_string());
        let Some(level) = browser.levels.last() else {
            return;
        };
        let needle = query.to_lowercase();
        let total = level.keys.len();
        let found = (1..=total)
            .map(|step| (level.selected + step) % total)
            .find(|&index| {
                let leaf = &level.keys[index];
                if leaf.to_lowercase().contains(&needle) {
                    return true;
                }
                level.full_key(index).is_some_and(|key| {
                    self.cache
                        .get_or_load(self.deps.backend.as_ref(), &browser.file, &key)
                        .search_text(leaf)
                        .contains(&needle)
                })
            });

        match found {
            Some(index) => {
                if let Some(level) = browser.level_mut() {
                    level.selected = index;
                }
                self.refresh_preview();
            }
            None => self.set_error(format!("No matches for '{query}'.")),
        }
    }

    // ========================================================================
    // Editor
    // ========================================================================

    pub(super) fn editor_key(&mut self, key: Key) {
        match key {
            Key::Esc | Key::CtrlC => self.pop_screen(),
            Key::Enter => self.submit_editor(),
            Key::F(1) => self.open_foam_help_prompt(),
            other => {
                if let Some(Screen::Editor(editor)) = self.screens.last_mut() {
                    edit_input(&mut editor.input, other);
                }
            }
        }
    }

    fn submit_editor(&mut self) {
        let Some(Screen::Editor(editor)) = self.screens.last() else {
            return;
        };
        let value = editor.input.text().to_string();
        if value == editor.original {
            self.pop_screen();
            return;
        }
        if self.config.validate_on_save
            && let Err(err) = editor.kind.validate(&value)
        {
            self.modal = Some(Modal::Confirm(ConfirmState {
                lines: vec![
                    format!("Value seems wrong: {}", err.message()),
                    String::new(),
                    "Proposed value:".to_string(),
                    format!("  {value}"),
                    String::new(),
                    "Continue anyway? (y/N)".to_string(),
                ],
                purpose: ConfirmPurpose::SaveInvalid { value },
            }));
            return;
        }
        self.save_editor_value(&value);
    }

    /// Writes `value` for the open editor. The editor stays open on failure.
    pub(crate) fn save_editor_value(&mut self, value: &str) {
        let Some(Screen::Editor(editor)) = self.screens.last() else {
            return;
        };
        let file = editor.file.clone();
        let key = editor.key.clone();
        let original = editor.original.clone();
        if self.write_value(&file, &key, &original, &autoformat_value(value)) {
            self.pop_screen();
            self.refresh_preview();
            self.set_info(SAVED_MESSAGE);
        } else {
            self.set_error(SAVE_FAILED_MESSAGE);
        }
    }

    /// Writes through the backend, invalidates the cache and appends to the
    /// edit log.
    pub(crate) fn write_value(&mut self, file: &Path, key: &EntryPath, old: &str, new: &str) -> bool {
        if let Err(err) = self.deps.backend.write_entry(file, key, new) {
            tracing::warn!(file = %file.display(), key = %key, "Save failed: {err}");
            return false;
        }
        self.cache.invalidate(file, key);
        if let Some(case_dir) = self.case_dir()
            && let Err(err) = record_edit(case_dir, file, key, old, new)
        {
            tracing::warn!(case = %case_dir.display(), "Failed to append to edit log: {err}");
        }
        tracing::info!(file = %file.display(), key = %key, "Saved entry");
        true
    }

    fn open_foam_help_prompt(&mut self) {
        let Some(Screen::Editor(editor)) = self.screens.last() else {
            return;
        };
        let initial = editor.key.segments().collect::<Vec<_>>().join(" ");
        self.open_prompt_with("foamHelp args:", initial, PromptPurpose::FoamHelp);
    }

    pub(crate) fn submit_foam_help(&mut self, text: &str) {
        match split_args(text) {
            Ok(args) => self.queue(PendingTask::FoamHelp { args }),
            Err(err) => self.set_error(format!("Invalid arguments: {err}")),
        }
    }
}

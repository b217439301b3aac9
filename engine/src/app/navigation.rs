//! Menus, the case picker and the viewer.

use std::fs;
use std::path::{Path, PathBuf};

use ofti_config::KeyAction;
use ofti_core::{
    PickerEntry, RESIDUAL_PLOT_WIDTH, discover_case_files, find_suspicious_lines, is_case_dir,
    relative_display, residual_timeline_report,
};
use ofti_tools::{Diagnostic, LIMITED_MODE_MESSAGE, LogView, command_help_summary, job_report};
use ofti_types::CaseSection;

use super::App;
use crate::state::{MenuKind, PromptPurpose, Screen};
use crate::ui::{Key, MenuState, VIEWER_HELP, ViewerState};

pub const MENU_HELP: [&str; 5] = [
    "j/k or arrows: move",
    "l/Right/Enter: select",
    "h/Left/Esc: back",
    "q: quit",
    ":: command line",
];

/// Main menu rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    Editor,
    CheckSyntax,
    Tools,
    Diagnostics,
    Jobs,
    GlobalSearch,
    Quit,
}

impl MainAction {
    pub const ALL: [Self; 7] = [
        Self::Editor,
        Self::CheckSyntax,
        Self::Tools,
        Self::Diagnostics,
        Self::Jobs,
        Self::GlobalSearch,
        Self::Quit,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Editor => "Editor",
            Self::CheckSyntax => "Check syntax",
            Self::Tools => "Tools",
            Self::Diagnostics => "Diagnostics",
            Self::Jobs => "Jobs",
            Self::GlobalSearch => "Global search",
            Self::Quit => "Quit",
        }
    }

    /// Rows that need OpenFOAM.
    #[must_use]
    pub const fn needs_foam(self) -> bool {
        matches!(
            self,
            Self::CheckSyntax | Self::Tools | Self::Diagnostics | Self::GlobalSearch
        )
    }
}

impl App {
    // ========================================================================
    // Picker
    // ========================================================================

    pub(super) fn picker_key(&mut self, key: Key, action: Option<KeyAction>) {
        let Some(Screen::Picker(picker)) = self.screens.last_mut() else {
            return;
        };
        if key == Key::Char('e') {
            let dir = picker.dir.clone();
            self.use_folder(&dir);
            return;
        }
        match action {
            Some(KeyAction::Up) => picker.menu.move_up(),
            Some(KeyAction::Down) => picker.menu.move_down(),
            Some(KeyAction::Top) => picker.menu.select_first(),
            Some(KeyAction::Bottom) => picker.menu.select_last(),
            Some(KeyAction::Select) => {
                let dir = picker.dir.clone();
                match picker.entries.get(picker.menu.selected()).cloned() {
                    Some(PickerEntry::UseThisFolder) => self.use_folder(&dir),
                    Some(PickerEntry::Parent) => self.picker_parent(&dir),
                    Some(PickerEntry::Dir(path)) if is_case_dir(&path) => self.load_case(&path),
                    Some(PickerEntry::Dir(path)) => self.open_picker(&path),
                    None => {}
                }
            }
            Some(KeyAction::Back) => {
                let dir = picker.dir.clone();
                self.picker_parent(&dir);
            }
            Some(KeyAction::Quit) => self.request_quit(),
            _ => {}
        }
    }

    fn picker_parent(&mut self, dir: &Path) {
        if let Some(parent) = dir.parent() {
            self.open_picker(parent);
        }
    }

    // ========================================================================
    // Menus
    // ========================================================================

    pub(super) fn menu_key(&mut self, action: Option<KeyAction>) {
        let Some(Screen::Menu(screen)) = self.screens.last_mut() else {
            return;
        };
        match action {
            Some(KeyAction::Up) => screen.menu.move_up(),
            Some(KeyAction::Down) => screen.menu.move_down(),
            Some(KeyAction::Top) => screen.menu.select_first(),
            Some(KeyAction::Bottom) => screen.menu.select_last(),
            Some(KeyAction::Select) => {
                if screen.kind != MenuKind::Main && screen.menu.is_back_selected() {
                    self.pop_screen();
                    return;
                }
                let index = screen.menu.selected();
                let kind = screen.kind.clone();
                self.select_menu_item(kind, index);
            }
            Some(KeyAction::Back) => self.pop_screen(),
            Some(KeyAction::Quit) => self.request_quit(),
            Some(KeyAction::Help) => {
                let mut lines: Vec<String> = MENU_HELP.iter().map(ToString::to_string).collect();
                lines.push(String::new());
                lines.push(command_help_summary());
                self.show_message("Help", lines);
            }
            _ => {}
        }
    }

    fn select_menu_item(&mut self, kind: MenuKind, index: usize) {
        match kind {
            MenuKind::Main => {
                if let Some(action) = MainAction::ALL.get(index) {
                    self.main_action(*action);
                }
            }
            MenuKind::Sections => {
                if let Some(section) = CaseSection::ALL.get(index) {
                    self.open_files_menu(*section);
                }
            }
            MenuKind::Files { files, .. } => {
                if let Some(file) = files.get(index) {
                    if self.is_limited() {
                        self.open_no_foam_file_menu(file);
                    } else {
                        self.open_browser(file, None);
                    }
                }
            }
            MenuKind::NoFoamFile(path) => match index {
                0 => self.view_file(&path),
                1 => self.edit_file_external(&path),
                _ => {}
            },
            MenuKind::Tools(entries) => {
                if let Some(entry) = entries.into_iter().nth(index) {
                    self.activate_tool(entry);
                }
            }
            MenuKind::Scripts(scripts) => {
                if let Some(script) = scripts.get(index) {
                    self.run_script(script);
                }
            }
            MenuKind::Diagnostics => {
                if let Some(diagnostic) = Diagnostic::ALL.get(index) {
                    self.run_diagnostic(*diagnostic);
                }
            }
            MenuKind::Logs(logs) => {
                if let Some(log) = logs.get(index) {
                    let labels = LogView::ALL.iter().map(|v| v.label().to_string()).collect();
                    let title = self.rel(log);
                    self.push_menu(MenuKind::LogActions(log.clone()), MenuState::with_back(title, labels));
                }
            }
            MenuKind::LogActions(log) => {
                if let Some(view) = LogView::ALL.get(index) {
                    self.view_log(&log, *view);
                }
            }
            MenuKind::CheckResults(checks) => {
                if let Some(check) = checks.get(index)
                    && let Some(case_dir) = self.case_dir()
                {
                    let viewer = ViewerState::new(check.label(case_dir), &check.report(case_dir));
                    self.screens.push(Screen::Viewer(viewer));
                }
            }
            MenuKind::Jobs(jobs) => {
                if let Some(job) = jobs.get(index) {
                    let log = fs::read_to_string(&job.log).ok();
                    let report = job_report(job, log.as_deref(), self.config.courant_limit);
                    self.screens
                        .push(Screen::Viewer(ViewerState::new(job.name.clone(), &report)));
                }
            }
            MenuKind::StopJobs(jobs) => {
                if let Some(job) = jobs.get(index) {
                    self.stop_selected_job(job);
                }
            }
            MenuKind::ResidualLogs(logs) => {
                if let Some(log) = logs.get(index) {
                    self.view_residuals(log);
                }
            }
            MenuKind::SearchResults(hits) => {
                if let Some(hit) = hits.get(index) {
                    self.open_browser(&hit.file, Some(&hit.key));
                }
            }
        }
    }

    pub(crate) fn main_action(&mut self, action: MainAction) {
        if action.needs_foam() && self.is_limited() {
            self.set_error(LIMITED_MODE_MESSAGE);
            return;
        }
        match action {
            MainAction::Editor => {
                let labels = CaseSection::ALL.iter().map(|s| s.label().to_string()).collect();
                self.push_menu(MenuKind::Sections, MenuState::with_back("Editor", labels));
            }
            MainAction::CheckSyntax => self.start_verify(),
            MainAction::Tools => self.open_tools_menu(),
            MainAction::Diagnostics => self.open_diagnostics_menu(),
            MainAction::Jobs => self.open_jobs(),
            MainAction::GlobalSearch => self.start_global_search(),
            MainAction::Quit => self.request_quit(),
        }
    }

    fn open_files_menu(&mut self, section: CaseSection) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let files: Vec<PathBuf> = discover_case_files(&case_dir).section(section).to_vec();
        if files.is_empty() {
            self.set_info(format!("No files in {}.", section.label()));
            return;
        }
        let labels = files.iter().map(|f| relative_display(&case_dir, f)).collect();
        self.push_menu(
            MenuKind::Files { section, files },
            MenuState::with_back(section.label(), labels),
        );
    }

    fn open_no_foam_file_menu(&mut self, file: &Path) {
        let labels = vec!["View file".to_string(), "Open in $EDITOR".to_string()];
        let title = self.rel(file);
        self.push_menu(MenuKind::NoFoamFile(file.to_path_buf()), MenuState::with_back(title, labels));
    }

    /// Path relative to the case, for titles and messages.
    pub(crate) fn rel(&self, path: &Path) -> String {
        match self.case_dir() {
            Some(case_dir) => relative_display(case_dir, path),
            None => path.display().to_string(),
        }
    }

    // ========================================================================
    // Viewer
    // ========================================================================

    /// Opens `path` in the viewer with suspicious-line warnings on top.
    pub(crate) fn view_file(&mut self, path: &Path) {
        let rel = self.rel(path);
        match fs::read_to_string(path) {
            Ok(text) => {
                let warnings = find_suspicious_lines(&text);
                self.screens
                    .push(Screen::Viewer(ViewerState::for_file(rel, &text, &warnings)));
            }
            Err(err) => self.set_error(format!("Failed to read {rel}: {err}")),
        }
    }

    fn view_log(&mut self, log: &Path, view: LogView) {
        let rel = self.rel(log);
        match fs::read_to_string(log) {
            Ok(text) => {
                let viewer = ViewerState::new(rel, &view.render(&text));
                self.screens.push(Screen::Viewer(viewer));
            }
            Err(err) => self.set_error(format!("Failed to read {rel}: {err}")),
        }
    }

    fn view_residuals(&mut self, log: &Path) {
        let rel = self.rel(log);
        let text = match fs::read_to_string(log) {
            Ok(text) => text,
            Err(err) => {
                self.set_error(format!("Failed to read {rel}: {err}"));
                return;
            }
        };
        match residual_timeline_report(&text, RESIDUAL_PLOT_WIDTH) {
            Some(report) => {
                let viewer = ViewerState::new(format!("Residuals: {rel}"), &report);
                self.screens.push(Screen::Viewer(viewer));
            }
            None => self.set_info(format!("No residuals found in {rel}.")),
        }
    }

    pub(super) fn viewer_key(&mut self, key: Key, action: Option<KeyAction>) {
        let rows = self.viewport_rows;
        let Some(Screen::Viewer(viewer)) = self.screens.last_mut() else {
            return;
        };
        match key {
            Key::PageDown => {
                viewer.scroll_down(rows, rows);
                return;
            }
            Key::PageUp => {
                viewer.scroll_up(rows);
                return;
            }
            Key::Right => return,
            _ => {}
        }
        match action {
            Some(KeyAction::Up) => viewer.scroll_up(1),
            Some(KeyAction::Down) => viewer.scroll_down(1, rows),
            Some(KeyAction::Top) => viewer.scroll_to_top(),
            Some(KeyAction::Bottom) => viewer.scroll_to_bottom(rows),
            Some(KeyAction::Search) => self.open_prompt("Search:", PromptPurpose::ViewerSearch),
            Some(KeyAction::NextMatch) => match viewer.repeat_search() {
                Some(true) => {}
                Some(false) => {
                    let query = viewer.last_search().unwrap_or_default().to_string();
                    self.set_error(format!("No matches for '{query}'."));
                }
                None => self.set_error("No previous search."),
            },
            Some(KeyAction::Help) => {
                let lines = VIEWER_HELP.iter().map(ToString::to_string).collect();
                self.show_message("Viewer help", lines);
            }
            Some(KeyAction::Back | KeyAction::Quit | KeyAction::Select) => self.pop_screen(),
            _ => {}
        }
    }

    pub(crate) fn viewer_search(&mut self, query: &str) {
        if query.is_empty() {
            return;
        }
        if let Some(Screen::Viewer(viewer)) = self.screens.last_mut()
            && !viewer.search(query)
        {
            self.set_error(format!("No matches for '{query}'."));
        }
    }
}

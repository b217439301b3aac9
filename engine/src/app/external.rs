//! Programs that take over the terminal: `$EDITOR` and fzf.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use ofti_types::autoformat_value;
use ofti_utils::split_args;
use tempfile::{Builder, NamedTempFile};

use super::App;
use super::browser::SAVED_MESSAGE;
use crate::state::{ExternalOutcome, ExternalPurpose, ExternalRequest, Screen};

const FALLBACK_EDITOR: &str = "vi";

impl App {
    /// The program the caller should run next. Keys stay ignored until
    /// [`App::complete_external`] is called.
    #[must_use]
    pub fn pending_external(&self) -> Option<&ExternalRequest> {
        self.external.as_ref()
    }

    /// Applies the result of the last external request.
    pub fn complete_external(&mut self, outcome: ExternalOutcome) {
        self.external = None;
        tracing::debug!(?outcome, "External program finished");
        let Some(purpose) = self.external_purpose.take() else {
            return;
        };
        if let ExternalOutcome::Failed(message) = &outcome {
            self.set_error(message.clone());
            return;
        }
        match purpose {
            ExternalPurpose::EditEntry {
                file,
                key,
                original,
                temp,
            } => {
                if outcome == (ExternalOutcome::Exited { success: false }) {
                    self.set_error("Editor exited with an error; value unchanged.");
                    return;
                }
                let edited = match fs::read_to_string(temp.path()) {
                    Ok(text) => autoformat_value(&text),
                    Err(err) => {
                        self.set_error(format!("Failed to read edited value: {err}"));
                        return;
                    }
                };
                if edited == autoformat_value(&original) {
                    return;
                }
                if self.write_value(&file, &key, &original, &edited) {
                    self.refresh_preview();
                    self.set_info(SAVED_MESSAGE);
                } else {
                    self.set_error("Failed to save value from editor.");
                }
            }
            ExternalPurpose::EditFile => {
                self.refresh_metadata();
                if outcome == (ExternalOutcome::Exited { success: false }) {
                    self.set_error("Editor exited with an error.");
                }
            }
            ExternalPurpose::GlobalSearch => {
                if let ExternalOutcome::Selected(Some(line)) = outcome {
                    self.open_search_hit(&line);
                }
            }
        }
    }

    /// `$EDITOR` command line for `path`: config, then `VISUAL`, then
    /// `EDITOR`, then `vi`.
    pub(crate) fn editor_argv(&self, path: &Path) -> Result<Vec<String>, String> {
        let command = self
            .config
            .editor
            .clone()
            .or_else(|| self.env_var("VISUAL"))
            .or_else(|| self.env_var("EDITOR"))
            .filter(|cmd| !cmd.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_EDITOR.to_string());
        let mut argv = split_args(&command).map_err(|err| format!("Invalid editor command: {err}"))?;
        if argv.is_empty() {
            argv.push(FALLBACK_EDITOR.to_string());
        }
        argv.push(path.to_string_lossy().into_owned());
        Ok(argv)
    }

    /// Edits the selected browser entry in `$EDITOR` through a temp file.
    pub(crate) fn edit_entry_external(&mut self) {
        let Some(Screen::Browser(browser)) = self.screens.last() else {
            return;
        };
        let Some(key) = browser.selected_key() else {
            return;
        };
        let file = browser.file.clone();
        let original = match self.deps.backend.read_entry(&file, &key) {
            Ok(value) => value,
            Err(err) => {
                self.set_error(format!("Failed to read entry for editor: {err}"));
                return;
            }
        };
        let temp = match entry_temp_file(&original) {
            Ok(temp) => temp,
            Err(err) => {
                self.set_error(format!("Failed to create temp file for editor: {err:#}"));
                return;
            }
        };
        match self.editor_argv(temp.path()) {
            Ok(argv) => {
                self.external = Some(ExternalRequest::Edit { argv });
                self.external_purpose = Some(ExternalPurpose::EditEntry {
                    file,
                    key,
                    original,
                    temp,
                });
            }
            Err(message) => self.set_error(message),
        }
    }

    /// Opens a whole file in `$EDITOR`.
    pub(crate) fn edit_file_external(&mut self, path: &Path) {
        match self.editor_argv(path) {
            Ok(argv) => {
                self.external = Some(ExternalRequest::Edit { argv });
                self.external_purpose = Some(ExternalPurpose::EditFile);
            }
            Err(message) => self.set_error(message),
        }
    }
}

fn entry_temp_file(value: &str) -> anyhow::Result<NamedTempFile> {
    let mut temp = Builder::new()
        .prefix("ofti-entry-")
        .suffix(".txt")
        .tempfile()
        .context("creating temp file")?;
    writeln!(temp, "{value}").context("writing current value")?;
    temp.flush().context("flushing temp file")?;
    Ok(temp)
}

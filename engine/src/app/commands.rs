//! `:` command line.

use ofti_tools::{
    Command, LIMITED_MODE_MESSAGE, command_help_summary, find_tool, tool_catalog,
};

use super::App;

pub const NO_FOAM_REASON: &str = "No-foam mode enabled.";

impl App {
    pub(crate) fn run_command(&mut self, text: &str) {
        let catalog = self.case_dir().map(tool_catalog).unwrap_or_default();
        let command = Command::parse(text, |name| find_tool(&catalog, name).is_some());
        tracing::debug!(?command, "Command line");

        if command.blocked_in_limited_mode() && self.is_limited() {
            self.set_error(LIMITED_MODE_MESSAGE);
            return;
        }
        match command {
            Command::Quit => self.request_quit(),
            Command::Check => self.start_verify(),
            Command::Tools => self.open_tools_menu(),
            Command::Diagnostics => self.open_diagnostics_menu(),
            Command::Search => self.start_global_search(),
            Command::Jobs => self.open_jobs(),
            Command::RunSolver => self.run_solver(false),
            Command::RunTool(name) => {
                if self.require_case().is_none() {
                    return;
                }
                match find_tool(&catalog, &name) {
                    Some(entry) => self.activate_tool(entry.clone()),
                    None => self.set_error(format!("Unknown tool: {name}")),
                }
            }
            Command::NoFoam(flag) => {
                let on = flag.unwrap_or(!self.is_limited());
                self.set_no_foam(on);
            }
            Command::Help => self.set_info(command_help_summary()),
            Command::Usage(usage) => self.set_error(usage),
            Command::Unknown(text) => self.set_error(format!("Unknown command: {text}")),
            Command::Empty => {}
        }
    }

    /// Enters or leaves no-foam mode. Leaving it requires a working
    /// OpenFOAM environment.
    pub(crate) fn set_no_foam(&mut self, on: bool) {
        if on {
            self.limited = Some(NO_FOAM_REASON.to_string());
            self.set_info("Mode set to no-foam.");
            tracing::info!("No-foam mode on");
            return;
        }
        match (self.deps.check_foam)() {
            Ok(()) => {
                self.limited = None;
                self.refresh_metadata();
                self.set_info("Mode set to foam.");
                tracing::info!("No-foam mode off");
            }
            Err(err) => self.set_error(format!("Cannot enable foam mode: {err}")),
        }
    }
}

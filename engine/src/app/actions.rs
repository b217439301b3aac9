//! Tools, diagnostics, jobs, verification and global search.

use std::path::{Path, PathBuf};

use ofti_core::{
    DictionaryBackend, UNKNOWN, case_doctor, compare_case_dicts, detect_solver,
    discover_case_files, format_compare_report, latest_time, log_files, number_of_subdomains,
    relative_display, shell_scripts, verify_case,
};
use ofti_tools::{
    Diagnostic, JobRecord, JobRegistry, JobStatus, NO_LOGS_MESSAGE, PromptStep, PromptedTool,
    ToolAction, ToolEntry, ToolEnv, ToolError, execute, format_report, start_background_solver,
    start_parallel_solver, stop_job, tool_catalog,
};
use ofti_utils::Invocation;

use super::App;
use crate::state::{
    ConfirmPurpose, ConfirmState, ExternalPurpose, ExternalRequest, MenuKind, Modal, PendingTask,
    PromptPurpose, PromptState, Screen, SearchHit,
};
use crate::ui::{MenuState, ViewerState};

pub const FZF_PROMPT: &str = "ofti> ";

impl App {
    fn tool_env(&self, case_dir: &Path) -> ToolEnv {
        ToolEnv::new(case_dir, &self.config, |name| self.env_var(name))
    }

    // ========================================================================
    // Tools
    // ========================================================================

    pub(crate) fn open_tools_menu(&mut self) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let entries = tool_catalog(&case_dir);
        let labels = entries.iter().map(|e| e.label.clone()).collect();
        self.push_menu(MenuKind::Tools(entries), MenuState::with_back("Tools", labels));
    }

    pub(crate) fn activate_tool(&mut self, entry: ToolEntry) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        match entry.action {
            ToolAction::Command(argv) => {
                let run = self.tool_env(&case_dir).plan_command(&entry.label, &argv);
                self.queue(PendingTask::RunTool {
                    run,
                    diagnostic: None,
                });
            }
            ToolAction::Prompted(tool) => {
                let steps = tool.prompts(&latest_time(&case_dir));
                self.ask_tool_step(tool, steps, Vec::new());
            }
            ToolAction::RunScript => {
                let scripts = shell_scripts(&case_dir);
                if scripts.is_empty() {
                    self.set_error("No .sh scripts found in case directory.");
                    return;
                }
                let labels = scripts.iter().map(|s| relative_display(&case_dir, s)).collect();
                self.push_menu(MenuKind::Scripts(scripts), MenuState::with_back("Run .sh script", labels));
            }
            ToolAction::RunSolver => self.run_solver(false),
            ToolAction::RunSolverBackground => self.run_solver(true),
            ToolAction::RunSolverParallel => self.run_solver_parallel(),
            ToolAction::StopJob => self.open_stop_jobs(),
            ToolAction::ResidualTimeline => self.open_residual_logs(),
            ToolAction::CaseDoctor => self.queue(PendingTask::CaseDoctor),
            ToolAction::CompareDicts => self.open_prompt(
                "Compare to case path (absolute or relative):",
                PromptPurpose::CompareCase,
            ),
            ToolAction::Clean(action) => {
                self.modal = Some(Modal::Confirm(ConfirmState {
                    lines: vec![
                        action.confirm_message(),
                        String::new(),
                        "Continue? (y/N)".to_string(),
                    ],
                    purpose: ConfirmPurpose::Clean(action),
                }));
            }
        }
    }

    pub(crate) fn run_solver(&mut self, background: bool) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let solver = detect_solver(&case_dir, Some(self.deps.backend.as_ref()));
        if solver == UNKNOWN {
            self.set_error(ToolError::UnknownSolver.to_string());
            return;
        }
        if background {
            self.queue(PendingTask::StartBackground { solver });
        } else {
            let run = self.tool_env(&case_dir).plan_command(&solver, &[solver.clone()]);
            self.queue(PendingTask::RunTool {
                run,
                diagnostic: None,
            });
        }
    }

    fn run_solver_parallel(&mut self) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let backend = self.deps.backend.as_ref();
        let solver = detect_solver(&case_dir, Some(backend));
        if solver == UNKNOWN {
            self.set_error(ToolError::UnknownSolver.to_string());
            return;
        }
        if !case_dir.join("system").join("decomposeParDict").is_file() {
            self.set_error(ToolError::MissingDecomposeParDict.to_string());
            return;
        }
        let Some(subdomains) = number_of_subdomains(backend, &case_dir) else {
            self.set_error(ToolError::InvalidSubdomains.to_string());
            return;
        };
        let Some(launcher) = self.deps.mpi_launcher.clone() else {
            self.set_error(ToolError::NoMpiLauncher.to_string());
            return;
        };
        self.queue(PendingTask::StartParallel {
            solver,
            launcher,
            subdomains,
        });
    }

    /// `log.<solver>*` files to pick from for the residual timeline.
    fn open_residual_logs(&mut self) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let solver = detect_solver(&case_dir, Some(self.deps.backend.as_ref()));
        if solver == UNKNOWN {
            self.set_error("Solver not detected; cannot pick solver logs.");
            return;
        }
        let prefix = format!("log.{solver}");
        let logs: Vec<PathBuf> = log_files(&case_dir)
            .into_iter()
            .filter(|log| {
                log.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
            })
            .collect();
        if logs.is_empty() {
            self.set_error(format!("No {prefix}* files found in case directory."));
            return;
        }
        let labels = logs.iter().map(|l| relative_display(&case_dir, l)).collect();
        self.push_menu(
            MenuKind::ResidualLogs(logs),
            MenuState::with_back("Select solver log for residuals", labels),
        );
    }

    pub(crate) fn run_script(&mut self, script: &Path) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let run = self.tool_env(&case_dir).plan_script(script);
        self.queue(PendingTask::RunTool {
            run,
            diagnostic: None,
        });
    }

    fn ask_tool_step(&mut self, tool: PromptedTool, steps: Vec<PromptStep>, answers: Vec<String>) {
        let Some(step) = steps.get(answers.len()) else {
            return;
        };
        let label = step.label.clone();
        self.open_prompt(
            label,
            PromptPurpose::ToolArgs {
                tool,
                steps,
                answers,
            },
        );
    }

    fn submit_tool_answer(
        &mut self,
        tool: PromptedTool,
        steps: Vec<PromptStep>,
        mut answers: Vec<String>,
        text: &str,
    ) {
        let default = steps.get(answers.len()).and_then(|step| step.default.clone());
        let answer = match (default, text.trim()) {
            (Some(default), "") => default,
            (_, text) => text.to_string(),
        };
        answers.push(answer);
        if answers.len() < steps.len() {
            self.ask_tool_step(tool, steps, answers);
            return;
        }
        let Some(case_dir) = self.require_case() else {
            return;
        };
        match tool.build(&case_dir, &answers) {
            Ok(argv) => {
                let run = self.tool_env(&case_dir).plan_plain(tool.program(), &argv);
                self.queue(PendingTask::RunTool {
                    run,
                    diagnostic: None,
                });
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }

    // ========================================================================
    // Diagnostics and jobs
    // ========================================================================

    pub(crate) fn open_diagnostics_menu(&mut self) {
        if self.require_case().is_none() {
            return;
        }
        let labels = Diagnostic::ALL.iter().map(|d| d.label().to_string()).collect();
        self.push_menu(MenuKind::Diagnostics, MenuState::with_back("Diagnostics", labels));
    }

    pub(crate) fn run_diagnostic(&mut self, diagnostic: Diagnostic) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let Some(program) = diagnostic.program() else {
            let logs = log_files(&case_dir);
            if logs.is_empty() {
                self.set_info(NO_LOGS_MESSAGE);
                return;
            }
            let labels = logs.iter().map(|l| relative_display(&case_dir, l)).collect();
            self.push_menu(MenuKind::Logs(logs), MenuState::with_back("Logs", labels));
            return;
        };
        let run = self
            .tool_env(&case_dir)
            .plan_plain(diagnostic.label(), &[program.to_string()]);
        self.queue(PendingTask::RunTool {
            run,
            diagnostic: Some(diagnostic),
        });
    }

    pub(crate) fn open_jobs(&mut self) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let Some(jobs) = self.refreshed_jobs(&case_dir) else {
            return;
        };
        if jobs.is_empty() {
            self.set_info("No background jobs recorded.");
            return;
        }
        let labels = jobs.iter().map(|job| job.label()).collect();
        self.push_menu(MenuKind::Jobs(jobs), MenuState::with_back("Jobs", labels));
    }

    fn refreshed_jobs(&mut self, case_dir: &Path) -> Option<Vec<JobRecord>> {
        match JobRegistry::for_case(case_dir).refresh(self.deps.pid_alive) {
            Ok(jobs) => Some(jobs),
            Err(err) => {
                self.set_error(format!("Failed to read job registry: {err}"));
                None
            }
        }
    }

    fn open_stop_jobs(&mut self) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let Some(jobs) = self.refreshed_jobs(&case_dir) else {
            return;
        };
        let running: Vec<JobRecord> = jobs
            .into_iter()
            .filter(|job| job.status == JobStatus::Running)
            .collect();
        if running.is_empty() {
            self.set_info("No running jobs to stop.");
            return;
        }
        let labels = running
            .iter()
            .map(|job| format!("{} pid={}", job.name, job.pid))
            .collect();
        self.push_menu(MenuKind::StopJobs(running), MenuState::with_back("Stop job", labels));
    }

    pub(crate) fn stop_selected_job(&mut self, job: &JobRecord) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let registry = JobRegistry::for_case(&case_dir);
        self.pop_screen();
        match stop_job(&registry, job, self.deps.terminate) {
            Ok(()) => self.set_info(format!("Sent SIGTERM to pid {}.", job.pid)),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    pub(crate) fn start_verify(&mut self) {
        if self.require_case().is_some() {
            self.queue(PendingTask::Verify);
        }
    }

    pub(crate) fn start_global_search(&mut self) {
        if self.require_case().is_some() {
            self.queue(PendingTask::BuildSearchIndex);
        }
    }

    // ========================================================================
    // Pending work
    // ========================================================================

    pub(super) fn run_pending(&mut self, task: PendingTask) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        match task {
            PendingTask::RunTool { run, diagnostic } => {
                match execute(self.deps.runner.as_ref(), &run) {
                    Ok(output) => {
                        let report = format_report(&case_dir, &run.invocation.display(), &output);
                        let report = match diagnostic {
                            Some(diagnostic) => diagnostic.decorate(&output.stdout, report),
                            None => report,
                        };
                        self.screens
                            .push(Screen::Viewer(ViewerState::new(run.name.clone(), &report)));
                        if output.success() {
                            self.set_info(format!("{} finished.", run.name));
                        } else {
                            self.set_error(format!("{} failed.", run.name));
                        }
                        self.refresh_metadata();
                    }
                    Err(err) => self.set_error(err.to_string()),
                }
            }
            PendingTask::Verify => {
                let checks = verify_case(self.deps.backend.as_ref(), &case_dir, |file| {
                    tracing::debug!(file = %file.display(), "Checking");
                });
                let failed = checks.iter().filter(|c| !c.is_ok()).count();
                let total = checks.len();
                let labels = checks.iter().map(|c| c.label(&case_dir)).collect();
                self.push_menu(MenuKind::CheckResults(checks), MenuState::with_back("Check syntax", labels));
                if failed == 0 {
                    self.set_info(format!("All {total} files OK."));
                } else {
                    self.set_error(format!("{failed} of {total} files have problems."));
                }
            }
            PendingTask::BuildSearchIndex => {
                self.search_index = build_search_index(self.deps.backend.as_ref(), &case_dir);
                if self.search_index.is_empty() {
                    self.set_info("No keys found in case files.");
                    return;
                }
                self.status = None;
                if self.config.fzf.enabled(self.deps.fzf_available) {
                    self.request_fzf();
                } else {
                    self.open_prompt("Filter (file or key):", PromptPurpose::GlobalFilter);
                }
            }
            PendingTask::StartBackground { solver } => {
                let registry = JobRegistry::for_case(&case_dir);
                match start_background_solver(self.deps.runner.as_ref(), &registry, &case_dir, &solver) {
                    Ok(job) => self.set_info(format!(
                        "Started {} in background (pid {}); log: {}",
                        job.name,
                        job.pid,
                        relative_display(&case_dir, &job.log)
                    )),
                    Err(err) => self.set_error(err.to_string()),
                }
            }
            PendingTask::StartParallel {
                solver,
                launcher,
                subdomains,
            } => {
                let registry = JobRegistry::for_case(&case_dir);
                match start_parallel_solver(
                    self.deps.runner.as_ref(),
                    &registry,
                    &case_dir,
                    &solver,
                    &launcher,
                    subdomains,
                ) {
                    Ok(job) => self.set_info(format!(
                        "Started {} on {subdomains} ranks (pid {}); log: {}",
                        job.name,
                        job.pid,
                        relative_display(&case_dir, &job.log)
                    )),
                    Err(err) => self.set_error(err.to_string()),
                }
            }
            PendingTask::CaseDoctor => {
                let report = case_doctor(self.deps.backend.as_ref(), &case_dir);
                self.screens
                    .push(Screen::Viewer(ViewerState::new("Case doctor", &report.render())));
                if report.errors.is_empty() {
                    self.set_info(format!("Case doctor: {} warnings.", report.warnings.len()));
                } else {
                    self.set_error(format!(
                        "Case doctor: {} errors, {} warnings.",
                        report.errors.len(),
                        report.warnings.len()
                    ));
                }
            }
            PendingTask::CompareDicts { other } => {
                let diffs = compare_case_dicts(self.deps.backend.as_ref(), &case_dir, &other);
                let report = format_compare_report(&case_dir, &other, &diffs);
                self.screens
                    .push(Screen::Viewer(ViewerState::new("Compare dictionaries", &report)));
                if diffs.is_empty() {
                    self.set_info("No dictionary key differences detected.");
                } else {
                    self.set_info(format!("{} dictionaries differ.", diffs.len()));
                }
            }
            PendingTask::FoamHelp { args } => {
                let invocation = Invocation::new("foamHelp").args(args).current_dir(&case_dir);
                match self.deps.runner.run(&invocation) {
                    Ok(output) => {
                        let text = [output.stdout.trim(), output.stderr.trim()]
                            .into_iter()
                            .find(|t| !t.is_empty())
                            .unwrap_or("(no output)")
                            .to_string();
                        self.status = None;
                        self.screens
                            .push(Screen::Viewer(ViewerState::new("foamHelp", &text)));
                    }
                    Err(err) => self.set_error(format!("Failed to run foamHelp: {err}")),
                }
            }
        }
    }

    // ========================================================================
    // Global search
    // ========================================================================

    fn request_fzf(&mut self) {
        let input = self
            .search_index
            .iter()
            .map(SearchHit::line)
            .collect::<Vec<_>>()
            .join("\n");
        self.external = Some(ExternalRequest::Fzf {
            argv: vec!["fzf".to_string(), format!("--prompt={FZF_PROMPT}")],
            input,
        });
        self.external_purpose = Some(ExternalPurpose::GlobalSearch);
    }

    pub(crate) fn open_search_hit(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(hit) = self.search_index.iter().find(|h| h.line() == line).cloned() else {
            self.set_error(format!("Unknown selection: {line}"));
            return;
        };
        self.open_browser(&hit.file, Some(&hit.key));
    }

    fn filter_search_index(&mut self, query: &str) {
        let needle = query.trim().to_lowercase();
        let hits: Vec<SearchHit> = self
            .search_index
            .iter()
            .filter(|hit| hit.line().to_lowercase().contains(&needle))
            .cloned()
            .collect();
        if hits.is_empty() {
            self.set_error(format!("No matches for '{}'.", query.trim()));
            return;
        }
        let labels = hits.iter().map(|h| format!("{} : {}", h.rel, h.key)).collect();
        self.push_menu(MenuKind::SearchResults(hits), MenuState::with_back("Search results", labels));
    }

    // ========================================================================
    // Modal results
    // ========================================================================

    pub(super) fn submit_prompt(&mut self, prompt: PromptState) {
        let text = prompt.input.text().to_string();
        match prompt.purpose {
            PromptPurpose::CommandLine => self.run_command(&text),
            PromptPurpose::BrowserSearch => self.browser_search(&text),
            PromptPurpose::ViewerSearch => self.viewer_search(&text),
            PromptPurpose::GlobalFilter => self.filter_search_index(&text),
            PromptPurpose::FoamHelp => self.submit_foam_help(&text),
            PromptPurpose::CompareCase => self.submit_compare_path(&text),
            PromptPurpose::ToolArgs {
                tool,
                steps,
                answers,
            } => self.submit_tool_answer(tool, steps, answers, &text),
        }
    }

    /// Relative paths resolve against the current case directory.
    fn submit_compare_path(&mut self, text: &str) {
        let Some(case_dir) = self.require_case() else {
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            self.set_error("No comparison path provided.");
            return;
        }
        let other = case_dir.join(text);
        if !other.is_dir() {
            self.set_error(format!("Not a directory: {}", other.display()));
            return;
        }
        self.queue(PendingTask::CompareDicts { other });
    }

    pub(super) fn confirmed(&mut self, purpose: ConfirmPurpose) {
        match purpose {
            ConfirmPurpose::SaveInvalid { value } => self.save_editor_value(&value),
            ConfirmPurpose::Clean(action) => {
                let Some(case_dir) = self.require_case() else {
                    return;
                };
                match self.tool_env(&case_dir).plan_clean(action) {
                    Ok(run) => self.queue(PendingTask::RunTool {
                        run,
                        diagnostic: None,
                    }),
                    Err(err) => self.set_error(err.to_string()),
                }
            }
        }
    }
}

/// `rel<TAB>key` rows for every top-level key of every case file. Files
/// that cannot be listed are skipped.
pub(crate) fn build_search_index(backend: &dyn DictionaryBackend, case_dir: &Path) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for file in discover_case_files(case_dir).iter() {
        let rel = relative_display(case_dir, file);
        match backend.list_keywords(file, None) {
            Ok(keys) => hits.extend(keys.into_iter().map(|key| SearchHit {
                file: file.clone(),
                rel: rel.clone(),
                key,
            })),
            Err(err) => tracing::debug!(file = %rel, "Skipping in search index: {err}"),
        }
    }
    hits
}

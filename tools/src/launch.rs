//! Turning catalog entries into invocations and running them.
//!
//! Simple tools are wrapped in `runApplication` from OpenFOAM's
//! `RunFunctions` when `WM_PROJECT_DIR` is known, so the usual `log.<tool>`
//! file is written next to the captured output. Clean actions always go
//! through `CleanFunctions`.

use std::path::{Path, PathBuf};

use ofti_config::OftiConfig;
use ofti_core::latest_time;
use ofti_utils::{CommandOutput, CommandRunner, Invocation, quote_arg};

use crate::ToolError;
use crate::catalog::CleanAction;

pub const LATEST_TIME_PLACEHOLDER: &str = "{{latestTime}}";

/// Replaces `{{latestTime}}` in every argument.
#[must_use]
pub fn expand_latest_time(argv: &[String], latest: &str) -> Vec<String> {
    argv.iter()
        .map(|arg| arg.replace(LATEST_TIME_PLACEHOLDER, latest))
        .collect()
}

/// Environment a tool runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEnv {
    pub case_dir: PathBuf,
    pub wm_project_dir: Option<String>,
    pub use_runfunctions: bool,
    pub use_cleanfunctions: bool,
    pub bashrc: Option<PathBuf>,
}

/// A planned run: what the viewer shows and what is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRun {
    pub name: String,
    pub invocation: Invocation,
}

impl ToolEnv {
    #[must_use]
    pub fn new(
        case_dir: &Path,
        config: &OftiConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            case_dir: case_dir.to_path_buf(),
            wm_project_dir: env("WM_PROJECT_DIR").filter(|dir| !dir.trim().is_empty()),
            use_runfunctions: config.use_runfunctions,
            use_cleanfunctions: config.use_cleanfunctions,
            bashrc: config.openfoam_bashrc.clone(),
        }
    }

    /// `bash -lc` running `script`, sourcing the configured bashrc first.
    fn shell(&self, script: &str) -> Invocation {
        let script = match &self.bashrc {
            Some(bashrc) => format!(". {}; {script}", quote_arg(&bashrc.to_string_lossy())),
            None => script.to_string(),
        };
        Invocation::new("bash")
            .arg("-lc")
            .arg(script)
            .current_dir(&self.case_dir)
    }

    /// Plans a simple tool, expanding `{{latestTime}}` first.
    #[must_use]
    pub fn plan_command(&self, name: &str, argv: &[String]) -> ToolRun {
        self.plan(name, argv, true)
    }

    /// Like [`ToolEnv::plan_command`] but never through `runApplication`.
    #[must_use]
    pub fn plan_plain(&self, name: &str, argv: &[String]) -> ToolRun {
        self.plan(name, argv, false)
    }

    fn plan(&self, name: &str, argv: &[String], run_application: bool) -> ToolRun {
        let expanded = expand_latest_time(argv, &latest_time(&self.case_dir));
        let joined = expanded
            .iter()
            .map(|arg| quote_arg(arg))
            .collect::<Vec<_>>()
            .join(" ");

        let invocation = match (&self.wm_project_dir, self.use_runfunctions && run_application) {
            (Some(wm_dir), true) => self.shell(&format!(
                ". {}; runApplication {joined}",
                quote_arg(&format!("{wm_dir}/bin/tools/RunFunctions"))
            )),
            _ if self.bashrc.is_some() => self.shell(&joined),
            _ => {
                let (program, args) = expanded.split_first().map_or_else(
                    || (String::new(), Vec::new()),
                    |(program, args)| (program.clone(), args.to_vec()),
                );
                Invocation::new(program)
                    .args(args)
                    .current_dir(&self.case_dir)
            }
        };
        ToolRun {
            name: name.to_string(),
            invocation,
        }
    }

    /// Plans a `CleanFunctions` action. Requires `WM_PROJECT_DIR`.
    pub fn plan_clean(&self, action: CleanAction) -> Result<ToolRun, ToolError> {
        let wm_dir = self
            .wm_project_dir
            .as_deref()
            .ok_or(ToolError::WmProjectDirUnset)?;
        if !self.use_cleanfunctions {
            return Err(ToolError::CleanFunctionsDisabled);
        }
        let script = format!(
            ". {}; {}",
            quote_arg(&format!("{wm_dir}/bin/tools/CleanFunctions")),
            action.function()
        );
        Ok(ToolRun {
            name: action.label().to_string(),
            invocation: self.shell(&script),
        })
    }

    #[must_use]
    pub fn plan_script(&self, script: &Path) -> ToolRun {
        let name = script
            .file_name()
            .map_or_else(|| script.display().to_string(), |n| n.to_string_lossy().into_owned());
        ToolRun {
            invocation: Invocation::new("sh")
                .arg(script.to_string_lossy())
                .current_dir(&self.case_dir),
            name,
        }
    }
}

/// Viewer text for a finished run.
#[must_use]
pub fn format_report(case_dir: &Path, command: &str, output: &CommandOutput) -> String {
    let status = if output.success() {
        "OK".to_string()
    } else {
        match output.status {
            Some(code) => format!("ERROR (exit code {code})"),
            None => "ERROR (killed by signal)".to_string(),
        }
    };
    let or_empty = |text: &str| {
        if text.is_empty() {
            "(empty)".to_string()
        } else {
            text.to_string()
        }
    };
    [
        format!("$ cd {}", case_dir.display()),
        format!("$ {command}"),
        String::new(),
        format!("status: {status}"),
        String::new(),
        "stdout:".to_string(),
        or_empty(&output.stdout),
        String::new(),
        "stderr:".to_string(),
        or_empty(&output.stderr),
    ]
    .join("\n")
}

/// Runs `run` to completion, returning its captured output.
pub fn execute(runner: &dyn CommandRunner, run: &ToolRun) -> Result<CommandOutput, ToolError> {
    tracing::info!(tool = %run.name, command = %run.invocation, "Running tool");
    let output = runner.run(&run.invocation).map_err(|source| ToolError::Spawn {
        name: run.name.clone(),
        source,
    })?;
    if !output.success() {
        tracing::warn!(tool = %run.name, status = ?output.status, "Tool failed");
    }
    Ok(output)
}

/// Runs `run` to completion and renders the report.
pub fn run_tool(
    runner: &dyn CommandRunner,
    case_dir: &Path,
    run: &ToolRun,
) -> Result<String, ToolError> {
    let output = execute(runner, run)?;
    Ok(format_report(case_dir, &run.invocation.display(), &output))
}

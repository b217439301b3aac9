//! Tool catalog, subprocess planning and background jobs for ofti.
//!
//! Nothing here draws to the terminal: every function returns the text the
//! viewer should show or an invocation the engine hands to a
//! [`ofti_utils::CommandRunner`].

pub mod catalog;
pub mod command_line;
pub mod diagnostics;
pub mod jobs;
pub mod launch;

use std::io;
use std::path::PathBuf;

use ofti_utils::SplitError;
use thiserror::Error;

pub use catalog::{
    CleanAction, Preset, PromptStep, PromptedTool, ToolAction, ToolEntry, find_tool,
    load_presets, normalize_tool_name, tool_catalog,
};
pub use command_line::{Command, LIMITED_MODE_MESSAGE, command_help_summary};
pub use diagnostics::{Diagnostic, LogView, NO_LOGS_MESSAGE};
pub use jobs::{
    JobRecord, JobRegistry, JobStatus, MPI_LAUNCHERS, job_report, mpi_launcher, start_background,
    start_background_solver, start_parallel_solver, stop_job,
};
pub use launch::{ToolEnv, ToolRun, execute, expand_latest_time, format_report, run_tool};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("WM_PROJECT_DIR is not set. Please source your OpenFOAM environment first.")]
    WmProjectDirUnset,
    #[error("CleanFunctions are disabled (use_cleanfunctions = false).")]
    CleanFunctionsDisabled,
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] SplitError),
    #[error("No arguments provided for {0}.")]
    MissingArguments(&'static str),
    #[error("{} not found.", .0.display())]
    FileNotFound(PathBuf),
    #[error("Could not determine solver from system/controlDict.")]
    UnknownSolver,
    #[error("Failed to run {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to update job registry: {0}")]
    Registry(#[source] io::Error),
    #[error("Missing system/decomposeParDict. Create it before running in parallel.")]
    MissingDecomposeParDict,
    #[error("numberOfSubdomains missing or invalid in decomposeParDict.")]
    InvalidSubdomains,
    #[error("MPI launcher not found: install mpirun or mpiexec.")]
    NoMpiLauncher,
    #[error("decomposePar failed: {0}")]
    DecomposeFailed(String),
    #[error("Failed to stop pid {pid}: {source}")]
    Stop {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// True when `program` resolves on `PATH`.
#[must_use]
pub fn program_available(program: &str) -> bool {
    which::which(program).is_ok()
}

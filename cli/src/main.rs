//! ofti - binary entry point and frame loop.
//!
//! # Architecture
//!
//! The binary bridges [`ofti_engine`] (application state) and [`ofti_tui`]
//! (rendering), and owns everything that touches the real terminal.
//!
//! ```text
//! main() -> load config, check OpenFOAM -> App::new -> TerminalSession -> run_app()
//! ```
//!
//! # Frame loop
//!
//! Every frame:
//!
//! 1. Drain the input queue (non-blocking via [`ofti_tui::InputPump`])
//! 2. Render
//! 3. `app.tick()` runs any queued long operation, after its `Running ...`
//!    status has been drawn
//! 4. If the app asked for an external program (`$EDITOR`, fzf), stop the
//!    input pump, suspend the terminal, run it and hand back the outcome

mod external;
mod session;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{
    env,
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
    time::Duration,
};
use tokio::time::{self, MissedTickBehavior};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ofti_config::OftiConfig;
use ofti_core::{DictionaryError, ensure_environment};
use ofti_engine::{App, AppDeps, NO_FOAM_REASON};
use ofti_tui::{InputPump, draw, handle_events};

use session::TerminalSession;

const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Browse and edit OpenFOAM case dictionaries in the terminal.
#[derive(Debug, Parser)]
#[command(name = "ofti", version, about)]
struct Args {
    /// Case directory to open. Defaults to the current directory; a folder
    /// that is not a case opens the case picker.
    case_dir: Option<PathBuf>,

    /// Verbose logging and full error chains.
    #[arg(long)]
    debug: bool,

    /// Start without OpenFOAM: files can be viewed and opened in $EDITOR
    /// but tools and foamDictionary are unavailable.
    #[arg(long)]
    no_foam: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than writing over the TUI.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("ofti").join("logs").join("ofti.log"));
    }
    candidates.push(PathBuf::from(".ofti").join("logs").join("ofti.log"));
    candidates
}

/// A broken config file is logged and replaced by defaults.
fn load_config() -> OftiConfig {
    match OftiConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %err.path().display(), "Using default config: {err}");
            OftiConfig::default()
        }
    }
}

/// Why the app starts in no-foam mode, if it does.
fn startup_limited(no_foam: bool, check: fn() -> Result<(), DictionaryError>) -> Option<String> {
    if no_foam {
        return Some(NO_FOAM_REASON.to_string());
    }
    check().err().map(|err| err.to_string())
}

fn resolve_start(case_dir: Option<&Path>) -> Result<PathBuf> {
    let path = match case_dir {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("failed to read the current directory")?,
    };
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    fs::canonicalize(&path).with_context(|| format!("failed to resolve {}", path.display()))
}

async fn run(args: &Args) -> Result<()> {
    let start = resolve_start(args.case_dir.as_deref())?;
    let config = load_config();
    let limited = startup_limited(args.no_foam, ensure_environment);
    let mut app = App::new(config, &start, limited, AppDeps::system());

    let mut session = TerminalSession::new().context("failed to set up the terminal")?;
    run_app(&mut session, &mut app).await
}

async fn run_app(session: &mut TerminalSession, app: &mut App) -> Result<()> {
    let mut input = InputPump::new();
    let mut frames = time::interval(FRAME_DURATION);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let result: Result<()> = loop {
        frames.tick().await;

        match handle_events(app, &mut input) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }

        if let Err(e) = session.terminal.draw(|frame| draw(frame, app)) {
            break Err(e.into());
        }

        app.tick();

        if let Some(request) = app.pending_external().cloned() {
            input.shutdown().await;
            if let Err(e) = session.suspend() {
                break Err(e);
            }
            let outcome = external::run(&request);
            if let Err(e) = session.resume() {
                break Err(e);
            }
            app.complete_external(outcome);
            input = InputPump::new();
        }

        if app.should_quit() {
            break Ok(());
        }
    };

    input.shutdown().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            if args.debug {
                eprintln!("ofti error: {err:#}");
            } else {
                eprintln!("ofti error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use clap::Parser;
    use ofti_core::DictionaryError;
    use ofti_engine::NO_FOAM_REASON;

    use super::{Args, resolve_start, startup_limited};

    #[test]
    fn arguments_parse() {
        let args = Args::try_parse_from(["ofti", "cases/cavity", "--debug", "--no-foam"])
            .expect("valid arguments");
        assert_eq!(args.case_dir.as_deref(), Some(Path::new("cases/cavity")));
        assert!(args.debug);
        assert!(args.no_foam);

        let bare = Args::try_parse_from(["ofti"]).expect("no arguments is valid");
        assert!(bare.case_dir.is_none());
        assert!(!bare.debug && !bare.no_foam);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Args::try_parse_from(["ofti", "--foam-only"]).is_err());
    }

    #[test]
    fn no_foam_flag_skips_the_environment_check() {
        fn broken() -> Result<(), DictionaryError> {
            panic!("environment check must not run with --no-foam");
        }
        assert_eq!(
            startup_limited(true, broken).as_deref(),
            Some(NO_FOAM_REASON)
        );
    }

    #[test]
    fn missing_openfoam_starts_limited() {
        fn missing() -> Result<(), DictionaryError> {
            Err(DictionaryError::NotInstalled)
        }
        fn present() -> Result<(), DictionaryError> {
            Ok(())
        }
        let reason = startup_limited(false, missing).expect("limited");
        assert!(reason.starts_with("foamDictionary not found on PATH"));
        assert_eq!(startup_limited(false, present), None);
    }

    #[test]
    fn start_path_must_be_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("controlDict");
        fs::write(&file, "").expect("write file");

        let err = resolve_start(Some(&file)).expect_err("file is rejected");
        assert!(err.to_string().ends_with("is not a directory"));
        let resolved = resolve_start(Some(dir.path())).expect("directory is accepted");
        assert!(resolved.is_absolute());
    }
}

//! Runs programs that need the terminal while the UI is suspended.

use std::{
    io::Write,
    process::{Command, Stdio},
    thread,
};

use ofti_engine::{ExternalOutcome, ExternalRequest};

pub fn run(request: &ExternalRequest) -> ExternalOutcome {
    tracing::info!(?request, "Running external program");
    match request {
        ExternalRequest::Edit { argv } => run_interactive(argv),
        ExternalRequest::Fzf { argv, input } => run_picker(argv, input),
    }
}

/// Runs `argv` with the terminal inherited and reports its exit status.
fn run_interactive(argv: &[String]) -> ExternalOutcome {
    let Some((program, args)) = argv.split_first() else {
        return ExternalOutcome::Failed("Empty command.".to_string());
    };
    match Command::new(program).args(args).status() {
        Ok(status) => ExternalOutcome::Exited {
            success: status.success(),
        },
        Err(err) => ExternalOutcome::Failed(format!("Failed to launch {program}: {err}")),
    }
}

/// Feeds `input` to a line picker on stdin and returns the first line it
/// prints. A non-zero exit (fzf uses 1 for no match, 130 for Esc) means no
/// selection.
fn run_picker(argv: &[String], input: &str) -> ExternalOutcome {
    let Some((program, args)) = argv.split_first() else {
        return ExternalOutcome::Failed("Empty command.".to_string());
    };
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => return ExternalOutcome::Failed(format!("Failed to launch {program}: {err}")),
    };

    // Written from a thread: the picker may exit before reading everything.
    let writer = child.stdin.take().map(|mut stdin| {
        let mut payload = input.to_string();
        if !payload.ends_with('\n') {
            payload.push('\n');
        }
        thread::spawn(move || {
            if let Err(err) = stdin.write_all(payload.as_bytes()) {
                tracing::debug!("Picker stopped reading input: {err}");
            }
        })
    });

    let output = child.wait_with_output();
    if let Some(writer) = writer {
        let _ = writer.join();
    }
    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let line = stdout
                .lines()
                .next()
                .map(str::to_string)
                .filter(|line| !line.is_empty());
            ExternalOutcome::Selected(line)
        }
        Ok(output) => {
            tracing::debug!(status = ?output.status.code(), "Picker exited without a selection");
            ExternalOutcome::Selected(None)
        }
        Err(err) => ExternalOutcome::Failed(format!("{program} failed: {err}")),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use ofti_engine::{ExternalOutcome, ExternalRequest};

    use super::run;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn editor_exit_status_is_reported() {
        let ok = run(&ExternalRequest::Edit {
            argv: argv(&["true"]),
        });
        assert_eq!(ok, ExternalOutcome::Exited { success: true });
        let failed = run(&ExternalRequest::Edit {
            argv: argv(&["false"]),
        });
        assert_eq!(failed, ExternalOutcome::Exited { success: false });
    }

    #[test]
    fn missing_program_is_a_failure() {
        let outcome = run(&ExternalRequest::Edit {
            argv: argv(&["ofti-no-such-editor"]),
        });
        assert!(
            matches!(&outcome, ExternalOutcome::Failed(msg) if msg.starts_with("Failed to launch ofti-no-such-editor")),
            "{outcome:?}"
        );
    }

    #[test]
    fn picker_returns_the_chosen_line() {
        let outcome = run(&ExternalRequest::Fzf {
            argv: argv(&["sh", "-c", "sed -n 2p"]),
            input: "system/controlDict\tdeltaT\nsystem/fvSchemes\tddtSchemes".to_string(),
        });
        assert_eq!(
            outcome,
            ExternalOutcome::Selected(Some("system/fvSchemes\tddtSchemes".to_string()))
        );
    }

    #[test]
    fn cancelled_picker_selects_nothing() {
        let outcome = run(&ExternalRequest::Fzf {
            argv: argv(&["sh", "-c", "cat >/dev/null; exit 130"]),
            input: "a\nb".to_string(),
        });
        assert_eq!(outcome, ExternalOutcome::Selected(None));
    }
}

//! Shared subprocess management utilities.
//!
//! Every external program ofti starts goes through a [`CommandRunner`], so the
//! arguments handed to OpenFOAM utilities can be asserted on in tests.

use std::fmt;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::shell_words::quote_arg;

/// A program plus its arguments, working directory and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Shell-quoted command line, without the working directory.
    #[must_use]
    pub fn display(&self) -> String {
        iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs external programs to completion.
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` with stdin closed, capturing stdout and stderr.
    ///
    /// An `Err` means the process could not be started at all.
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;

    /// Starts `invocation` in the background with output appended to `log`
    /// and returns its pid. The process is detached from ofti through an
    /// intermediate `sh` so it outlives the session and is never left as a
    /// zombie.
    fn spawn_detached(&self, invocation: &Invocation, log: &Path) -> io::Result<u32> {
        let mut wrapper = Invocation::new("sh")
            .arg("-c")
            .arg(r#""$@" >> "$OFTI_JOB_LOG" 2>&1 < /dev/null & echo $!"#)
            .arg("sh")
            .arg(invocation.program.clone())
            .args(invocation.args.iter().cloned())
            .env("OFTI_JOB_LOG", log.to_string_lossy());
        wrapper.cwd.clone_from(&invocation.cwd);
        wrapper.env.extend(invocation.env.iter().cloned());

        let output = self.run(&wrapper)?;
        if !output.success() {
            return Err(io::Error::other(output.stderr.trim().to_string()));
        }
        output.stdout.trim().parse().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected pid output: {:?}", output.stdout.trim()),
            )
        })
    }
}

/// Runs programs with `std::process`, blocking the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        tracing::debug!(command = %invocation, cwd = ?invocation.cwd, "Running command");
        let output = invocation
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(command = %invocation.program, status = ?result.status, "Command finished");
        Ok(result)
    }
}

/// True while a process with `pid` exists.
#[must_use]
pub fn pid_is_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        let Ok(pid) = i32::try_from(pid) else {
            return false;
        };
        if pid <= 0 {
            return false;
        }
        // Signal 0 performs the permission and existence checks only.
        if unsafe { libc::kill(pid, 0) } == 0 {
            return true;
        }
        io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Sends `SIGTERM` to `pid`.
pub fn terminate_pid(pid: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        let pid = i32::try_from(pid)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid pid {pid}")))?;
        if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "stopping jobs needs a unix platform",
        ))
    }
}

#[cfg(any(test, feature = "testing"))]
mod scripted {
    use std::io;
    use std::iter;
    use std::sync::Mutex;

    use super::{CommandOutput, CommandRunner, Invocation};

    type Responder = dyn Fn(&Invocation) -> io::Result<CommandOutput> + Send + Sync;

    /// Records invocations and answers them from a closure.
    pub struct ScriptedRunner {
        responder: Box<Responder>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl ScriptedRunner {
        pub fn new(
            responder: impl Fn(&Invocation) -> io::Result<CommandOutput> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Answers every call with the same output.
        pub fn always(output: CommandOutput) -> Self {
            Self::new(move |_| Ok(output.clone()))
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        /// Argument vectors of every call, program first.
        pub fn argv(&self) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .map(|inv| iter::once(inv.program).chain(inv.args).collect())
                .collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(invocation.clone());
            }
            (self.responder)(invocation)
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedRunner;

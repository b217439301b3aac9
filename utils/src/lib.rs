//! Shared infrastructure utilities for ofti.
//!
//! This crate provides cross-cutting utilities that multiple ofti crates need
//! but that don't belong in the domain-pure `ofti-types` crate:
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename)
//! - **`process`**: Captured subprocess execution behind a mockable runner
//! - **`shell_words`**: POSIX-shell-like splitting and quoting of arguments

pub mod atomic_write;
pub mod process;
pub mod shell_words;

pub use atomic_write::atomic_write;
pub use process::{
    CommandOutput, CommandRunner, Invocation, SystemRunner, pid_is_alive,
    terminate_pid,
};
#[cfg(any(test, feature = "testing"))]
pub use process::ScriptedRunner;
pub use shell_words::{SplitError, quote_arg, split_args};

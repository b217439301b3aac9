//! Access to dictionary contents through OpenFOAM's `foamDictionary` utility.
//!
//! ofti never parses dictionaries itself. Every read and write is a
//! `foamDictionary` invocation, and the [`DictionaryBackend`] trait lets the
//! engine run against a fake in tests.

use std::path::Path;
use std::sync::Arc;

use ofti_types::EntryPath;
use ofti_utils::{CommandOutput, CommandRunner, Invocation};
use thiserror::Error;

pub const FOAM_DICTIONARY: &str = "foamDictionary";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error(
        "foamDictionary not found on PATH. Please source your OpenFOAM bashrc before running ofti."
    )]
    NotInstalled,
    /// `foamDictionary` ran and reported a failure.
    #[error("{0}")]
    Failed(String),
    #[error("Failed to run foamDictionary: {0}")]
    Spawn(String),
}

/// Checks that `foamDictionary` is on `PATH`.
pub fn ensure_environment() -> Result<(), DictionaryError> {
    which::which(FOAM_DICTIONARY)
        .map(|path| tracing::debug!(path = %path.display(), "Found foamDictionary"))
        .map_err(|_| DictionaryError::NotInstalled)
}

/// Reads and writes dictionary entries.
pub trait DictionaryBackend: Send + Sync {
    /// Keywords at the top level (`key == None`) or below `key`.
    ///
    /// Listing below a key that is not a sub-dictionary yields an empty list.
    fn list_keywords(&self, file: &Path, key: Option<&EntryPath>)
    -> Result<Vec<String>, DictionaryError>;

    fn read_entry(&self, file: &Path, key: &EntryPath) -> Result<String, DictionaryError>;

    fn write_entry(&self, file: &Path, key: &EntryPath, value: &str) -> Result<(), DictionaryError>;

    /// `-info` output lines; empty when unavailable.
    fn entry_info(&self, file: &Path, key: &EntryPath) -> Vec<String>;

    /// Allowed values reported by `-list`; empty when the entry is not an enum.
    fn entry_enum_values(&self, file: &Path, key: &EntryPath) -> Vec<String>;
}

/// [`DictionaryBackend`] backed by the `foamDictionary` executable.
#[derive(Clone)]
pub struct FoamDictionary {
    runner: Arc<dyn CommandRunner>,
}

impl FoamDictionary {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn run(&self, file: &Path, args: &[&str]) -> Result<CommandOutput, DictionaryError> {
        let invocation = Invocation::new(FOAM_DICTIONARY)
            .arg(file.to_string_lossy())
            .args(args.iter().copied());
        let output = self
            .runner
            .run(&invocation)
            .map_err(|err| DictionaryError::Spawn(err.to_string()))?;
        if !output.success() {
            tracing::debug!(
                command = %invocation,
                status = ?output.status,
                stderr = %output.stderr.trim(),
                "foamDictionary failed"
            );
        }
        Ok(output)
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Strips the `key ` prefix `foamDictionary` echoes for single-line entries.
/// Multi-line entries and dictionaries are returned as printed.
fn strip_echoed_key(output: &str, key: &EntryPath) -> String {
    let text = output.trim();
    let mut lines = text.lines();
    if let (Some(line), None) = (lines.next(), lines.next())
        && let Some((first, rest)) = line.trim().split_once(char::is_whitespace)
        && first == key.leaf()
        && !rest.trim().is_empty()
    {
        return rest.trim().to_string();
    }
    text.to_string()
}

impl DictionaryBackend for FoamDictionary {
    fn list_keywords(
        &self,
        file: &Path,
        key: Option<&EntryPath>,
    ) -> Result<Vec<String>, DictionaryError> {
        match key {
            None => {
                let output = self.run(file, &["-keywords"])?;
                if !output.success() {
                    let stderr = output.stderr.trim();
                    return Err(DictionaryError::Failed(if stderr.is_empty() {
                        "Failed to list keywords.".to_string()
                    } else {
                        stderr.to_string()
                    }));
                }
                Ok(non_empty_lines(&output.stdout))
            }
            Some(key) => {
                let output = self.run(file, &["-entry", key.as_str(), "-keywords"])?;
                if !output.success() {
                    return Ok(Vec::new());
                }
                Ok(non_empty_lines(&output.stdout))
            }
        }
    }

    fn read_entry(&self, file: &Path, key: &EntryPath) -> Result<String, DictionaryError> {
        let output = self.run(file, &["-entry", key.as_str()])?;
        if !output.success() {
            let stderr = output.stderr.trim();
            return Err(DictionaryError::Failed(if stderr.is_empty() {
                format!("Failed to read entry {key}.")
            } else {
                stderr.to_string()
            }));
        }
        Ok(strip_echoed_key(&output.stdout, key))
    }

    fn write_entry(&self, file: &Path, key: &EntryPath, value: &str) -> Result<(), DictionaryError> {
        let output = self.run(file, &["-entry", key.as_str(), "-set", value])?;
        if output.success() {
            tracing::info!(file = %file.display(), key = %key, "Entry updated");
            Ok(())
        } else {
            Err(DictionaryError::Failed(output.stderr.trim().to_string()))
        }
    }

    fn entry_info(&self, file: &Path, key: &EntryPath) -> Vec<String> {
        match self.run(file, &["-entry", key.as_str(), "-info"]) {
            Ok(output) if output.success() => non_empty_lines(&output.stdout),
            _ => Vec::new(),
        }
    }

    fn entry_enum_values(&self, file: &Path, key: &EntryPath) -> Vec<String> {
        match self.run(file, &["-entry", key.as_str(), "-list"]) {
            Ok(output) if output.success() => non_empty_lines(&output.stdout)
                .into_iter()
                .map(|line| line.trim().to_string())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use ofti_types::EntryPath;
    use ofti_utils::{CommandOutput, ScriptedRunner};

    use super::{DictionaryBackend, DictionaryError, FoamDictionary};

    fn backend(output: CommandOutput) -> (Arc<ScriptedRunner>, FoamDictionary) {
        let runner = Arc::new(ScriptedRunner::always(output));
        (runner.clone(), FoamDictionary::new(runner))
    }

    #[test]
    fn keyword_listing_arguments() {
        let (runner, dict) = backend(CommandOutput::ok("FoamFile\napplication\n\nstartFrom\n"));
        let file = Path::new("/case/system/controlDict");

        let keys = dict.list_keywords(file, None).expect("keywords");
        assert_eq!(keys, ["FoamFile", "application", "startFrom"]);

        dict.list_keywords(file, Some(&EntryPath::new("functions")))
            .expect("subkeys");
        assert_eq!(
            runner.argv(),
            vec![
                vec!["foamDictionary", "/case/system/controlDict", "-keywords"],
                vec![
                    "foamDictionary",
                    "/case/system/controlDict",
                    "-entry",
                    "functions",
                    "-keywords"
                ],
            ]
        );
    }

    #[test]
    fn top_level_listing_failure_uses_stderr_or_fallback() {
        let (_, dict) = backend(CommandOutput::failed(1, "--> FOAM FATAL IO ERROR"));
        assert_eq!(
            dict.list_keywords(Path::new("U"), None),
            Err(DictionaryError::Failed("--> FOAM FATAL IO ERROR".to_string()))
        );

        let (_, dict) = backend(CommandOutput::failed(1, ""));
        assert_eq!(
            dict.list_keywords(Path::new("U"), None),
            Err(DictionaryError::Failed("Failed to list keywords.".to_string()))
        );
    }

    #[test]
    fn sub_listing_failure_is_empty() {
        let (_, dict) = backend(CommandOutput::failed(1, "not a dictionary"));
        let keys = dict
            .list_keywords(Path::new("U"), Some(&EntryPath::new("internalField")))
            .expect("no error");
        assert!(keys.is_empty());
    }

    #[test]
    fn read_entry_strips_echoed_key() {
        let (runner, dict) = backend(CommandOutput::ok("deltaT          0.005;\n"));
        let value = dict
            .read_entry(Path::new("controlDict"), &EntryPath::new("deltaT"))
            .expect("read");
        assert_eq!(value, "0.005;");
        assert_eq!(
            runner.argv(),
            vec![vec!["foamDictionary", "controlDict", "-entry", "deltaT"]]
        );

        let (_, dict) = backend(CommandOutput::ok("{\n    type fixedValue;\n}\n"));
        let value = dict
            .read_entry(Path::new("U"), &EntryPath::new("boundaryField.inlet"))
            .expect("read");
        assert_eq!(value, "{\n    type fixedValue;\n}");
    }

    #[test]
    fn read_entry_failure_message() {
        let (_, dict) = backend(CommandOutput::failed(1, " "));
        assert_eq!(
            dict.read_entry(Path::new("U"), &EntryPath::new("missing")),
            Err(DictionaryError::Failed("Failed to read entry missing.".to_string()))
        );
    }

    #[test]
    fn write_entry_passes_value_as_single_argument() {
        let (runner, dict) = backend(CommandOutput::ok(""));
        dict.write_entry(
            Path::new("0/U"),
            &EntryPath::new("boundaryField.inlet.value"),
            "uniform (1 0 0)",
        )
        .expect("write");
        assert_eq!(
            runner.argv(),
            vec![vec![
                "foamDictionary",
                "0/U",
                "-entry",
                "boundaryField.inlet.value",
                "-set",
                "uniform (1 0 0)"
            ]]
        );
    }

    #[test]
    fn info_and_enum_listing_swallow_failures() {
        let (_, dict) = backend(CommandOutput::failed(2, "unknown option"));
        let key = EntryPath::new("startFrom");
        assert!(dict.entry_info(Path::new("controlDict"), &key).is_empty());
        assert!(dict.entry_enum_values(Path::new("controlDict"), &key).is_empty());

        let (runner, dict) = backend(CommandOutput::ok("  firstTime\n startTime \n\nlatestTime\n"));
        assert_eq!(
            dict.entry_enum_values(Path::new("controlDict"), &key),
            ["firstTime", "startTime", "latestTime"]
        );
        assert_eq!(runner.argv()[0][4], "-list");
    }
}

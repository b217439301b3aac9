//! Boundary: gathers the facts shown in the case banner.
//!
//! Filesystem, environment and subprocess access happen in [`CaseMetadata::gather`].
//! The returned struct has no optional fields; every fallback is resolved to
//! a display string here.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ofti_types::EntryPath;
use ofti_utils::{CommandRunner, Invocation};
use regex::Regex;

use crate::case::{has_mesh, latest_time, log_files};
use crate::checkmesh::mesh_stats;
use crate::dictionary::DictionaryBackend;

pub const UNKNOWN: &str = "unknown";

const BANNER_COLUMN: usize = 36;
const BANNER_TOP: &str =
    "/*--------------------------------*- ofti -*----------------------------------*\\";
const BANNER_BOTTOM: &str =
    "\\*---------------------------------------------------------------------------*/";

static HEADER_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Version:\s*([^\s|]+)").expect("valid version regex"));
static APPLICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*application\s+([^\s;]+)\s*;").expect("valid application regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseMetadata {
    pub case_name: String,
    pub path: PathBuf,
    pub solver: String,
    pub foam_version: String,
    pub case_header_version: String,
    pub latest_time: String,
    pub mesh: String,
    pub parallel: String,
}

impl CaseMetadata {
    /// Collects banner facts for `case_dir`.
    ///
    /// Without a backend (no-foam mode) the solver is read from the raw
    /// controlDict text and parallel settings are not reported.
    pub fn gather(
        case_dir: &Path,
        backend: Option<&dyn DictionaryBackend>,
        runner: &dyn CommandRunner,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let case_name = case_dir
            .file_name()
            .map_or_else(|| case_dir.display().to_string(), |n| n.to_string_lossy().into_owned());
        let control_dict = case_dir.join("system").join("controlDict");
        let case_header_version = fs::read_to_string(&control_dict)
            .ok()
            .and_then(|text| header_version(&text))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let mut foam_version = foam_version(runner, &env);
        if foam_version == UNKNOWN && case_header_version != UNKNOWN {
            foam_version.clone_from(&case_header_version);
        }

        Self {
            case_name,
            path: case_dir.to_path_buf(),
            solver: detect_solver(case_dir, backend),
            foam_version,
            case_header_version,
            latest_time: latest_time(case_dir),
            mesh: detect_mesh(case_dir),
            parallel: backend.map_or_else(|| "n/a".to_string(), |b| parallel_settings(b, case_dir)),
        }
    }

    /// `ran` once any non-zero time directory exists.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if matches!(self.latest_time.as_str(), "0" | "0.0" | "") {
            "clean"
        } else {
            "ran"
        }
    }

    #[must_use]
    pub fn banner_lines(&self) -> Vec<String> {
        let rows = [
            (format!("Case: {}", self.case_name), format!("Solver: {}", self.solver)),
            (
                format!("Status: {}", self.status()),
                format!("Latest time: {}", self.latest_time),
            ),
            (format!("Mesh: {}", self.mesh), format!("Parallel: {}", self.parallel)),
            (
                format!("Env: {}", self.foam_version),
                format!("Case header: {}", self.case_header_version),
            ),
            (format!("Path: {}", self.path.display()), String::new()),
        ];
        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(BANNER_TOP.to_string());
        lines.extend(rows.iter().map(|(left, right)| banner_row(left, right)));
        lines.push(BANNER_BOTTOM.to_string());
        lines
    }
}

fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn banner_row(left: &str, right: &str) -> String {
    let w = BANNER_COLUMN;
    format!("| {:<w$} | {:<w$} |", clip(left, w), clip(right, w))
}

/// First token of the `application` entry with `;` removed.
pub fn detect_solver(case_dir: &Path, backend: Option<&dyn DictionaryBackend>) -> String {
    let control_dict = case_dir.join("system").join("controlDict");
    if !control_dict.is_file() {
        return UNKNOWN.to_string();
    }
    let raw = match backend {
        Some(backend) => backend
            .read_entry(&control_dict, &EntryPath::new("application"))
            .ok(),
        None => fs::read_to_string(&control_dict).ok().and_then(|text| {
            APPLICATION
                .captures(&text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        }),
    };
    raw.as_deref()
        .and_then(|text| text.split_whitespace().next())
        .map(|token| token.trim_end_matches(';'))
        .filter(|token| !token.is_empty())
        .map_or_else(|| UNKNOWN.to_string(), ToString::to_string)
}

fn foam_version(runner: &dyn CommandRunner, env: &impl Fn(&str) -> Option<String>) -> String {
    if let Some(version) = ["WM_PROJECT_VERSION", "FOAM_VERSION"]
        .iter()
        .filter_map(|name| env(name))
        .find(|v| !v.trim().is_empty())
    {
        return version;
    }
    match runner.run(&Invocation::new("foamVersion").arg("-short")) {
        Ok(output) if output.success() && !output.stdout.trim().is_empty() => {
            output.stdout.trim().to_string()
        }
        Ok(_) => UNKNOWN.to_string(),
        Err(err) => {
            tracing::debug!("foamVersion unavailable: {err}");
            UNKNOWN.to_string()
        }
    }
}

/// Version from the comment banner before `FoamFile`, else from the
/// `version` entry inside the `FoamFile` block.
#[must_use]
pub fn header_version(text: &str) -> Option<String> {
    for line in text.lines() {
        if line.to_lowercase().contains("foamfile") {
            break;
        }
        if let Some(version) = HEADER_VERSION
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches('|'))
            .filter(|v| !v.is_empty())
        {
            return Some(version.to_string());
        }
    }

    let mut inside = false;
    for line in text.lines() {
        let stripped = line.trim();
        let lower = stripped.to_lowercase();
        if lower.starts_with("foamfile") {
            inside = true;
        } else if inside && stripped.starts_with('}') {
            break;
        } else if inside && lower.starts_with("version") {
            let value = stripped.split_whitespace().nth(1)?.trim_end_matches(';');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn detect_mesh(case_dir: &Path) -> String {
    let newest = log_files(case_dir)
        .into_iter()
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("log.checkMesh"))
        })
        .max_by_key(|p| fs::metadata(p).and_then(|m| m.modified()).ok());
    let from_log = newest
        .and_then(|p| fs::read_to_string(p).ok())
        .and_then(|text| mesh_stats(&text));
    match from_log {
        Some(stats) => stats,
        None if has_mesh(case_dir) => "mesh (no checkMesh log)".to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// `{n} ({method})` from `system/decomposeParDict`, or `n/a`.
pub fn parallel_settings(backend: &dyn DictionaryBackend, case_dir: &Path) -> String {
    let dict = case_dir.join("system").join("decomposeParDict");
    if !dict.is_file() {
        return "n/a".to_string();
    }
    let read = |key: &str| {
        backend
            .read_entry(&dict, &EntryPath::new(key))
            .ok()
            .map(|v| v.trim().trim_end_matches(';').trim().to_string())
            .filter(|v| !v.is_empty())
    };
    match (read("numberOfSubdomains"), read("method")) {
        (Some(n), Some(method)) => format!("{n} ({method})"),
        (Some(value), None) | (None, Some(value)) => value,
        (None, None) => "n/a".to_string(),
    }
}

/// Positive `numberOfSubdomains` from `system/decomposeParDict`.
pub fn number_of_subdomains(backend: &dyn DictionaryBackend, case_dir: &Path) -> Option<u32> {
    let dict = case_dir.join("system").join("decomposeParDict");
    backend
        .read_entry(&dict, &EntryPath::new("numberOfSubdomains"))
        .ok()?
        .trim()
        .trim_end_matches(';')
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
}

//! Case directory layout: discovery of dictionary files, time directories and
//! logs, plus the rows shown by the case-folder picker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ofti_types::CaseSection;

/// True when `path` contains `system/controlDict`.
#[must_use]
pub fn is_case_dir(path: &Path) -> bool {
    path.join("system").join("controlDict").is_file()
}

/// Dictionary files grouped by section, each list sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFiles {
    pub system: Vec<PathBuf>,
    pub constant: Vec<PathBuf>,
    pub initial: Vec<PathBuf>,
}

impl CaseFiles {
    #[must_use]
    pub fn section(&self, section: CaseSection) -> &[PathBuf] {
        match section {
            CaseSection::System => &self.system,
            CaseSection::Constant => &self.constant,
            CaseSection::Initial => &self.initial,
        }
    }

    /// All files in section order.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.system
            .iter()
            .chain(&self.constant)
            .chain(&self.initial)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.constant.is_empty() && self.initial.is_empty()
    }
}

fn sorted_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Initial-condition directories: names starting with `0` that are either
/// not numbers (`0.orig`) or numerically zero (`0`, `0.000`).
fn is_initial_dir_name(name: &str) -> bool {
    name.starts_with('0') && name.parse::<f64>().map_or(true, |v| v == 0.0)
}

/// Finds the dictionary files of a case.
#[must_use]
pub fn discover_case_files(case_dir: &Path) -> CaseFiles {
    let mut initial_dirs: Vec<PathBuf> = fs::read_dir(case_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(is_initial_dir_name)
                })
                .collect()
        })
        .unwrap_or_default();
    initial_dirs.sort();

    CaseFiles {
        system: sorted_files(&case_dir.join("system")),
        constant: sorted_files(&case_dir.join("constant")),
        initial: initial_dirs.iter().flat_map(|d| sorted_files(d)).collect(),
    }
}

/// `path` relative to `case_dir` for display, falling back to the full path.
#[must_use]
pub fn relative_display(case_dir: &Path, path: &Path) -> String {
    path.strip_prefix(case_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Numeric time directories sorted by value.
#[must_use]
pub fn time_directories(case_dir: &Path) -> Vec<PathBuf> {
    let mut times: Vec<(f64, PathBuf)> = fs::read_dir(case_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .filter_map(|p| {
                    let value = p.file_name()?.to_str()?.parse::<f64>().ok()?;
                    value.is_finite().then_some((value, p))
                })
                .collect()
        })
        .unwrap_or_default();
    times.sort_by(|a, b| a.0.total_cmp(&b.0));
    times.into_iter().map(|(_, p)| p).collect()
}

/// Largest numeric time directory formatted like C's `%g`, or `0`.
#[must_use]
pub fn latest_time(case_dir: &Path) -> String {
    time_directories(case_dir)
        .last()
        .and_then(|p| p.file_name()?.to_str()?.parse::<f64>().ok())
        .map_or_else(|| "0".to_string(), format_g)
}

/// Formats `value` with six significant digits the way `printf("%g")` does.
#[must_use]
pub fn format_g(value: f64) -> String {
    format_significant(value, 6)
}

/// `value` with `digits` significant digits, switching to exponent form
/// outside `1e-4..10^digits`, trailing zeros trimmed.
#[must_use]
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let digits = digits.max(1);
    let precision = digits - 1;
    let scientific = format!("{value:.precision$e}");
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let limit = i32::try_from(digits).unwrap_or(i32::MAX);

    if exponent < -4 || exponent >= limit {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        );
    }
    let decimals = usize::try_from(limit - 1 - exponent).unwrap_or(0);
    trim_fraction(&format!("{value:.decimals$}")).to_string()
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// `log.*` files in the case root, sorted by name.
#[must_use]
pub fn log_files(case_dir: &Path) -> Vec<PathBuf> {
    sorted_files(case_dir)
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("log."))
        })
        .collect()
}

/// Shell scripts in the case root, sorted by name.
#[must_use]
pub fn shell_scripts(case_dir: &Path) -> Vec<PathBuf> {
    sorted_files(case_dir)
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "sh"))
        .collect()
}

/// Last `count` lines of `text`.
#[must_use]
pub fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

/// True when `constant/polyMesh/boundary` exists and is non-empty.
#[must_use]
pub fn has_mesh(case_dir: &Path) -> bool {
    fs::metadata(case_dir.join("constant").join("polyMesh").join("boundary"))
        .is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// A row in the case-folder picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEntry {
    UseThisFolder,
    Parent,
    Dir(PathBuf),
}

impl PickerEntry {
    #[must_use]
    pub fn label(&self) -> String {
        let name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        match self {
            Self::UseThisFolder => "[Use this folder]".to_string(),
            Self::Parent => "..".to_string(),
            Self::Dir(path) => format!("{}/", name(path)),
        }
    }
}

/// Picker rows for `dir`: the use/parent rows, then subdirectories.
/// Hidden entries and plain files are skipped.
pub fn list_directory(dir: &Path) -> io::Result<Vec<PickerEntry>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut rows = vec![PickerEntry::UseThisFolder];
    if dir.parent().is_some() {
        rows.push(PickerEntry::Parent);
    }
    rows.extend(dirs.into_iter().map(PickerEntry::Dir));
    Ok(rows)
}

//! Top-level keyword differences between the dictionaries of two cases.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::case::{discover_case_files, relative_display};
use crate::dictionary::DictionaryBackend;

/// Differences for one dictionary, keyed by its case-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictDiff {
    pub rel: String,
    /// Keywords (or the file itself) present only in the other case.
    pub missing_in_current: Vec<String>,
    /// Keywords (or the file itself) present only in the current case.
    pub missing_in_other: Vec<String>,
    pub error: Option<String>,
}

fn files_by_rel(case_dir: &Path) -> HashMap<String, PathBuf> {
    discover_case_files(case_dir)
        .iter()
        .map(|path| (relative_display(case_dir, path), path.clone()))
        .collect()
}

/// Compares every dictionary found in either case. Files present on one
/// side only are reported by name; files on both sides by keyword.
pub fn compare_case_dicts(
    backend: &dyn DictionaryBackend,
    current: &Path,
    other: &Path,
) -> Vec<DictDiff> {
    let left = files_by_rel(current);
    let right = files_by_rel(other);
    let all: BTreeSet<&String> = left.keys().chain(right.keys()).collect();

    let mut diffs = Vec::new();
    for rel in all {
        let diff = match (left.get(rel), right.get(rel)) {
            (Some(_), None) => DictDiff {
                rel: rel.clone(),
                missing_in_other: vec![rel.clone()],
                ..DictDiff::default()
            },
            (None, Some(_)) => DictDiff {
                rel: rel.clone(),
                missing_in_current: vec![rel.clone()],
                ..DictDiff::default()
            },
            (Some(left_path), Some(right_path)) => {
                let keys = backend
                    .list_keywords(left_path, None)
                    .and_then(|l| Ok((l, backend.list_keywords(right_path, None)?)));
                match keys {
                    Err(err) => DictDiff {
                        rel: rel.clone(),
                        error: Some(err.to_string()),
                        ..DictDiff::default()
                    },
                    Ok((left_keys, right_keys)) => {
                        let left_keys: BTreeSet<String> = left_keys.into_iter().collect();
                        let right_keys: BTreeSet<String> = right_keys.into_iter().collect();
                        let diff = DictDiff {
                            rel: rel.clone(),
                            missing_in_current: right_keys.difference(&left_keys).cloned().collect(),
                            missing_in_other: left_keys.difference(&right_keys).cloned().collect(),
                            error: None,
                        };
                        if diff.missing_in_current.is_empty() && diff.missing_in_other.is_empty() {
                            continue;
                        }
                        diff
                    }
                }
            }
            (None, None) => continue,
        };
        diffs.push(diff);
    }
    diffs
}

#[must_use]
pub fn format_compare_report(current: &Path, other: &Path, diffs: &[DictDiff]) -> String {
    let mut lines = vec![
        "DICTIONARY COMPARE".to_string(),
        String::new(),
        format!("Current: {}", current.display()),
        format!("Other:   {}", other.display()),
        String::new(),
    ];
    if diffs.is_empty() {
        lines.push("No dictionary key differences detected.".to_string());
        return lines.join("\n");
    }
    for diff in diffs {
        lines.push(diff.rel.clone());
        if let Some(error) = &diff.error {
            lines.push(format!("  error: {error}"));
        } else {
            if !diff.missing_in_current.is_empty() {
                lines.push(format!("  missing in current: {}", diff.missing_in_current.join(", ")));
            }
            if !diff.missing_in_other.is_empty() {
                lines.push(format!("  missing in other: {}", diff.missing_in_other.join(", ")));
            }
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::{DictDiff, compare_case_dicts, format_compare_report};
    use crate::testing::FakeDictionary;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, "FoamFile {}\n").expect("write");
    }

    #[test]
    fn reports_keyword_and_file_differences() {
        let left = tempfile::tempdir().expect("tempdir");
        let right = tempfile::tempdir().expect("tempdir");
        for case in [left.path(), right.path()] {
            touch(&case.join("system/controlDict"));
            touch(&case.join("system/fvSchemes"));
        }
        touch(&left.path().join("system/fvSolution"));
        touch(&right.path().join("constant/transportProperties"));

        let fake = FakeDictionary::new()
            .with_file_keywords(
                &left.path().join("system/controlDict"),
                &["application", "endTime", "writeFormat"],
            )
            .with_file_keywords(
                &right.path().join("system/controlDict"),
                &["application", "deltaT", "endTime"],
            )
            .with_file_keywords(&left.path().join("system/fvSchemes"), &["ddtSchemes"])
            .with_file_keywords(&right.path().join("system/fvSchemes"), &["ddtSchemes"]);

        let diffs = compare_case_dicts(&fake, left.path(), right.path());
        assert_eq!(
            diffs,
            [
                DictDiff {
                    rel: "constant/transportProperties".to_string(),
                    missing_in_current: vec!["constant/transportProperties".to_string()],
                    ..DictDiff::default()
                },
                DictDiff {
                    rel: "system/controlDict".to_string(),
                    missing_in_current: vec!["deltaT".to_string()],
                    missing_in_other: vec!["writeFormat".to_string()],
                    error: None,
                },
                DictDiff {
                    rel: "system/fvSolution".to_string(),
                    missing_in_other: vec!["system/fvSolution".to_string()],
                    ..DictDiff::default()
                },
            ]
        );

        let report = format_compare_report(left.path(), right.path(), &diffs);
        assert!(report.starts_with("DICTIONARY COMPARE\n\nCurrent: "));
        assert!(report.contains("system/controlDict\n  missing in current: deltaT\n  missing in other: writeFormat\n"));
    }

    #[test]
    fn listing_failure_is_reported_per_file() {
        let left = tempfile::tempdir().expect("tempdir");
        let right = tempfile::tempdir().expect("tempdir");
        touch(&left.path().join("system/controlDict"));
        touch(&right.path().join("system/controlDict"));

        let fake = FakeDictionary::new().with_failing_file("controlDict");
        let diffs = compare_case_dicts(&fake, left.path(), right.path());
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].error.is_some());
        let report = format_compare_report(left.path(), right.path(), &diffs);
        assert!(report.contains("system/controlDict\n  error: "));
    }

    #[test]
    fn identical_cases_have_no_differences() {
        let left = tempfile::tempdir().expect("tempdir");
        let right = tempfile::tempdir().expect("tempdir");
        touch(&left.path().join("system/controlDict"));
        touch(&right.path().join("system/controlDict"));

        let fake = FakeDictionary::new().with_entry("application", "icoFoam");
        let diffs = compare_case_dicts(&fake, left.path(), right.path());
        assert!(diffs.is_empty());
        assert!(
            format_compare_report(left.path(), right.path(), &diffs)
                .ends_with("No dictionary key differences detected.")
        );
    }
}

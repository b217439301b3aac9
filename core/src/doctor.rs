//! Case doctor: a one-page health report built from the filesystem layout
//! and the dictionary lint in [`verify_case`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::case::{latest_time, relative_display};
use crate::dictionary::DictionaryBackend;
use crate::metadata::detect_solver;
use crate::verify::verify_case;

const REQUIRED_DICTS: [&str; 3] = ["controlDict", "fvSchemes", "fvSolution"];
const EXPECTED_FIELDS: [&str; 2] = ["U", "p"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub case_dir: PathBuf,
    pub solver: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl DoctorReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![
            "CASE DOCTOR".to_string(),
            String::new(),
            format!("Path: {}", self.case_dir.display()),
            format!("Solver: {}", self.solver),
            "Files checked: 3 dicts + 0/ + mesh".to_string(),
        ];
        if self.is_clean() {
            lines.push(String::new());
            lines.push("OK: no issues found.".to_string());
            return lines.join("\n");
        }
        for (title, items) in [("Errors:", &self.errors), ("Warnings:", &self.warnings)] {
            if items.is_empty() {
                continue;
            }
            lines.push(String::new());
            lines.push(title.to_string());
            lines.extend(items.iter().map(|item| format!("- {item}")));
        }
        lines.join("\n")
    }
}

fn field_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter_map(|p| Some(p.file_name()?.to_str()?.to_string()))
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Checks layout, physics dictionaries, mesh, initial conditions and run
/// state, then appends the per-file lint findings.
pub fn case_doctor(backend: &dyn DictionaryBackend, case_dir: &Path) -> DoctorReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let system = case_dir.join("system");
    let constant = case_dir.join("constant");

    for name in REQUIRED_DICTS {
        if !system.join(name).is_file() {
            errors.push(format!("Missing system/{name}."));
        }
    }

    if !constant.join("transportProperties").is_file()
        && !constant.join("thermophysicalProperties").is_file()
    {
        warnings.push("Missing constant/transportProperties or thermophysicalProperties.".to_string());
    }
    if !constant.join("turbulenceProperties").is_file()
        && !constant.join("RASProperties").is_file()
    {
        warnings.push("Missing turbulence properties (turbulenceProperties/RASProperties).".to_string());
    }

    if !constant.join("polyMesh").join("boundary").is_file() {
        errors.push("Missing constant/polyMesh/boundary (mesh not generated).".to_string());
    }

    let zero = case_dir.join("0");
    let zero_orig = case_dir.join("0.orig");
    let initial = if zero.is_dir() {
        Some(("0", zero.as_path()))
    } else if zero_orig.is_dir() {
        Some(("0.orig", zero_orig.as_path()))
    } else {
        None
    };
    match initial {
        None => errors.push("Missing 0/ (or 0.orig) initial conditions directory.".to_string()),
        Some((label, dir)) => {
            let fields = field_files(dir);
            if fields.is_empty() {
                warnings.push("No field files detected in 0/ (or 0.orig).".to_string());
            } else {
                let mut missing: Vec<&str> = EXPECTED_FIELDS
                    .iter()
                    .copied()
                    .filter(|f| !fields.iter().any(|name| name == f))
                    .collect();
                missing.sort_unstable();
                if !missing.is_empty() {
                    warnings.push(format!("Missing fields in {label}: {}", missing.join(", ")));
                }
            }
            if label == "0.orig" {
                warnings.push("0/ directory missing (only 0.orig present). Copy 0.orig -> 0.".to_string());
            }
        }
    }

    if latest_time(case_dir) == "0" {
        warnings.push("No non-zero time directory (case not run yet).".to_string());
    }

    for check in verify_case(backend, case_dir, |_| {}) {
        let rel = relative_display(case_dir, &check.path);
        errors.extend(check.errors.iter().map(|e| format!("{rel}: {e}")));
        warnings.extend(check.warnings.iter().map(|w| format!("{rel}: {w}")));
    }

    tracing::debug!(
        case = %case_dir.display(),
        errors = errors.len(),
        warnings = warnings.len(),
        "Case doctor finished"
    );
    DoctorReport {
        case_dir: case_dir.to_path_buf(),
        solver: detect_solver(case_dir, Some(backend)),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::case_doctor;
    use crate::testing::FakeDictionary;

    fn write(path: &Path, text: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, text).expect("write");
    }

    fn healthy_case() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let case = dir.path();
        for name in ["controlDict", "fvSchemes", "fvSolution"] {
            write(&case.join("system").join(name), "FoamFile {}\n");
        }
        write(&case.join("constant/transportProperties"), "nu 0.01;\n");
        write(&case.join("constant/turbulenceProperties"), "simulationType laminar;\n");
        write(&case.join("constant/polyMesh/boundary"), "()\n");
        write(&case.join("0/U"), "FoamFile {}\n");
        write(&case.join("0/p"), "FoamFile {}\n");
        fs::create_dir_all(case.join("0.5")).expect("time dir");
        dir
    }

    #[test]
    fn healthy_case_reports_ok() {
        let dir = healthy_case();
        let fake = FakeDictionary::new().with_entry("application", "icoFoam;");
        let report = case_doctor(&fake, dir.path());
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.solver, "icoFoam");

        let text = report.render();
        assert!(text.starts_with("CASE DOCTOR\n\nPath: "));
        assert!(text.contains("Solver: icoFoam"));
        assert!(text.ends_with("\n\nOK: no issues found."));
    }

    #[test]
    fn broken_case_lists_errors_then_warnings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let case = dir.path();
        write(&case.join("system/controlDict"), "FoamFile {}\n");
        write(&case.join("0.orig/U"), "FoamFile {}\n");

        let fake = FakeDictionary::new().with_failing_file("controlDict");
        let report = case_doctor(&fake, case);

        assert_eq!(
            report.errors[..3],
            [
                "Missing system/fvSchemes.",
                "Missing system/fvSolution.",
                "Missing constant/polyMesh/boundary (mesh not generated).",
            ]
        );
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.starts_with("system/controlDict: ")),
            "{:?}",
            report.errors
        );
        assert!(report.warnings.contains(&"Missing fields in 0.orig: p".to_string()));
        assert!(report.warnings.contains(
            &"0/ directory missing (only 0.orig present). Copy 0.orig -> 0.".to_string()
        ));
        assert!(report.warnings.contains(
            &"Missing turbulence properties (turbulenceProperties/RASProperties).".to_string()
        ));
        assert!(report
            .warnings
            .contains(&"No non-zero time directory (case not run yet).".to_string()));

        let text = report.render();
        let errors_at = text.find("\nErrors:\n- Missing system/fvSchemes.").expect("errors");
        let warnings_at = text.find("\nWarnings:\n- ").expect("warnings");
        assert!(errors_at < warnings_at);
    }

    #[test]
    fn missing_initial_conditions_is_an_error() {
        let dir = healthy_case();
        fs::remove_dir_all(dir.path().join("0")).expect("rm 0");
        let report = case_doctor(&FakeDictionary::new(), dir.path());
        assert!(report
            .errors
            .contains(&"Missing 0/ (or 0.orig) initial conditions directory.".to_string()));
    }
}

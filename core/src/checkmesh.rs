//! Summaries extracted from `checkMesh` output and solver logs.

use std::sync::LazyLock;

use regex::Regex;

const NUMBER: &str = r"([0-9eE.+-]+)";

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&p.replace("{num}", NUMBER)).expect("valid checkMesh regex"))
        .collect()
}

struct Metric {
    label: &'static str,
    patterns: Vec<Regex>,
}

impl Metric {
    fn new(label: &'static str, patterns: &[&str]) -> Self {
        Self {
            label,
            patterns: compile(patterns),
        }
    }

    fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.patterns
            .iter()
            .find_map(|re| re.captures(text)?.get(1))
            .map(|m| m.as_str())
    }
}

static COUNTS: LazyLock<Vec<Metric>> = LazyLock::new(|| {
    vec![
        Metric::new("Cells", &[r"(?i)number of cells\s*:\s*(\d+)", r"(?i)\bcells\s*:\s*(\d+)"]),
        Metric::new("Faces", &[r"(?i)number of faces\s*:\s*(\d+)", r"(?i)\bfaces\s*:\s*(\d+)"]),
        Metric::new("Points", &[r"(?i)number of points\s*:\s*(\d+)", r"(?i)\bpoints\s*:\s*(\d+)"]),
        Metric::new("Internal faces", &[r"(?i)internal faces\s*:\s*(\d+)"]),
        Metric::new("Boundary faces", &[r"(?i)boundary faces\s*:\s*(\d+)"]),
    ]
});

static QUALITY: LazyLock<Vec<Metric>> = LazyLock::new(|| {
    vec![
        Metric::new(
            "Max non-orth",
            &[
                r"(?i)max\s+non-orthogonality\s*=\s*{num}",
                r"(?i)non-orthogonality.*max\s*[:=]\s*{num}",
                r"(?i)non-orthogonality.*max\s+{num}",
            ],
        ),
        Metric::new(
            "Avg non-orth",
            &[
                r"(?i)average\s+non-orthogonality\s*=\s*{num}",
                r"(?i)non-orthogonality.*average\s*[:=]\s*{num}",
                r"(?i)non-orthogonality.*average\s+{num}",
            ],
        ),
        Metric::new(
            "Max skewness",
            &[
                r"(?i)max\s+skewness\s*=\s*{num}",
                r"(?i)skewness.*max\s*[:=]\s*{num}",
                r"(?i)skewness.*max\s+{num}",
            ],
        ),
        Metric::new("Max boundary skew", &[r"(?i)max\s+boundary\s+skewness\s*=\s*{num}"]),
        Metric::new("Max internal skew", &[r"(?i)max\s+internal\s+skewness\s*=\s*{num}"]),
        Metric::new("Max aspect ratio", &[r"(?i)max\s+aspect\s+ratio\s*=\s*{num}"]),
        Metric::new("Max cell openness", &[r"(?i)max\s+cell\s+openness\s*=\s*{num}"]),
        Metric::new("Min volume", &[r"(?i)min\s+volume\s*=\s*{num}"]),
        Metric::new("Min detJ", &[r"(?i)min\s+determinant\s*=\s*{num}"]),
    ]
});

static FAILED_CHECKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)failed\s+(\d+)\s+mesh checks").expect("valid regex"));
static FATAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)fatal").expect("valid regex"));
static COURANT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)max\s+courant\s+number\s*=\s*{num}",
        r"(?i)courant\s+number.*max:\s*{num}",
        r"(?i)max\s+courant\s+number\s*:\s*{num}",
    ])
});

fn kv_block(rows: &[(&str, String)]) -> Vec<String> {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(label, value)| format!("  {label:<width$} : {value}"))
        .collect()
}

/// Condensed report placed above raw `checkMesh` output.
#[must_use]
pub fn format_checkmesh_summary(output: &str) -> String {
    let mesh_ok = output.to_lowercase().contains("mesh ok");
    let failed = FAILED_CHECKS
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let errors = match (&failed, mesh_ok) {
        (None, true) => "0".to_string(),
        (Some(count), _) => count.clone(),
        (None, false) => "1".to_string(),
    };
    let status = if mesh_ok && errors == "0" { "OK" } else { "FAIL" };
    let fatal = FATAL.find_iter(output).count();

    let counts: Vec<(&str, String)> = COUNTS
        .iter()
        .map(|m| (m.label, m.find(output).unwrap_or("n/a").to_string()))
        .collect();
    let quality: Vec<(&str, String)> = QUALITY
        .iter()
        .filter_map(|m| {
            let value = m.find(output)?;
            let parsed: f64 = value.parse().ok()?;
            (parsed != 0.0).then(|| (m.label, value.to_string()))
        })
        .collect();

    let mut lines = vec![
        "CHECKMESH SUMMARY".to_string(),
        String::new(),
        "Notes:".to_string(),
        format!(
            "  Status: {status} | Errors: {errors} | Fatal: {fatal} | Failed checks: {}",
            failed.as_deref().unwrap_or("0")
        ),
        String::new(),
        "Counts:".to_string(),
    ];
    lines.extend(kv_block(&counts));
    if !quality.is_empty() {
        lines.push(String::new());
        lines.push("Quality (non-zero):".to_string());
        lines.extend(kv_block(&quality));
    }
    lines.join("\n")
}

/// One-line mesh description for the case banner, e.g. `12225 cells, skew=0.32`.
#[must_use]
pub fn mesh_stats(log_text: &str) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(cells) = COUNTS[0].find(log_text) {
        parts.push(format!("{cells} cells"));
    }
    if let Some(skew) = QUALITY[2].find(log_text) {
        parts.push(format!("skew={skew}"));
    }
    if let Some(non_orth) = QUALITY[0].find(log_text) {
        parts.push(format!("nonOrth={non_orth}"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Most recent maximum Courant number printed in a solver log.
#[must_use]
pub fn last_courant(log_text: &str) -> Option<f64> {
    log_text.lines().rev().find_map(|line| {
        COURANT
            .iter()
            .find_map(|re| re.captures(line)?.get(1)?.as_str().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::{format_checkmesh_summary, last_courant, mesh_stats};

    const CHECKMESH_OK: &str = "\
Mesh stats
    points:           882
    faces:            1640
    internal faces:   760
    cells:            400
    boundary patches: 3
Checking geometry...
    Mesh non-orthogonality Max: 0 average: 0
    Max skewness = 1.2e-08 OK.
    Max aspect ratio = 1 OK.
    Minimum face area = 2.5e-05. Maximum face area = 5e-05.
    Min volume = 2.5e-07. Max volume = 2.5e-07.

Mesh OK.
";

    #[test]
    fn summary_for_healthy_mesh() {
        let summary = format_checkmesh_summary(CHECKMESH_OK);
        assert!(summary.starts_with("CHECKMESH SUMMARY"));
        assert!(summary.contains("Status: OK | Errors: 0 | Fatal: 0 | Failed checks: 0"));
        assert!(summary.contains("  Cells          : 400"));
        assert!(summary.contains("  Internal faces : 760"));
        assert!(summary.contains("  Boundary faces : n/a"));
        assert!(summary.contains("Max skewness"));
        assert!(!summary.contains("Max non-orth"));
    }

    #[test]
    fn summary_for_failed_checks() {
        let output = "cells: 10\n***Error in mesh\nFailed 2 mesh checks.\n";
        let summary = format_checkmesh_summary(output);
        assert!(summary.contains("Status: FAIL | Errors: 2 | Fatal: 0 | Failed checks: 2"));
        assert!(!summary.contains("Quality"));
    }

    #[test]
    fn banner_mesh_stats() {
        assert_eq!(
            mesh_stats(CHECKMESH_OK).as_deref(),
            Some("400 cells, skew=1.2e-08, nonOrth=0")
        );
        assert_eq!(mesh_stats("nothing useful"), None);
    }

    #[test]
    fn courant_from_latest_line() {
        let log = "\
Courant Number mean: 0.1 max: 0.5
Time = 0.01
Courant Number mean: 0.12 max: 0.85
";
        assert_eq!(last_courant(log), Some(0.85));
        assert_eq!(last_courant("Time = 0"), None);
    }
}

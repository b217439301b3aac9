//! Solver log metrics: initial residuals per field, time steps, Courant
//! numbers and execution times, plus text sparklines for the viewer.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::case::{format_g, format_significant};

static RESIDUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Solving for\s+([^,\s]+).*?Initial residual = ([0-9eE.+-]+)")
        .expect("valid residual regex")
});
static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*Time\s*=\s*([0-9eE.+-]+)\s*$").expect("valid time regex")
});
static COURANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)Courant(?:\s+Number)?(?:\s+mean)?\s*[:=]\s*[0-9eE.+-]+.*?(?:max|maximum)\s*[:=]\s*([0-9eE.+-]+)",
    )
    .expect("valid courant regex")
});
static EXECUTION_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ExecutionTime\s*=\s*([0-9eE.+-]+)\s*s").expect("valid execution time regex")
});

/// Sparkline levels, lowest first.
const LEVELS: &[u8] = b" .:-=+*#%@";

/// Fields shown first in the short residual summary.
const PREFERRED_FIELDS: [&str; 8] = ["p", "U", "Ux", "Uy", "Uz", "k", "omega", "epsilon"];

/// Plot width of the residual timeline viewer.
pub const RESIDUAL_PLOT_WIDTH: usize = 50;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogMetrics {
    /// Initial residuals in log order, keyed by field.
    pub residuals: BTreeMap<String, Vec<f64>>,
    pub times: Vec<f64>,
    /// Maximum Courant number of every step.
    pub courants: Vec<f64>,
    pub execution_times: Vec<f64>,
}

fn captured_numbers(re: &Regex, text: &str) -> Vec<f64> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect()
}

impl LogMetrics {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut residuals: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for line in text.lines() {
            let Some(caps) = RESIDUAL.captures(line) else {
                continue;
            };
            let (Some(field), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if let Ok(value) = value.as_str().parse::<f64>() {
                residuals
                    .entry(field.as_str().to_string())
                    .or_default()
                    .push(value);
            }
        }
        Self {
            residuals,
            times: captured_numbers(&TIME, text),
            courants: captured_numbers(&COURANT, text),
            execution_times: captured_numbers(&EXECUTION_TIME, text),
        }
    }
}

/// Renders `values` as `width` characters. Values spanning more than three
/// decades are plotted on a log scale; non-positive values count as 1e-16.
#[must_use]
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }
    let sample: Vec<f64> = if values.len() <= width {
        values.to_vec()
    } else {
        let step = values.len() as f64 / width as f64;
        (0..width)
            .map(|i| values[((i as f64 * step) as usize).min(values.len() - 1)])
            .collect()
    };

    let positive: Vec<f64> = sample
        .iter()
        .map(|v| if *v > 0.0 { *v } else { 1e-16 })
        .collect();
    let min = positive.iter().copied().fold(f64::INFINITY, f64::min);
    let max = positive.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let scaled: Vec<f64> = if max / min > 1e3 {
        positive.iter().map(|v| v.log10()).collect()
    } else {
        positive
    };
    let low = scaled.iter().copied().fold(f64::INFINITY, f64::min);
    let high = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = high - low;

    let top = LEVELS.len() - 1;
    scaled
        .iter()
        .map(|value| {
            let index = if span > 0.0 {
                (((value - low) / span) * top as f64).round() as usize
            } else {
                top
            };
            char::from(LEVELS[index.min(top)])
        })
        .collect()
}

fn last_min_max(values: &[f64]) -> Option<(f64, f64, f64)> {
    let last = *values.last()?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((last, min, max))
}

/// The residual timeline for a solver log, or `None` when it has no
/// residual lines.
#[must_use]
pub fn residual_timeline_report(text: &str, plot_width: usize) -> Option<String> {
    let metrics = LogMetrics::parse(text);
    if metrics.residuals.is_empty() {
        return None;
    }
    let mut lines = vec!["Residuals summary".to_string(), String::new()];
    if let Some(last) = metrics.times.last() {
        lines.push(format!(
            "Time steps: {} (last={})",
            metrics.times.len(),
            format_g(*last)
        ));
    }
    if let Some((_, _, max)) = last_min_max(&metrics.courants) {
        lines.push(format!("Max Courant: {}", format_g(max)));
    }
    if let Some(last) = metrics.execution_times.last() {
        lines.push(format!("Execution time: {} s", format_g(*last)));
    }
    if lines.len() > 2 {
        lines.push(String::new());
    }
    for (field, values) in &metrics.residuals {
        let Some((last, min, max)) = last_min_max(values) else {
            continue;
        };
        lines.push(format!(
            "{field:>8} {} last={} min={} max={}",
            sparkline(values, plot_width),
            format_significant(last, 3),
            format_significant(min, 3),
            format_significant(max, 3),
        ));
    }
    Some(lines.join("\n"))
}

/// Up to two `Res <field> <plot> last=<v>` lines for a running job,
/// pressure and velocity first.
#[must_use]
pub fn residual_spark_lines(text: &str, plot_width: usize) -> Vec<String> {
    let metrics = LogMetrics::parse(text);
    let mut fields: Vec<&str> = PREFERRED_FIELDS
        .iter()
        .copied()
        .filter(|f| metrics.residuals.contains_key(*f))
        .collect();
    fields.extend(
        metrics
            .residuals
            .keys()
            .map(String::as_str)
            .filter(|f| !PREFERRED_FIELDS.contains(f)),
    );
    fields
        .into_iter()
        .take(2)
        .filter_map(|field| {
            let values = metrics.residuals.get(field)?;
            let last = values.last()?;
            Some(format!(
                "Res {field:>6} {} last={}",
                sparkline(values, plot_width),
                format_significant(*last, 2)
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{LogMetrics, residual_spark_lines, residual_timeline_report, sparkline};

    const LOG: &str = "\
Time = 0.005

Courant Number mean: 0 max: 0
smoothSolver:  Solving for Ux, Initial residual = 1, Final residual = 8.9e-06, No Iterations 19
smoothSolver:  Solving for Uy, Initial residual = 0, Final residual = 0, No Iterations 0
DICPCG:  Solving for p, Initial residual = 1, Final residual = 0.0492, No Iterations 12
ExecutionTime = 0.01 s  ClockTime = 0 s

Time = 0.01

Courant Number mean: 0.0976 max: 0.585
smoothSolver:  Solving for Ux, Initial residual = 0.16, Final residual = 6.2e-06, No Iterations 19
DICPCG:  Solving for p, Initial residual = 0.0002, Final residual = 9e-07, No Iterations 35
ExecutionTime = 0.02 s  ClockTime = 0 s
";

    #[test]
    fn metrics_are_collected_per_field() {
        let metrics = LogMetrics::parse(LOG);
        assert_eq!(metrics.residuals["Ux"], [1.0, 0.16]);
        assert_eq!(metrics.residuals["Uy"], [0.0]);
        assert_eq!(metrics.residuals["p"], [1.0, 0.0002]);
        assert_eq!(metrics.times, [0.005, 0.01]);
        assert_eq!(metrics.courants, [0.0, 0.585]);
        assert_eq!(metrics.execution_times, [0.01, 0.02]);
    }

    #[test]
    fn sparkline_scales_and_samples() {
        assert_eq!(sparkline(&[], 10), "");
        assert_eq!(sparkline(&[1.0, 1.0], 10), "@@");
        assert_eq!(sparkline(&[1.0, 5.0, 9.0], 10), " +@");

        // Zero counts as 1e-16, which forces a log scale.
        let decades = sparkline(&[1.0, 0.0, 1e-4], 10);
        assert!(decades.starts_with('@') && decades.contains(' '), "{decades:?}");
        assert_eq!(decades.chars().count(), 3);

        let long: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(sparkline(&long, 20).chars().count(), 20);
    }

    #[test]
    fn timeline_lists_every_field_with_stats() {
        let report = residual_timeline_report(LOG, 10).expect("residuals");
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Residuals summary");
        assert!(lines.contains(&"Time steps: 2 (last=0.01)"));
        assert!(lines.contains(&"Max Courant: 0.585"));
        assert!(lines.contains(&"Execution time: 0.02 s"));
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("       p ") && l.ends_with("last=0.0002 min=0.0002 max=1")),
            "{report}"
        );
        assert!(lines.iter().any(|l| l.starts_with("      Ux ")));

        assert!(residual_timeline_report("Time = 1\n", 10).is_none());
    }

    #[test]
    fn spark_lines_prefer_pressure_and_velocity() {
        let lines = residual_spark_lines(LOG, 10);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Res      p "), "{lines:?}");
        assert!(lines[0].ends_with("last=0.0002"));
        assert!(lines[1].starts_with("Res     Ux "));
        assert!(residual_spark_lines("no residuals", 10).is_empty());
    }
}

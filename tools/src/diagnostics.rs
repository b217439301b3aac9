//! Diagnostics menu entries.

use ofti_core::{format_checkmesh_summary, tail_lines};

pub const NO_LOGS_MESSAGE: &str = "No log.* files found in case directory.";
pub const LOG_TAIL_LINES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    SystemCheck,
    InstallationTest,
    CheckMesh,
    ViewLogs,
}

impl Diagnostic {
    pub const ALL: [Self; 4] = [
        Self::SystemCheck,
        Self::InstallationTest,
        Self::CheckMesh,
        Self::ViewLogs,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SystemCheck => "foamSystemCheck",
            Self::InstallationTest => "foamInstallationTest",
            Self::CheckMesh => "checkMesh",
            Self::ViewLogs => "View logs",
        }
    }

    /// Program run for this entry; `None` for the log browser.
    #[must_use]
    pub const fn program(self) -> Option<&'static str> {
        match self {
            Self::SystemCheck => Some("foamSystemCheck"),
            Self::InstallationTest => Some("foamInstallationTest"),
            Self::CheckMesh => Some("checkMesh"),
            Self::ViewLogs => None,
        }
    }

    /// Decorates a finished run's report. `checkMesh` gets its summary on top.
    #[must_use]
    pub fn decorate(self, stdout: &str, report: String) -> String {
        match self {
            Self::CheckMesh => format!("{}\n\n{report}", format_checkmesh_summary(stdout)),
            _ => report,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogView {
    Full,
    Tail,
}

impl LogView {
    pub const ALL: [Self; 2] = [Self::Full, Self::Tail];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "View full log",
            Self::Tail => "View last 100 lines",
        }
    }

    #[must_use]
    pub fn render(self, text: &str) -> String {
        match self {
            Self::Full => text.to_string(),
            Self::Tail => tail_lines(text, LOG_TAIL_LINES),
        }
    }
}

//! The `:` command line.

pub const LIMITED_MODE_MESSAGE: &str =
    "OpenFOAM environment not found; tool commands are disabled in limited mode.";

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub palette_label: &'static str,
    pub help_label: &'static str,
    pub description: &'static str,
}

const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        palette_label: "check, syntax",
        help_label: "check",
        description: "Check dictionary syntax for the whole case",
    },
    CommandSpec {
        palette_label: "tools",
        help_label: "tools",
        description: "Open the tools menu",
    },
    CommandSpec {
        palette_label: "diag, diagnostics",
        help_label: "diag",
        description: "Open the diagnostics menu",
    },
    CommandSpec {
        palette_label: "jobs, tasks",
        help_label: "jobs",
        description: "Show background jobs",
    },
    CommandSpec {
        palette_label: "search, find",
        help_label: "search",
        description: "Search keys across the case",
    },
    CommandSpec {
        palette_label: "run, solver",
        help_label: "run",
        description: "Run the current solver",
    },
    CommandSpec {
        palette_label: "tool <name>",
        help_label: "tool <name>",
        description: "Run a tool by name",
    },
    CommandSpec {
        palette_label: "nofoam [on|off]",
        help_label: "nofoam",
        description: "Toggle limited mode",
    },
    CommandSpec {
        palette_label: "help, ?",
        help_label: "help",
        description: "Show available commands",
    },
    CommandSpec {
        palette_label: "q, quit, exit",
        help_label: "quit",
        description: "Exit ofti",
    },
];

#[must_use]
pub fn command_specs() -> &'static [CommandSpec] {
    COMMAND_SPECS
}

#[must_use]
pub fn command_help_summary() -> String {
    let labels: Vec<&str> = COMMAND_SPECS.iter().map(|spec| spec.help_label).collect();
    format!("Commands: :{}", labels.join(", :"))
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Check,
    Tools,
    Diagnostics,
    Search,
    Jobs,
    RunSolver,
    RunTool(String),
    /// `Some(true)` enters limited mode, `None` toggles.
    NoFoam(Option<bool>),
    Help,
    Usage(&'static str),
    Unknown(String),
    Empty,
}

fn parse_flag(arg: Option<&str>) -> Option<bool> {
    match arg?.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl Command {
    /// Parses `raw` (with or without the leading `:`). `is_tool` decides
    /// whether a bare word names a catalog tool.
    pub fn parse(raw: &str, is_tool: impl Fn(&str) -> bool) -> Self {
        let text = raw.trim();
        let text = text.strip_prefix(':').unwrap_or(text).trim();
        let parts: Vec<&str> = text.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Self::Empty;
        };
        let rest = parts[1..].join(" ");

        match first.to_lowercase().as_str() {
            "q" | "quit" | "exit" => Self::Quit,
            "check" | "syntax" => Self::Check,
            "tools" => Self::Tools,
            "diag" | "diagnostics" => Self::Diagnostics,
            "search" | "find" => Self::Search,
            "jobs" | "tasks" => Self::Jobs,
            "help" | "?" => Self::Help,
            "tool" if rest.is_empty() => Self::Usage("Usage: :tool <name>"),
            "tool" => Self::RunTool(rest),
            "run" | "solver" if rest.is_empty() => Self::RunSolver,
            "run" | "solver" => Self::RunTool(rest),
            "nofoam" | "no-foam" | "no_foam" => Self::NoFoam(parse_flag(parts.get(1).copied())),
            "foam" => Self::NoFoam(parse_flag(parts.get(1).copied()).map(|on| !on)),
            _ if is_tool(text) => Self::RunTool(text.to_string()),
            _ => Self::Unknown(text.to_string()),
        }
    }

    /// Commands refused while OpenFOAM is unavailable.
    #[must_use]
    pub fn blocked_in_limited_mode(&self) -> bool {
        matches!(
            self,
            Self::Check
                | Self::Tools
                | Self::Diagnostics
                | Self::Search
                | Self::RunSolver
                | Self::RunTool(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, command_help_summary};

    fn parse(raw: &str) -> Command {
        Command::parse(raw, |name| name == "blockMesh")
    }

    #[test]
    fn aliases() {
        assert_eq!(parse(":q"), Command::Quit);
        assert_eq!(parse("exit"), Command::Quit);
        assert_eq!(parse(": syntax"), Command::Check);
        assert_eq!(parse("DIAG"), Command::Diagnostics);
        assert_eq!(parse("find"), Command::Search);
        assert_eq!(parse("tasks"), Command::Jobs);
        assert_eq!(parse("?"), Command::Help);
        assert_eq!(parse("   "), Command::Empty);
    }

    #[test]
    fn tool_and_run_forms() {
        assert_eq!(parse("tool"), Command::Usage("Usage: :tool <name>"));
        assert_eq!(parse("tool clean case"), Command::RunTool("clean case".into()));
        assert_eq!(parse("run"), Command::RunSolver);
        assert_eq!(parse("run blockMesh"), Command::RunTool("blockMesh".into()));
        assert_eq!(parse("blockMesh"), Command::RunTool("blockMesh".into()));
        assert_eq!(parse("snappy"), Command::Unknown("snappy".into()));
    }

    #[test]
    fn limited_mode_toggles() {
        assert_eq!(parse("nofoam"), Command::NoFoam(None));
        assert_eq!(parse("nofoam on"), Command::NoFoam(Some(true)));
        assert_eq!(parse("no-foam off"), Command::NoFoam(Some(false)));
        assert_eq!(parse("foam on"), Command::NoFoam(Some(false)));
        assert_eq!(parse("foam maybe"), Command::NoFoam(None));
    }

    #[test]
    fn blocked_commands() {
        assert!(parse("check").blocked_in_limited_mode());
        assert!(parse("tool blockMesh").blocked_in_limited_mode());
        assert!(!parse("jobs").blocked_in_limited_mode());
        assert!(!parse("quit").blocked_in_limited_mode());
        assert!(!parse("nofoam").blocked_in_limited_mode());
    }

    #[test]
    fn help_lists_every_command() {
        let help = command_help_summary();
        assert!(help.starts_with("Commands: :check, :tools"));
        assert!(help.ends_with(":quit"));
    }
}

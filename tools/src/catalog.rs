//! The Tools menu: built-in utilities, per-case presets and prompted tools.

use std::fs;
use std::path::Path;

use ofti_utils::split_args;

use crate::ToolError;

/// Per-case tool presets, one `name: command args` per line.
pub const TOOLS_PRESET_FILE: &str = "ofti.tools";
/// Post-processing presets, listed as `[post] <name>`.
pub const POST_PRESET_FILE: &str = "ofti.postprocessing";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub argv: Vec<String>,
}

/// Parses preset lines. Blank lines and `#` comments are ignored; malformed
/// lines are skipped with a warning naming `source`.
#[must_use]
pub fn parse_presets(text: &str, source: &Path) -> Vec<Preset> {
    let mut presets = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, command)) = line.split_once(':') else {
            tracing::warn!(file = %source.display(), line = index + 1, "Preset line has no ':'");
            continue;
        };
        let (name, command) = (name.trim(), command.trim());
        if name.is_empty() || command.is_empty() {
            tracing::warn!(file = %source.display(), line = index + 1, "Preset line is incomplete");
            continue;
        }
        match split_args(command) {
            Ok(argv) => presets.push(Preset {
                name: name.to_string(),
                argv,
            }),
            Err(err) => {
                tracing::warn!(file = %source.display(), line = index + 1, "Preset skipped: {err}");
            }
        }
    }
    presets
}

/// Presets from `path`; a missing file yields none.
#[must_use]
pub fn load_presets(path: &Path) -> Vec<Preset> {
    match fs::read_to_string(path) {
        Ok(text) => parse_presets(&text, path),
        Err(_) => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanAction {
    RemoveLogs,
    TimeDirectories,
    Case,
}

impl CleanAction {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RemoveLogs => "Remove all logs",
            Self::TimeDirectories => "Clean time directories",
            Self::Case => "Clean case",
        }
    }

    /// `CleanFunctions` shell function performing the action.
    #[must_use]
    pub const fn function(self) -> &'static str {
        match self {
            Self::RemoveLogs => "cleanApplicationLogs",
            Self::TimeDirectories => "cleanTimeDirectories",
            Self::Case => "cleanCase",
        }
    }

    #[must_use]
    pub fn confirm_message(self) -> String {
        match self {
            Self::RemoveLogs => "Remove all log.* files from the case?".to_string(),
            Self::TimeDirectories => "Remove all time directories except 0?".to_string(),
            Self::Case => "Clean the case (mesh, time directories, logs)?".to_string(),
        }
    }
}

/// One input line asked before a prompted tool runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptStep {
    pub label: String,
    /// Used when the answer is blank.
    pub default: Option<String>,
}

impl PromptStep {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            default: None,
        }
    }

    fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptedTool {
    FoamJob,
    FoamEndJob,
    FoamDictionary,
    PostProcess,
    FoamCalc,
}

impl PromptedTool {
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::FoamJob => "foamJob",
            Self::FoamEndJob => "foamEndJob",
            Self::FoamDictionary => "foamDictionary",
            Self::PostProcess => "postProcess",
            Self::FoamCalc => "foamCalc",
        }
    }

    /// Questions asked in order; `latest` is the case's latest time.
    #[must_use]
    pub fn prompts(self, latest: &str) -> Vec<PromptStep> {
        match self {
            Self::FoamJob => vec![PromptStep::new("foamJob args (e.g. -parallel simpleFoam):")],
            Self::FoamEndJob => vec![PromptStep::new("foamEndJob args (e.g. -clear simpleFoam):")],
            Self::FoamDictionary => vec![
                PromptStep::new("Relative path to dictionary (default system/controlDict):")
                    .with_default("system/controlDict"),
                PromptStep::new("foamDictionary args (e.g. -entry application):"),
            ],
            Self::PostProcess => vec![
                PromptStep::new(format!(
                    "postProcess args (default -latestTime; latest time detected = {latest}):"
                ))
                .with_default("-latestTime"),
            ],
            Self::FoamCalc => vec![PromptStep::new(format!(
                "foamCalc args (e.g. components U -latestTime; latest time = {latest}):"
            ))],
        }
    }

    /// Builds argv from the answers to [`PromptedTool::prompts`], defaults
    /// already applied.
    pub fn build(self, case_dir: &Path, answers: &[String]) -> Result<Vec<String>, ToolError> {
        let answer = |index: usize| answers.get(index).map_or("", |s| s.trim());
        let mut argv = vec![self.program().to_string()];
        match self {
            Self::FoamDictionary => {
                let rel = answer(0);
                let file = case_dir.join(rel);
                if !file.is_file() {
                    return Err(ToolError::FileNotFound(file));
                }
                argv.push(file.to_string_lossy().into_owned());
                argv.extend(split_args(answer(1))?);
            }
            Self::FoamCalc => {
                let args = split_args(answer(0))?;
                if args.is_empty() {
                    return Err(ToolError::MissingArguments("foamCalc"));
                }
                argv.extend(args);
            }
            Self::FoamJob | Self::FoamEndJob | Self::PostProcess => {
                argv.extend(split_args(answer(0))?);
            }
        }
        Ok(argv)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    /// Runs `argv` in the case directory, through `RunFunctions` when available.
    Command(Vec<String>),
    Prompted(PromptedTool),
    RunScript,
    RunSolver,
    RunSolverBackground,
    /// `decomposePar` when needed, then the solver under MPI in the background.
    RunSolverParallel,
    StopJob,
    ResidualTimeline,
    CaseDoctor,
    /// Top-level keyword differences against another case.
    CompareDicts,
    Clean(CleanAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEntry {
    pub label: String,
    pub action: ToolAction,
}

impl ToolEntry {
    fn command(label: impl Into<String>, argv: &[&str]) -> Self {
        Self {
            label: label.into(),
            action: ToolAction::Command(argv.iter().map(ToString::to_string).collect()),
        }
    }

    fn action(label: &str, action: ToolAction) -> Self {
        Self {
            label: label.to_string(),
            action,
        }
    }
}

/// Tools menu rows in display order. `Back` is appended by the menu.
#[must_use]
pub fn tool_catalog(case_dir: &Path) -> Vec<ToolEntry> {
    let mut entries = vec![
        ToolEntry::command("blockMesh", &["blockMesh"]),
        ToolEntry::command("decomposePar", &["decomposePar"]),
        ToolEntry::command("reconstructPar", &["reconstructPar"]),
        ToolEntry::command("foamListTimes", &["foamListTimes"]),
    ];
    entries.extend(
        load_presets(&case_dir.join(TOOLS_PRESET_FILE))
            .into_iter()
            .map(|p| ToolEntry {
                label: p.name,
                action: ToolAction::Command(p.argv),
            }),
    );
    entries.push(ToolEntry::command("foamCheckJobs", &["foamCheckJobs"]));
    entries.push(ToolEntry::command("foamPrintJobs", &["foamPrintJobs"]));
    entries.extend(
        load_presets(&case_dir.join(POST_PRESET_FILE))
            .into_iter()
            .map(|p| ToolEntry {
                label: format!("[post] {}", p.name),
                action: ToolAction::Command(p.argv),
            }),
    );
    for tool in [PromptedTool::FoamJob, PromptedTool::FoamEndJob] {
        entries.push(ToolEntry::action(tool.program(), ToolAction::Prompted(tool)));
    }
    entries.push(ToolEntry::action("Run .sh script", ToolAction::RunScript));
    for tool in [
        PromptedTool::FoamDictionary,
        PromptedTool::PostProcess,
        PromptedTool::FoamCalc,
    ] {
        entries.push(ToolEntry::action(tool.program(), ToolAction::Prompted(tool)));
    }
    entries.push(ToolEntry::action("Run current solver", ToolAction::RunSolver));
    entries.push(ToolEntry::action(
        "Run solver in background",
        ToolAction::RunSolverBackground,
    ));
    for (label, action) in [
        ("Run solver in parallel", ToolAction::RunSolverParallel),
        ("Stop job", ToolAction::StopJob),
        ("Residual timeline", ToolAction::ResidualTimeline),
        ("Case doctor", ToolAction::CaseDoctor),
        ("Compare dictionaries", ToolAction::CompareDicts),
    ] {
        entries.push(ToolEntry::action(label, action));
    }
    for clean in [CleanAction::RemoveLogs, CleanAction::TimeDirectories, CleanAction::Case] {
        entries.push(ToolEntry::action(clean.label(), ToolAction::Clean(clean)));
    }
    entries
}

/// Lowercased name with everything but alphanumerics and `-_.:` removed.
#[must_use]
pub fn normalize_tool_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        .collect()
}

/// Finds a catalog entry by name. Post-processing presets also answer to
/// `post.<name>` and `post:<name>`.
#[must_use]
pub fn find_tool<'a>(catalog: &'a [ToolEntry], name: &str) -> Option<&'a ToolEntry> {
    let wanted = normalize_tool_name(name);
    if wanted.is_empty() {
        return None;
    }
    catalog.iter().find(|entry| {
        if let Some(post) = entry.label.strip_prefix("[post] ") {
            let post = normalize_tool_name(post);
            wanted == post || wanted == format!("post.{post}") || wanted == format!("post:{post}")
        } else {
            normalize_tool_name(&entry.label) == wanted
        }
    })
}

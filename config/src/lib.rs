//! User configuration for ofti.
//!
//! Settings come from `$OFTI_CONFIG` or `<config dir>/ofti/config.toml`, then
//! `OFTI_*` environment variables override individual fields. A missing file
//! is not an error.

mod keys;

pub use keys::{KeyAction, KeyBindings, KeySpec, Keymap};

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ofti_types::UiOptions;
use serde::Deserialize;
use thiserror::Error;

// Default value function for serde (bool::default() is false, so only true needs a fn)
pub(crate) const fn default_true() -> bool {
    true
}

const fn default_courant_limit() -> f64 {
    1.0
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// When to hand list selection to `fzf`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FzfMode {
    /// Use fzf when it is on `PATH`.
    #[default]
    Auto,
    On,
    Off,
}

impl FzfMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "on" | "1" | "true" | "yes" => Some(Self::On),
            "off" | "0" | "false" | "no" => Some(Self::Off),
            _ => None,
        }
    }

    /// Resolves the mode against fzf availability.
    #[must_use]
    pub fn enabled(self, fzf_available: bool) -> bool {
        match self {
            Self::Auto | Self::On => fzf_available,
            Self::Off => false,
        }
    }
}

/// Colours for the focused row. Names follow ratatui's colour names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub focus_fg: String,
    pub focus_bg: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            focus_fg: "black".to_string(),
            focus_bg: "cyan".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OftiConfig {
    pub fzf: FzfMode,
    /// Wrap simple tools in `runApplication` from OpenFOAM's RunFunctions.
    #[serde(default = "default_true")]
    pub use_runfunctions: bool,
    /// Use OpenFOAM's CleanFunctions for the clean actions.
    #[serde(default = "default_true")]
    pub use_cleanfunctions: bool,
    #[serde(default = "default_true")]
    pub enable_entry_cache: bool,
    /// Ask for confirmation before saving values that fail validation.
    #[serde(default = "default_true")]
    pub validate_on_save: bool,
    /// Sourced before wrapped tool runs when set.
    pub openfoam_bashrc: Option<PathBuf>,
    /// Courant numbers above this are flagged in job views.
    #[serde(default = "default_courant_limit")]
    pub courant_limit: f64,
    /// Overrides `$VISUAL`/`$EDITOR`.
    pub editor: Option<String>,
    pub ui: UiOptions,
    pub colors: ColorConfig,
    pub keys: KeyBindings,
}

impl Default for OftiConfig {
    fn default() -> Self {
        Self {
            fzf: FzfMode::default(),
            use_runfunctions: true,
            use_cleanfunctions: true,
            enable_entry_cache: true,
            validate_on_save: true,
            openfoam_bashrc: None,
            courant_limit: default_courant_limit(),
            editor: None,
            ui: UiOptions::default(),
            colors: ColorConfig::default(),
            keys: KeyBindings::default(),
        }
    }
}

impl OftiConfig {
    /// Loads the config file (if any) and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    /// Parses `path`, returning defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        toml::from_str(&content).map_err(|err| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Applies `OFTI_*` overrides read through `lookup`. Values that do not
    /// parse are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("OFTI_FZF").as_deref().and_then(FzfMode::parse) {
            self.fzf = mode;
        }
        let flags: [(&str, &mut bool); 4] = [
            ("OFTI_USE_RUNFUNCTIONS", &mut self.use_runfunctions),
            ("OFTI_USE_CLEANFUNCTIONS", &mut self.use_cleanfunctions),
            ("OFTI_ENABLE_ENTRY_CACHE", &mut self.enable_entry_cache),
            ("OFTI_VALIDATE_ON_SAVE", &mut self.validate_on_save),
        ];
        for (name, slot) in flags {
            if let Some(value) = lookup(name).as_deref().and_then(parse_flag) {
                *slot = value;
            }
        }
        if let Some(path) = lookup("OFTI_BASHRC").filter(|v| !v.trim().is_empty()) {
            self.openfoam_bashrc = Some(PathBuf::from(path));
        }
        if let Some(limit) = lookup("OFTI_COURANT_LIMIT").and_then(|v| v.trim().parse().ok()) {
            self.courant_limit = limit;
        }
    }

    #[must_use]
    pub fn keymap(&self) -> Keymap {
        self.keys.resolve()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("OFTI_CONFIG").filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("ofti").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    use super::{ConfigError, FzfMode, OftiConfig};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = OftiConfig::load_from(&dir.path().join("config.toml")).expect("load");
        assert_eq!(config.fzf, FzfMode::Auto);
        assert!(config.use_runfunctions);
        assert!(config.validate_on_save);
        assert!((config.courant_limit - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.colors.focus_bg, "cyan");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
fzf = "off"
use_runfunctions = false
courant_limit = 0.5

[ui]
ascii_only = true

[colors]
focus_bg = "yellow"

[keys]
up = ["w"]
"#,
        )
        .expect("write");

        let config = OftiConfig::load_from(&path).expect("load");
        assert_eq!(config.fzf, FzfMode::Off);
        assert!(!config.use_runfunctions);
        assert!(config.use_cleanfunctions);
        assert!(config.ui.ascii_only);
        assert_eq!(config.colors.focus_fg, "black");
        assert_eq!(config.colors.focus_bg, "yellow");
        assert_eq!(config.keys.up, vec!["w".to_string()]);
        assert_eq!(config.keys.down, vec!["j".to_string()]);
    }

    #[test]
    fn malformed_file_reports_parse_error_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "fzf = [").expect("write");

        let err = OftiConfig::load_from(&path).expect_err("parse error");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn env_overrides_apply_known_values_only() {
        let env: HashMap<&str, &str> = [
            ("OFTI_FZF", "on"),
            ("OFTI_USE_CLEANFUNCTIONS", "no"),
            ("OFTI_ENABLE_ENTRY_CACHE", "maybe"),
            ("OFTI_BASHRC", "/opt/openfoam/etc/bashrc"),
            ("OFTI_COURANT_LIMIT", "0.8"),
        ]
        .into_iter()
        .collect();

        let mut config = OftiConfig::default();
        config.apply_env_overrides(|name| env.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.fzf, FzfMode::On);
        assert!(!config.use_cleanfunctions);
        assert!(config.enable_entry_cache);
        assert_eq!(
            config.openfoam_bashrc.as_deref(),
            Some(Path::new("/opt/openfoam/etc/bashrc"))
        );
        assert!((config.courant_limit - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn fzf_mode_requires_binary() {
        assert!(FzfMode::Auto.enabled(true));
        assert!(!FzfMode::On.enabled(false));
        assert!(!FzfMode::Off.enabled(true));
    }
}

//! Configurable key bindings.
//!
//! Bindings are stored as key names in the config file and resolved once into
//! a [`Keymap`]. Arrow keys, PageUp/PageDown and Ctrl+C are fixed and handled
//! by the input layer directly.

use serde::Deserialize;

/// Actions reachable through configurable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Up,
    Down,
    Select,
    Back,
    Quit,
    Help,
    Command,
    Search,
    NextMatch,
    Top,
    Bottom,
    View,
    EditExternal,
}

/// A single key as it appears in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpec {
    Char(char),
    Enter,
    Esc,
    Tab,
}

impl KeySpec {
    /// Parses a key name: a single character, or `enter`, `esc`, `tab`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "enter" | "return" | "\n" => return Some(Self::Enter),
            "esc" | "escape" => return Some(Self::Esc),
            "tab" | "\t" => return Some(Self::Tab),
            _ => {}
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(Self::Char(c)),
            _ => None,
        }
    }

    #[must_use]
    pub fn display(self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Enter => "Enter".to_string(),
            Self::Esc => "Esc".to_string(),
            Self::Tab => "Tab".to_string(),
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Raw `[keys]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyBindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub select: Vec<String>,
    pub back: Vec<String>,
    pub quit: Vec<String>,
    pub help: Vec<String>,
    pub command: Vec<String>,
    pub search: Vec<String>,
    pub next_match: Vec<String>,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    pub view: Vec<String>,
    pub edit_external: Vec<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: names(&["k"]),
            down: names(&["j"]),
            select: names(&["l", "enter"]),
            back: names(&["h", "esc"]),
            quit: names(&["q"]),
            help: names(&["?"]),
            command: names(&[":"]),
            search: names(&["/"]),
            next_match: names(&["n"]),
            top: names(&["g"]),
            bottom: names(&["G"]),
            view: names(&["v"]),
            edit_external: names(&["o"]),
        }
    }
}

impl KeyBindings {
    fn entries(&self) -> [(KeyAction, &[String]); 13] {
        [
            (KeyAction::Up, self.up.as_slice()),
            (KeyAction::Down, self.down.as_slice()),
            (KeyAction::Select, self.select.as_slice()),
            (KeyAction::Back, self.back.as_slice()),
            (KeyAction::Quit, self.quit.as_slice()),
            (KeyAction::Help, self.help.as_slice()),
            (KeyAction::Command, self.command.as_slice()),
            (KeyAction::Search, self.search.as_slice()),
            (KeyAction::NextMatch, self.next_match.as_slice()),
            (KeyAction::Top, self.top.as_slice()),
            (KeyAction::Bottom, self.bottom.as_slice()),
            (KeyAction::View, self.view.as_slice()),
            (KeyAction::EditExternal, self.edit_external.as_slice()),
        ]
    }

    /// Resolves key names. Unknown names are logged and skipped; when a key is
    /// bound twice the first action in declaration order wins.
    #[must_use]
    pub fn resolve(&self) -> Keymap {
        let mut bindings = Vec::new();
        for (action, keys) in self.entries() {
            for name in keys {
                match KeySpec::parse(name) {
                    Some(spec) if bindings.iter().all(|(s, _)| *s != spec) => {
                        bindings.push((spec, action));
                    }
                    Some(spec) => {
                        tracing::warn!(key = %name, ?action, ?spec, "Key already bound; ignoring");
                    }
                    None => tracing::warn!(key = %name, ?action, "Unknown key name in config"),
                }
            }
        }
        Keymap { bindings }
    }
}

/// Resolved bindings used by the input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    bindings: Vec<(KeySpec, KeyAction)>,
}

impl Default for Keymap {
    fn default() -> Self {
        KeyBindings::default().resolve()
    }
}

impl Keymap {
    #[must_use]
    pub fn action_for(&self, key: KeySpec) -> Option<KeyAction> {
        self.bindings
            .iter()
            .find(|(spec, _)| *spec == key)
            .map(|(_, action)| *action)
    }

    /// First key bound to `action`, for hint text.
    #[must_use]
    pub fn first_key(&self, action: KeyAction) -> Option<KeySpec> {
        self.bindings
            .iter()
            .find(|(_, a)| *a == action)
            .map(|(spec, _)| *spec)
    }
}

//! Terminal-independent key events.

use ofti_config::{KeyAction, KeySpec, Keymap};

/// A key press as the engine sees it. The TUI translates crossterm events
/// into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    CtrlC,
    CtrlU,
    CtrlW,
}

impl Key {
    /// Configurable keys first, then the fixed fallbacks for arrows and
    /// paging keys.
    #[must_use]
    pub fn action(self, keymap: &Keymap) -> Option<KeyAction> {
        let bound = match self {
            Self::Char(c) => Some(KeySpec::Char(c)),
            Self::Enter => Some(KeySpec::Enter),
            Self::Esc => Some(KeySpec::Esc),
            Self::Tab => Some(KeySpec::Tab),
            _ => None,
        };
        if let Some(action) = bound.and_then(|spec| keymap.action_for(spec)) {
            return Some(action);
        }
        match self {
            Self::Up => Some(KeyAction::Up),
            Self::Down => Some(KeyAction::Down),
            Self::Left => Some(KeyAction::Back),
            Self::Right | Self::Enter => Some(KeyAction::Select),
            Self::Esc => Some(KeyAction::Back),
            Self::Home => Some(KeyAction::Top),
            Self::End => Some(KeyAction::Bottom),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use ofti_config::{KeyAction, Keymap};

    use super::Key;

    #[test]
    fn bindings_then_fallbacks() {
        let keymap = Keymap::default();
        assert_eq!(Key::Char('j').action(&keymap), Some(KeyAction::Down));
        assert_eq!(Key::Down.action(&keymap), Some(KeyAction::Down));
        assert_eq!(Key::Right.action(&keymap), Some(KeyAction::Select));
        assert_eq!(Key::Enter.action(&keymap), Some(KeyAction::Select));
        assert_eq!(Key::Esc.action(&keymap), Some(KeyAction::Back));
        assert_eq!(Key::Char('x').action(&keymap), None);
        assert_eq!(Key::F(1).action(&keymap), None);
    }
}

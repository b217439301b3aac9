//! Colors and glyphs for the ofti TUI.
//!
//! The standard palette is a muted dark theme; `high_contrast` swaps in the
//! terminal's basic colors. The focused row always uses the colors from the
//! `[colors]` config table.

use std::str::FromStr;

use ratatui::style::{Color, Modifier, Style};

use ofti_config::ColorConfig;
use ofti_types::UiOptions;

mod colors {
    use super::Color;

    pub const BG_DARK: Color = Color::Rgb(22, 22, 29);
    pub const BG_PANEL: Color = Color::Rgb(31, 31, 40);
    pub const BG_POPUP: Color = Color::Rgb(54, 54, 70);
    pub const BORDER: Color = Color::Rgb(84, 84, 109);

    pub const TEXT_PRIMARY: Color = Color::Rgb(220, 215, 186);
    pub const TEXT_SECONDARY: Color = Color::Rgb(200, 192, 147);
    pub const TEXT_MUTED: Color = Color::Rgb(114, 113, 105);

    pub const BLUE: Color = Color::Rgb(126, 156, 216);
    pub const CYAN: Color = Color::Rgb(127, 180, 202);
    pub const GREEN: Color = Color::Rgb(152, 187, 108);
    pub const YELLOW: Color = Color::Rgb(230, 195, 132);
    pub const ORANGE: Color = Color::Rgb(255, 160, 102);
    pub const RED: Color = Color::Rgb(255, 93, 98);
}

/// Resolved colors used by the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg_dark: Color,
    pub bg_panel: Color,
    pub bg_popup: Color,
    pub border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_muted: Color,
    pub accent: Color,
    pub key: Color,
    pub value: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub focus_fg: Color,
    pub focus_bg: Color,
}

impl Palette {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            bg_dark: colors::BG_DARK,
            bg_panel: colors::BG_PANEL,
            bg_popup: colors::BG_POPUP,
            border: colors::BORDER,
            text_primary: colors::TEXT_PRIMARY,
            text_secondary: colors::TEXT_SECONDARY,
            text_muted: colors::TEXT_MUTED,
            accent: colors::CYAN,
            key: colors::BLUE,
            value: colors::ORANGE,
            success: colors::GREEN,
            warning: colors::YELLOW,
            error: colors::RED,
            focus_fg: Color::Black,
            focus_bg: Color::Cyan,
        }
    }

    #[must_use]
    pub fn high_contrast() -> Self {
        Self {
            bg_dark: Color::Black,
            bg_panel: Color::Black,
            bg_popup: Color::Black,
            border: Color::Gray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            text_muted: Color::Gray,
            accent: Color::Cyan,
            key: Color::LightBlue,
            value: Color::Yellow,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            focus_fg: Color::Black,
            focus_bg: Color::White,
        }
    }

    /// Applies the configured focus colors. Unknown color names keep the
    /// palette's own focus colors.
    #[must_use]
    pub fn with_focus(mut self, colors: &ColorConfig) -> Self {
        if let Some(fg) = parse_color(&colors.focus_fg) {
            self.focus_fg = fg;
        }
        if let Some(bg) = parse_color(&colors.focus_bg) {
            self.focus_bg = bg;
        }
        self
    }
}

fn parse_color(name: &str) -> Option<Color> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    match Color::from_str(name) {
        Ok(color) => Some(color),
        Err(_) => {
            tracing::debug!(color = %name, "Unknown color name in config");
            None
        }
    }
}

#[must_use]
pub fn palette(options: UiOptions, colors: &ColorConfig) -> Palette {
    let base = if options.high_contrast {
        Palette::high_contrast()
    } else {
        Palette::standard()
    };
    base.with_focus(colors)
}

/// ASCII/Unicode glyphs.
#[derive(Debug, Clone, Copy)]
pub struct Glyphs {
    pub selected: &'static str,
    pub unselected: &'static str,
    pub ok: &'static str,
    pub err: &'static str,
    pub bullet: &'static str,
    pub separator: &'static str,
    pub arrow_up: &'static str,
    pub arrow_down: &'static str,
    pub track: &'static str,
    pub thumb: &'static str,
    pub spinner_frames: &'static [&'static str],
}

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_FRAMES_ASCII: &[&str] = &["|", "/", "-", "\\"];

#[must_use]
pub fn glyphs(options: UiOptions) -> Glyphs {
    if options.ascii_only {
        Glyphs {
            selected: ">> ",
            unselected: "   ",
            ok: "OK",
            err: "!!",
            bullet: "*",
            separator: "|",
            arrow_up: "^",
            arrow_down: "v",
            track: "|",
            thumb: "#",
            spinner_frames: SPINNER_FRAMES_ASCII,
        }
    } else {
        Glyphs {
            selected: ">> ",
            unselected: "   ",
            ok: "✓",
            err: "✗",
            bullet: "•",
            separator: "│",
            arrow_up: "↑",
            arrow_down: "↓",
            track: "│",
            thumb: "█",
            spinner_frames: SPINNER_FRAMES,
        }
    }
}

/// When `reduced_motion` is enabled, returns a static glyph instead of cycling.
#[must_use]
pub fn spinner_frame(tick: usize, options: UiOptions) -> &'static str {
    let frames = glyphs(options).spinner_frames;
    if options.reduced_motion {
        frames[0]
    } else {
        frames[tick % frames.len()]
    }
}

pub mod styles {
    use super::{Modifier, Palette, Style};

    #[must_use]
    pub fn focus(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.focus_fg)
            .bg(palette.focus_bg)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn title(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn label(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.key)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn mode_foam(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.bg_dark)
            .bg(palette.success)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn mode_no_foam(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.bg_dark)
            .bg(palette.warning)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint(palette: &Palette) -> Style {
        Style::default().fg(palette.text_muted)
    }

    #[must_use]
    pub fn key_highlight(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.value)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use ofti_config::ColorConfig;
    use ofti_types::UiOptions;
    use ratatui::style::Color;

    use super::{glyphs, palette, spinner_frame};

    fn options(ascii_only: bool, high_contrast: bool, reduced_motion: bool) -> UiOptions {
        UiOptions {
            ascii_only,
            high_contrast,
            reduced_motion,
        }
    }

    #[test]
    fn spinner_frame_cycles_without_reduced_motion() {
        let options = options(false, false, false);
        assert_ne!(spinner_frame(0, options), spinner_frame(1, options));
    }

    #[test]
    fn spinner_frame_static_with_reduced_motion() {
        let options = options(true, false, true);
        assert_eq!(spinner_frame(0, options), "|");
        assert_eq!(spinner_frame(7, options), "|");
    }

    #[test]
    fn ascii_glyphs_stay_ascii() {
        let g = glyphs(options(true, false, false));
        for glyph in [g.selected, g.ok, g.err, g.bullet, g.separator, g.thumb] {
            assert!(glyph.is_ascii(), "{glyph:?} is not ASCII");
        }
        assert!(g.spinner_frames.iter().all(|f| f.is_ascii()));
    }

    #[test]
    fn focus_colors_come_from_config() {
        let colors = ColorConfig {
            focus_fg: "white".to_string(),
            focus_bg: "#102030".to_string(),
        };
        let palette = palette(options(false, false, false), &colors);
        assert_eq!(palette.focus_fg, Color::White);
        assert_eq!(palette.focus_bg, Color::Rgb(0x10, 0x20, 0x30));
    }

    #[test]
    fn unknown_focus_color_keeps_the_default() {
        let colors = ColorConfig {
            focus_fg: "not-a-color".to_string(),
            focus_bg: String::new(),
        };
        let palette = palette(options(false, true, false), &colors);
        assert_eq!(palette.focus_fg, Color::Black);
        assert_eq!(palette.focus_bg, Color::White);
    }
}

//! Text cleanup for the viewer.
//!
//! Solver logs and tool output carry colour codes, progress-bar carriage
//! returns and the odd stray control byte. Dictionary files are indented with
//! tabs. [`display_lines`] turns either into plain lines that occupy exactly
//! the cells ratatui measures for them.

use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

/// Tab stop used by the viewer.
pub const TAB_WIDTH: usize = 4;

const ESC: char = '\x1b';
const BEL: char = '\x07';
/// Single-byte CSI from the C1 range.
const C1_CSI: char = '\u{9b}';

/// Where the scanner is inside an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Text,
    /// Just read ESC.
    Escape,
    /// Inside `ESC [` parameters, waiting for the final byte.
    Csi,
    /// Inside an OSC/DCS/PM/APC string, waiting for BEL or `ESC \`.
    Str,
    /// Read ESC inside a string; `\` ends it.
    StrEscape,
    /// Drop exactly one more char (charset designation such as `ESC ( B`).
    DropOne,
}

fn is_dropped_control(c: char) -> bool {
    (c.is_control() && !matches!(c, '\n' | '\t' | '\r')) || c == '\x7f'
}

/// Removes escape sequences and control characters, keeping `\n`, `\t` and
/// `\r`. Clean input is returned borrowed.
///
/// ```
/// use ofti_types::strip_control;
///
/// assert_eq!(strip_control("Time = 0.005"), "Time = 0.005");
/// assert_eq!(strip_control("\x1b[1mExecutionTime\x1b[0m"), "ExecutionTime");
/// ```
#[must_use]
pub fn strip_control(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_dropped_control) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut scan = Scan::Text;
    for c in text.chars() {
        scan = match scan {
            Scan::Text => match c {
                ESC => Scan::Escape,
                C1_CSI => Scan::Csi,
                c if is_dropped_control(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::Escape => match c {
                '[' => Scan::Csi,
                ']' | 'P' | '^' | '_' => Scan::Str,
                '(' | ')' | '*' | '+' | '#' | ' ' => Scan::DropOne,
                ESC => Scan::Escape,
                // Any other byte is a two-char command such as `ESC 7`.
                _ => Scan::Text,
            },
            Scan::Csi => match c {
                '\x40'..='\x7e' => Scan::Text,
                '\x20'..='\x3f' => Scan::Csi,
                ESC => Scan::Escape,
                // Malformed: keep printable text that follows.
                c if is_dropped_control(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::Str => match c {
                BEL => Scan::Text,
                ESC => Scan::StrEscape,
                _ => Scan::Str,
            },
            Scan::StrEscape => match c {
                '\\' => Scan::Text,
                ESC => Scan::StrEscape,
                _ => Scan::Str,
            },
            Scan::DropOne => Scan::Text,
        };
    }
    Cow::Owned(out)
}

/// Replaces tabs with spaces up to the next multiple of `width` columns.
#[must_use]
pub fn expand_tabs(line: &str, width: usize) -> Cow<'_, str> {
    if !line.contains('\t') || width == 0 {
        return Cow::Borrowed(line);
    }
    let mut out = String::with_capacity(line.len() + width);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = width - column % width;
            out.push_str(&" ".repeat(pad));
            column += pad;
        } else {
            out.push(c);
            column += c.width().unwrap_or(0);
        }
    }
    Cow::Owned(out)
}

/// Viewer lines for `text`: control sequences stripped, tabs expanded to
/// [`TAB_WIDTH`], and each line reduced to what a terminal would show after
/// its last carriage return.
#[must_use]
pub fn display_lines(text: &str) -> Vec<String> {
    strip_control(text)
        .lines()
        .map(|line| {
            let shown = line.rsplit('\r').find(|part| !part.is_empty()).unwrap_or("");
            expand_tabs(shown, TAB_WIDTH).into_owned()
        })
        .collect()
}

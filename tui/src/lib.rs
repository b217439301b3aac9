//! TUI rendering for ofti using ratatui.
//!
//! [`draw`] renders the case banner, the active screen, a status bar and a
//! key-hint line, then any modal centered on top. [`InputPump`] and
//! [`handle_events`] carry key presses back into the app.

mod input;
mod theme;

pub use input::{InputPump, handle_events, key_from_event};
pub use theme::{Glyphs, Palette, glyphs, palette, spinner_frame, styles};

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};
use unicode_width::UnicodeWidthStr;

use ofti_config::{KeyAction, Keymap};
use ofti_core::CaseMetadata;
use ofti_engine::{
    App, BrowserState, ConfirmState, DraftInput, EditorState, MenuKind, MenuScreen, MenuState,
    Modal, PickerState, PromptState, Screen, StatusKind, VIEWER_HEADER, ViewerState,
};

/// Lines taken by a bordered block around the viewer plus its header row.
const VIEWER_CHROME_ROWS: u16 = 3;
const MODAL_MAX_WIDTH: u16 = 72;
const OLD_ENTRY_MAX_LINES: usize = 6;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let options = app.config().ui;
    let palette = palette(options, &app.config().colors);
    let glyphs = glyphs(options);

    let bg_block = Block::default().style(
        Style::default()
            .bg(palette.bg_dark)
            .fg(palette.text_primary),
    );
    frame.render_widget(bg_block, frame.area());

    let banner = app
        .metadata()
        .map(CaseMetadata::banner_lines)
        .unwrap_or_default();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner.len() as u16), // Banner
            Constraint::Min(3),                      // Screen
            Constraint::Length(1),                   // Status bar
            Constraint::Length(1),                   // Key hints
        ])
        .split(frame.area());

    app.set_viewport_rows(usize::from(
        chunks[1].height.saturating_sub(VIEWER_CHROME_ROWS),
    ));
    let app = &*app;

    draw_banner(frame, &banner, chunks[0], &palette);
    match app.screen() {
        Some(Screen::Picker(picker)) => draw_picker(frame, picker, chunks[1], &palette, &glyphs),
        Some(Screen::Menu(menu)) => draw_menu_screen(frame, menu, chunks[1], &palette, &glyphs),
        Some(Screen::Browser(browser)) => {
            draw_browser(frame, browser, chunks[1], &palette, &glyphs);
        }
        Some(Screen::Editor(editor)) => draw_editor(frame, editor, chunks[1], &palette),
        Some(Screen::Viewer(viewer)) => draw_viewer(frame, viewer, chunks[1], &palette, &glyphs),
        None => {}
    }
    draw_status_bar(frame, app, chunks[2], &palette, &glyphs);
    draw_hints(frame, app, chunks[3], &palette);

    if let Some(modal) = app.modal() {
        draw_modal(frame, modal, &palette);
    }
}

fn draw_banner(frame: &mut Frame, banner: &[String], area: Rect, palette: &Palette) {
    if banner.is_empty() {
        return;
    }
    let lines: Vec<Line> = banner
        .iter()
        .map(|line| Line::from(Span::styled(line.as_str(), Style::default().fg(palette.text_secondary))))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn panel<'a>(title: &'a str, palette: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.border))
        .style(Style::default().bg(palette.bg_panel))
        .title(Span::styled(format!(" {title} "), styles::title(palette)))
}

/// First row to show so that `selected` stays inside `height` rows.
fn scroll_offset(selected: usize, height: usize) -> usize {
    if height == 0 {
        0
    } else {
        selected.saturating_sub(height - 1)
    }
}

/// Rows of a selectable list. `marks` adds an OK/problem glyph to the rows it
/// covers.
fn list_lines<'a>(
    items: &'a [String],
    selected: usize,
    height: usize,
    marks: &[bool],
    palette: &Palette,
    glyphs: &Glyphs,
) -> Vec<Line<'a>> {
    let offset = scroll_offset(selected, height);
    items
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, item)| {
            let focused = index == selected;
            let mut spans = vec![Span::raw(if focused {
                glyphs.selected
            } else {
                glyphs.unselected
            })];
            if let Some(&ok) = marks.get(index) {
                let (glyph, color) = if ok {
                    (glyphs.ok, palette.success)
                } else {
                    (glyphs.err, palette.error)
                };
                let style = if focused {
                    Style::default()
                } else {
                    Style::default().fg(color)
                };
                spans.push(Span::styled(format!("{glyph} "), style));
            }
            spans.push(Span::raw(item.as_str()));
            let line = Line::from(spans);
            if focused {
                line.style(styles::focus(palette))
            } else {
                line
            }
        })
        .collect()
}

fn draw_list(
    frame: &mut Frame,
    menu: &MenuState,
    marks: &[bool],
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let block = panel(menu.title(), palette);
    let inner = block.inner(area);
    let lines = list_lines(
        menu.items(),
        menu.selected(),
        usize::from(inner.height),
        marks,
        palette,
        glyphs,
    );
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_picker(
    frame: &mut Frame,
    picker: &PickerState,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    draw_list(frame, &picker.menu, &[], area, palette, glyphs);
}

fn draw_menu_screen(
    frame: &mut Frame,
    screen: &MenuScreen,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let marks: Vec<bool> = match &screen.kind {
        MenuKind::CheckResults(checks) => checks.iter().map(|check| check.is_ok()).collect(),
        _ => Vec::new(),
    };
    draw_list(frame, &screen.menu, &marks, area, palette, glyphs);
}

fn draw_browser(
    frame: &mut Frame,
    browser: &BrowserState,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let title = match browser.level().and_then(|level| level.prefix.as_ref()) {
        Some(prefix) => format!("{} {} {prefix}", browser.rel, glyphs.separator),
        None => browser.rel.clone(),
    };
    let block = panel(&title, palette);
    let inner = block.inner(panes[0]);
    let lines = match browser.level() {
        Some(level) if !level.keys.is_empty() => list_lines(
            &level.keys,
            level.selected,
            usize::from(inner.height),
            &[],
            palette,
            glyphs,
        ),
        _ => vec![Line::from(Span::styled(
            "(no keys)",
            Style::default().fg(palette.text_muted),
        ))],
    };
    frame.render_widget(Paragraph::new(lines).block(block), panes[0]);

    let mut preview: Vec<Line> = Vec::new();
    if let Some(key) = browser.selected_key() {
        preview.push(labelled("Key: ", key.as_str(), palette));
    }
    if let Some(meta) = &browser.preview {
        preview.push(Line::from(Span::styled("Value:", styles::label(palette))));
        preview.extend(
            meta.value
                .lines()
                .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(palette.value)))),
        );
        preview.push(Line::from(""));
        preview.extend(
            meta.info
                .iter()
                .map(|line| Line::from(line.as_str())),
        );
        if !meta.subkeys.is_empty() {
            preview.push(labelled("Sub-keys: ", &meta.subkeys.join(", "), palette));
        }
        if !meta.comments.is_empty() {
            preview.push(Line::from(""));
            preview.push(Line::from(Span::styled("Comments:", styles::label(palette))));
            preview.extend(meta.comments.iter().map(|comment| {
                Line::from(Span::styled(
                    format!("{} {comment}", glyphs.bullet),
                    Style::default()
                        .fg(palette.text_muted)
                        .add_modifier(Modifier::ITALIC),
                ))
            }));
        }
    }
    let block = panel("Preview", palette);
    frame.render_widget(
        Paragraph::new(preview)
            .block(block)
            .wrap(Wrap { trim: false }),
        panes[1],
    );
}

fn labelled<'a>(label: &'a str, value: &str, palette: &Palette) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, styles::label(palette)),
        Span::raw(value.to_string()),
    ])
}

fn draw_editor(frame: &mut Frame, editor: &EditorState, area: Rect, palette: &Palette) {
    let title = format!("Edit {}", editor.rel);
    let block = panel(&title, palette);
    let inner = block.inner(area);

    let mut lines = vec![
        labelled("Key: ", editor.key.as_str(), palette),
        Line::from(""),
        Line::from(Span::styled("Old entry:", styles::label(palette))),
    ];
    let old: Vec<&str> = editor.original.lines().collect();
    for line in old.iter().take(OLD_ENTRY_MAX_LINES) {
        lines.push(Line::from(Span::styled(
            (*line).to_string(),
            Style::default().fg(palette.value),
        )));
    }
    if old.len() > OLD_ENTRY_MAX_LINES {
        lines.push(Line::from(Span::styled(
            format!("... ({} more lines)", old.len() - OLD_ENTRY_MAX_LINES),
            Style::default().fg(palette.text_muted),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "New entry (empty to clear):",
        styles::label(palette),
    )));

    let input_row = lines.len();
    let prompt = "> ";
    let field_width = usize::from(inner.width).saturating_sub(prompt.width());
    let (visible, cursor) = editor.input.visible_window(field_width);
    lines.push(Line::from(vec![
        Span::styled(prompt, Style::default().fg(palette.accent)),
        Span::raw(visible.to_string()),
    ]));
    lines.push(Line::from(""));
    lines.push(labelled("Type: ", editor.kind.label(), palette));
    let subkeys = if editor.subkeys.is_empty() {
        "(none)".to_string()
    } else {
        editor.subkeys.join(", ")
    };
    lines.push(labelled("Sub-keys: ", &subkeys, palette));

    frame.render_widget(Paragraph::new(lines).block(block), area);

    if input_row < usize::from(inner.height) {
        frame.set_cursor_position((
            inner.x + (prompt.width() + cursor) as u16,
            inner.y + input_row as u16,
        ));
    }
}

fn draw_viewer(
    frame: &mut Frame,
    viewer: &ViewerState,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let block = panel(viewer.title(), palette);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = usize::from(inner.height.saturating_sub(1));
    let mut lines = vec![Line::from(Span::styled(
        VIEWER_HEADER,
        Style::default()
            .fg(palette.text_muted)
            .add_modifier(Modifier::ITALIC),
    ))];
    let highlight = viewer.last_search().filter(|q| !q.is_empty());
    lines.extend(viewer.visible(rows).iter().map(|line| {
        let style = match highlight {
            Some(query) if line.contains(query) => styles::key_highlight(palette),
            _ => Style::default(),
        };
        Line::from(Span::styled(line.as_str(), style))
    }));
    frame.render_widget(Paragraph::new(lines), inner);

    let total = viewer.lines().len();
    if total > rows {
        let mut state = ScrollbarState::new(total.saturating_sub(rows)).position(viewer.top());
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some(glyphs.arrow_up))
            .end_symbol(Some(glyphs.arrow_down))
            .track_symbol(Some(glyphs.track))
            .thumb_symbol(glyphs.thumb)
            .style(Style::default().fg(palette.border));
        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut state,
        );
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let (mode, mode_style) = if app.is_limited() {
        (" no-foam ", styles::mode_no_foam(palette))
    } else {
        (" foam ", styles::mode_foam(palette))
    };
    let mut spans = vec![Span::styled(mode, mode_style), Span::raw(" ")];

    if app.is_busy() {
        let spinner = spinner_frame(app.tick_count(), app.config().ui);
        spans.push(Span::styled(
            format!("{spinner} "),
            Style::default().fg(palette.accent),
        ));
    }
    match app.status() {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Error => palette.error,
                StatusKind::Info => palette.success,
            };
            spans.push(Span::styled(status.text.as_str(), Style::default().fg(color)));
        }
        None => {
            if let Some(meta) = app.metadata() {
                spans.push(Span::styled(
                    format!("{} {} {}", meta.case_name, glyphs.separator, meta.solver),
                    Style::default().fg(palette.text_secondary),
                ));
            }
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn key_name(keymap: &Keymap, action: KeyAction, fallback: &str) -> String {
    keymap
        .first_key(action)
        .map_or_else(|| fallback.to_string(), |key| key.display())
}

fn draw_hints(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let keymap = app.keymap();
    let key = |action: KeyAction, fallback: &str| key_name(keymap, action, fallback);
    let hints: Vec<(String, &str)> = match app.screen() {
        Some(Screen::Editor(_)) => vec![
            ("Enter".to_string(), "save"),
            ("Esc".to_string(), "cancel"),
            ("F1".to_string(), "foamHelp"),
        ],
        Some(Screen::Viewer(_)) => vec![
            (key(KeyAction::Search, "/"), "search"),
            (key(KeyAction::NextMatch, "n"), "next"),
            (
                format!("{}/{}", key(KeyAction::Top, "g"), key(KeyAction::Bottom, "G")),
                "top/bottom",
            ),
            (key(KeyAction::Quit, "q"), "exit"),
        ],
        Some(Screen::Browser(_)) => vec![
            (key(KeyAction::Select, "Enter"), "edit"),
            (key(KeyAction::Back, "h"), "back"),
            (key(KeyAction::View, "v"), "view file"),
            (key(KeyAction::EditExternal, "o"), "$EDITOR"),
            (key(KeyAction::Search, "/"), "search"),
            (key(KeyAction::Help, "?"), "help"),
        ],
        Some(Screen::Picker(_)) => vec![
            (key(KeyAction::Select, "Enter"), "open"),
            ("e".to_string(), "use folder"),
            (key(KeyAction::Back, "h"), "parent"),
            (key(KeyAction::Quit, "q"), "quit"),
        ],
        Some(Screen::Menu(_)) | None => vec![
            (
                format!("{}/{}", key(KeyAction::Down, "j"), key(KeyAction::Up, "k")),
                "move",
            ),
            (key(KeyAction::Select, "Enter"), "select"),
            (key(KeyAction::Back, "h"), "back"),
            (key(KeyAction::Command, ":"), "command"),
            (key(KeyAction::Quit, "q"), "quit"),
        ],
    };

    let mut spans = vec![Span::raw(" ")];
    for (index, (keys, label)) in hints.into_iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(keys, styles::key_highlight(palette)));
        spans.push(Span::styled(format!(" {label}"), styles::key_hint(palette)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ============================================================================
// Modals
// ============================================================================

/// A `width` x `height` rect centered in `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2)).max(1);
    let height = height.min(area.height.saturating_sub(2)).max(1);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn modal_block<'a>(title: &'a str, border: Color, palette: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(palette.bg_popup).fg(palette.text_primary))
        .title(Span::styled(format!(" {title} "), styles::title(palette)))
}

fn draw_modal(frame: &mut Frame, modal: &Modal, palette: &Palette) {
    match modal {
        Modal::Prompt(prompt) => draw_prompt(frame, prompt, palette),
        Modal::Confirm(confirm) => draw_confirm(frame, confirm, palette),
        Modal::Message { title, lines } => draw_message(frame, title, lines, palette),
    }
}

fn draw_prompt(frame: &mut Frame, prompt: &PromptState, palette: &Palette) {
    let area = centered(frame.area(), MODAL_MAX_WIDTH, 3);
    frame.render_widget(Clear, area);
    let block = modal_block("Input", palette.accent, palette);
    let inner = block.inner(area);

    let label = if prompt.label.ends_with(' ') || prompt.label == ":" {
        prompt.label.clone()
    } else {
        format!("{} ", prompt.label)
    };
    let (line, cursor) = input_line(&label, &prompt.input, inner.width, palette);
    frame.render_widget(Paragraph::new(line).block(block), area);
    frame.set_cursor_position((inner.x + cursor, inner.y));
}

/// The label followed by the visible part of `input`, and the cursor column.
fn input_line<'a>(label: &str, input: &DraftInput, width: u16, palette: &Palette) -> (Line<'a>, u16) {
    let label_width = label.width();
    let field = usize::from(width).saturating_sub(label_width);
    let (visible, cursor) = input.visible_window(field);
    let line = Line::from(vec![
        Span::styled(label.to_string(), Style::default().fg(palette.accent)),
        Span::raw(visible.to_string()),
    ]);
    (line, (label_width + cursor) as u16)
}

fn draw_confirm(frame: &mut Frame, confirm: &ConfirmState, palette: &Palette) {
    let width = confirm
        .lines
        .iter()
        .map(|line| line.width())
        .max()
        .unwrap_or(0) as u16
        + 4;
    let area = centered(frame.area(), width.max(30), confirm.lines.len() as u16 + 2);
    frame.render_widget(Clear, area);
    let lines: Vec<Line> = confirm.lines.iter().map(|line| Line::from(line.as_str())).collect();
    frame.render_widget(
        Paragraph::new(lines)
            .block(modal_block("Confirm", palette.warning, palette))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_message(frame: &mut Frame, title: &str, lines: &[String], palette: &Palette) {
    let widest = lines
        .iter()
        .map(|line| line.width())
        .chain([title.width() + 4])
        .max()
        .unwrap_or(0) as u16;
    let width = (widest + 4).clamp(30, MODAL_MAX_WIDTH);
    let text_width = usize::from(width.saturating_sub(4)).max(1);
    let wrapped_rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(text_width).max(1))
        .sum();
    // Borders, the blank separator and the footer.
    let area = centered(frame.area(), width, wrapped_rows as u16 + 4);
    frame.render_widget(Clear, area);
    let mut body: Vec<Line> = lines.iter().map(|line| Line::from(line.as_str())).collect();
    body.push(Line::from(""));
    body.push(Line::from(Span::styled(
        "Press any key to continue.",
        Style::default()
            .fg(palette.text_muted)
            .add_modifier(Modifier::ITALIC),
    )));
    frame.render_widget(
        Paragraph::new(body)
            .block(modal_block(title, palette.accent, palette).padding(Padding::horizontal(1)))
            .wrap(Wrap { trim: false }),
        area,
    );
}

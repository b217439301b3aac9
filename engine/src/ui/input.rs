//! Single-line text input used by the editor and prompts.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Text plus a cursor counted in grapheme clusters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DraftInput {
    text: String,
    cursor: usize,
}

impl DraftInput {
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        let mut input = Self::default();
        input.set_text(text.to_string());
        input
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = self.clamp_cursor(self.cursor.saturating_add(1));
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.grapheme_count();
    }

    pub fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index_at(self.cursor);
        self.text.insert(index, new_char);
        self.move_cursor_right();
    }

    /// Inserts pasted text; line breaks become spaces.
    pub fn enter_text(&mut self, text: &str) {
        let text = text.replace(['\r', '\n'], " ");
        if text.is_empty() {
            return;
        }
        let index = self.byte_index_at(self.cursor);
        self.text.insert_str(index, &text);
        let inserted = text.graphemes(true).count();
        self.cursor = self.clamp_cursor(self.cursor.saturating_add(inserted));
    }

    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_index_at(self.cursor - 1);
        let end = self.byte_index_at(self.cursor);
        self.text.replace_range(start..end, "");
        self.move_cursor_left();
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor >= self.grapheme_count() {
            return;
        }
        let start = self.byte_index_at(self.cursor);
        let end = self.byte_index_at(self.cursor + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn delete_word_backwards(&mut self) {
        while self.cursor > 0 && self.grapheme_is_whitespace(self.cursor - 1) {
            self.delete_char();
        }
        while self.cursor > 0 && !self.grapheme_is_whitespace(self.cursor - 1) {
            self.delete_char();
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.cursor = self.grapheme_count();
    }

    #[must_use]
    pub fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// Visible slice for a field `width` columns wide and the cursor column
    /// within it. The window scrolls so the cursor stays visible.
    #[must_use]
    pub fn visible_window(&self, width: usize) -> (&str, usize) {
        if width == 0 {
            return ("", 0);
        }
        let graphemes: Vec<&str> = self.text.graphemes(true).collect();
        let before: usize = graphemes[..self.cursor].iter().map(|g| g.width()).sum();

        // Leave one column for the cursor past the end of the text.
        let mut start = 0;
        let mut offset = before;
        while offset >= width && start < self.cursor {
            offset -= graphemes[start].width();
            start += 1;
        }

        let mut end = start;
        let mut used = 0;
        while end < graphemes.len() && used + graphemes[end].width() <= width {
            used += graphemes[end].width();
            end += 1;
        }
        let from = self.byte_index_at(start);
        let to = self.byte_index_at(end);
        (&self.text[from..to], offset)
    }

    fn grapheme_is_whitespace(&self, index: usize) -> bool {
        self.text
            .graphemes(true)
            .nth(index)
            .is_some_and(|g| g.chars().all(char::is_whitespace))
    }

    fn byte_index_at(&self, grapheme_index: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(grapheme_index)
            .map_or(self.text.len(), |(index, _)| index)
    }

    fn clamp_cursor(&self, position: usize) -> usize {
        position.min(self.grapheme_count())
    }
}

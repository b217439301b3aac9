//! Read-only scrollable text: tool reports, logs, file contents.

use ofti_types::display_lines;

pub const VIEWER_HEADER: &str = "Press 'q' to exit, '?' for help.";

pub const VIEWER_HELP: [&str; 6] = [
    "j / k or arrows : scroll",
    "PgUp / PgDn : page",
    "g / G : top / bottom",
    "q : exit viewer",
    "/ : search within file",
    "? : show this help",
];

pub const SUSPICIOUS_HEADER: &str = "Suspicious lines detected:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerState {
    title: String,
    lines: Vec<String>,
    top: usize,
    last_search: Option<String>,
}

impl ViewerState {
    /// Control sequences in `text` are stripped and tabs expanded.
    #[must_use]
    pub fn new(title: impl Into<String>, text: &str) -> Self {
        Self {
            title: title.into(),
            lines: display_lines(text),
            top: 0,
            last_search: None,
        }
    }

    /// A file view, with suspicious-line warnings above the content.
    #[must_use]
    pub fn for_file(title: impl Into<String>, text: &str, warnings: &[String]) -> Self {
        if warnings.is_empty() {
            return Self::new(title, text);
        }
        let mut content = String::from(SUSPICIOUS_HEADER);
        for warning in warnings {
            content.push_str("\n  ");
            content.push_str(warning);
        }
        content.push_str("\n\n");
        content.push_str(text);
        Self::new(title, &content)
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn top(&self) -> usize {
        self.top
    }

    #[must_use]
    pub fn last_search(&self) -> Option<&str> {
        self.last_search.as_deref()
    }

    #[must_use]
    pub fn visible(&self, rows: usize) -> &[String] {
        let end = (self.top + rows).min(self.lines.len());
        &self.lines[self.top.min(end)..end]
    }

    fn max_top(&self, rows: usize) -> usize {
        self.lines.len().saturating_sub(rows.max(1))
    }

    pub fn scroll_down(&mut self, amount: usize, rows: usize) {
        self.top = (self.top + amount).min(self.max_top(rows));
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.top = self.top.saturating_sub(amount);
    }

    pub fn scroll_to_top(&mut self) {
        self.top = 0;
    }

    pub fn scroll_to_bottom(&mut self, rows: usize) {
        self.top = self.max_top(rows);
    }

    /// Moves the top to the next line below it containing `query`, ignoring
    /// case and wrapping to the start. Returns false when nothing matches.
    pub fn search(&mut self, query: &str) -> bool {
        self.last_search = Some(query.to_string());
        let total = self.lines.len();
        let needle = query.to_lowercase();
        if needle.is_empty() || total == 0 {
            return false;
        }
        let found = (1..=total)
            .map(|step| (self.top + step) % total)
            .find(|&index| self.lines[index].to_lowercase().contains(&needle));
        match found {
            Some(index) => {
                self.top = index;
                true
            }
            None => false,
        }
    }

    /// Repeats the last search. `None` when there was none.
    pub fn repeat_search(&mut self) -> Option<bool> {
        let query = self.last_search.clone()?;
        Some(self.search(&query))
    }
}

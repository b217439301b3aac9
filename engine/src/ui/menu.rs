//! List selection shared by every menu screen.

pub const BACK_LABEL: &str = "Back";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    title: String,
    items: Vec<String>,
    selected: usize,
}

impl MenuState {
    #[must_use]
    pub fn new(title: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            title: title.into(),
            items,
            selected: 0,
        }
    }

    /// Submenu: `items` followed by `Back`.
    #[must_use]
    pub fn with_back(title: impl Into<String>, mut items: Vec<String>) -> Self {
        items.push(BACK_LABEL.to_string());
        Self::new(title, items)
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn selected_label(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }

    /// True when the trailing `Back` row of a submenu is selected.
    #[must_use]
    pub fn is_back_selected(&self) -> bool {
        self.selected + 1 == self.items.len() && self.selected_label() == Some(BACK_LABEL)
    }

    pub fn move_up(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = if self.selected == 0 {
            self.items.len() - 1
        } else {
            self.selected - 1
        };
    }

    pub fn move_down(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.items.len();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    pub fn set_selected(&mut self, index: usize) {
        self.selected = index.min(self.items.len().saturating_sub(1));
    }
}

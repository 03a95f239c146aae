use crate::ui::centered_rect;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// A single entry in the help popup.
#[derive(Debug, Clone)]
pub struct HelpEntry {
    /// The key or key combination (e.g., "Tab", "Ctrl-k").
    pub key: String,
    /// Human-readable description.
    pub description: String,
    /// Section header this entry belongs to.
    pub section: Option<String>,
}

impl HelpEntry {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            section: None,
        }
    }

    pub fn with_section(
        section: impl Into<String>,
        key: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            section: Some(section.into()),
        }
    }
}

/// The help popup state.
#[derive(Debug, Default)]
pub struct HelpPopup {
    pub visible: bool,
    title: String,
    entries: Vec<HelpEntry>,
    scroll: u16,
}

impl HelpPopup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the help popup with the given title and entries.
    pub fn show(&mut self, title: impl Into<String>, entries: Vec<HelpEntry>) {
        self.visible = true;
        self.title = title.into();
        self.entries = entries;
        self.scroll = 0;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.entries.clear();
        self.title.clear();
        self.scroll = 0;
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    /// Render the help popup centered on screen.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if !self.visible || self.entries.is_empty() {
            return;
        }

        let lines = self.build_lines();

        let popup_width = (area.width.saturating_sub(8)).min(64);
        let popup_height = (area.height.saturating_sub(4)).min(lines.len() as u16 + 2);
        let popup_area = centered_rect(popup_width, popup_height, area);

        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL);

        let max_scroll = (lines.len() as u16).saturating_sub(popup_height.saturating_sub(2));
        let scroll = self.scroll.min(max_scroll);

        let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
        frame.render_widget(paragraph, popup_area);
    }

    /// Build display lines from entries, inserting section headers.
    fn build_lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut current_section: Option<&str> = None;

        for entry in &self.entries {
            if let Some(ref section) = entry.section {
                if current_section != Some(section.as_str()) {
                    if !lines.is_empty() {
                        lines.push(Line::from(""));
                    }
                    lines.push(Line::from(Span::styled(
                        format!(" {}", section),
                        Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    )));
                    current_section = Some(section.as_str());
                }
            }

            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:>16} ", entry.key),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::raw(entry.description.clone()),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " Esc/q/F1  close    j/k  scroll",
            Style::default().add_modifier(Modifier::DIM),
        )));

        lines
    }
}

/// Returns the keybind help entries for the notepad.
pub fn notepad_help_entries() -> Vec<HelpEntry> {
    vec![
        HelpEntry::with_section("Writing", "Tab", "Accept suggestion (end of note)"),
        HelpEntry::with_section("Writing", "Ctrl-Space", "Suggest now"),
        HelpEntry::with_section("Writing", "Shift-arrows", "Select"),
        HelpEntry::with_section("Writing", "Ctrl-a", "Select all"),
        HelpEntry::with_section("Writing", "Ctrl-z / Ctrl-r", "Undo / redo"),
        HelpEntry::with_section("Writing", "Ctrl-s", "Save note"),
        HelpEntry::with_section("Quick edit", "Ctrl-k", "Edit selection / write at cursor"),
        HelpEntry::with_section("Review", "Ctrl-Enter / Ctrl-y", "Accept proposal"),
        HelpEntry::with_section("Review", "Ctrl-Bksp / Ctrl-n", "Reject proposal"),
        HelpEntry::with_section("Composer", "Ctrl-i / Ctrl-l", "Open composer with selection"),
        HelpEntry::with_section("Composer", "Enter", "Send message"),
        HelpEntry::with_section("Composer", "Tab", "Toggle agent / chat mode"),
        HelpEntry::with_section("Composer", "Ctrl-t", "New chat"),
        HelpEntry::with_section("Composer", "Ctrl-w", "Close tab"),
        HelpEntry::with_section("Composer", "Alt-Left/Right", "Switch tab"),
        HelpEntry::with_section("Composer", "Ctrl-e", "Rename chat"),
        HelpEntry::with_section("Composer", "Ctrl-x", "Drop attached context"),
        HelpEntry::with_section("Composer", "Ctrl-o", "Chat history"),
        HelpEntry::with_section("History", "Enter", "Open chat"),
        HelpEntry::with_section("History", "Ctrl-d", "Delete chat"),
        HelpEntry::with_section("History", "Ctrl-x", "Delete all chats"),
        HelpEntry::with_section("Other", "Esc", "Cancel / close"),
        HelpEntry::with_section("Other", "F1", "This help"),
        HelpEntry::with_section("Other", "Ctrl-q", "Quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_are_grouped() {
        let mut popup = HelpPopup::new();
        popup.show("Help", notepad_help_entries());
        let lines = popup.build_lines();
        let headers = lines
            .iter()
            .filter(|l| {
                l.spans
                    .first()
                    .is_some_and(|s| s.style.add_modifier.contains(Modifier::UNDERLINED))
            })
            .count();
        assert_eq!(headers, 6);
    }

    #[test]
    fn test_hide_resets_scroll() {
        let mut popup = HelpPopup::new();
        popup.show("Help", notepad_help_entries());
        popup.scroll_down();
        popup.hide();
        assert!(!popup.visible);
        assert_eq!(popup.scroll, 0);
    }
}

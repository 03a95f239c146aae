use crossterm::event::KeyEvent;
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::line_input::LineInput;

/// A single selectable row in the picker.
#[derive(Debug, Clone)]
pub struct PickerItem {
    /// Display text for the item.
    pub label: String,
    /// Secondary text shown dimmed after the label.
    pub description: String,
    /// Identifier passed back when selected.
    pub id: String,
    /// Group header this item is listed under (e.g. "Today").
    pub section: String,
}

/// Search overlay listing items grouped by section.
///
/// The picker does not filter by itself: the owner re-queries its data
/// whenever [`HistoryPicker::handle_query_key`] reports a query change and
/// hands the results back through [`HistoryPicker::set_items`].
#[derive(Debug, Default)]
pub struct HistoryPicker {
    pub visible: bool,
    pub query: LineInput,
    items: Vec<PickerItem>,
    selected: usize,
    title: String,
}

impl HistoryPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the picker with a given title and items.
    pub fn open(&mut self, title: impl Into<String>, items: Vec<PickerItem>) {
        self.visible = true;
        self.title = title.into();
        self.query.clear();
        self.selected = 0;
        self.items = items;
    }

    /// Close and reset the picker.
    pub fn close(&mut self) {
        self.visible = false;
        self.query.clear();
        self.items.clear();
        self.selected = 0;
    }

    /// Replace the listed items, keeping the selection in bounds.
    pub fn set_items(&mut self, items: Vec<PickerItem>) {
        self.items = items;
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
    }

    pub fn items(&self) -> &[PickerItem] {
        &self.items
    }

    /// Forward a key to the query input. Returns true if the query changed.
    pub fn handle_query_key(&mut self, key: KeyEvent) -> bool {
        let before = self.query.text().to_string();
        self.query.handle_key(key);
        if self.query.text() != before {
            self.selected = 0;
            return true;
        }
        false
    }

    /// Move selection down, wrapping around.
    pub fn move_down(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.items.len();
    }

    /// Move selection up, wrapping around.
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

    /// Get the currently selected item's id, if any.
    pub fn selected_id(&self) -> Option<&str> {
        self.items.get(self.selected).map(|item| item.id.as_str())
    }

    /// Render the picker overlay.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if !self.visible {
            return;
        }

        // Size: 60% width, 60% height, centered
        let popup_width = (area.width * 60 / 100)
            .max(40)
            .min(area.width.saturating_sub(4));
        let popup_height = (area.height * 60 / 100)
            .max(10)
            .min(area.height.saturating_sub(4));

        let vertical = Layout::vertical([Constraint::Length(popup_height)]).flex(Flex::Center);
        let horizontal = Layout::horizontal([Constraint::Length(popup_width)]).flex(Flex::Center);
        let [popup_area] = vertical.areas(area);
        let [popup_area] = horizontal.areas(popup_area);

        frame.render_widget(Clear, popup_area);

        let [input_area, results_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).areas(popup_area);

        let input_block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL);
        let input_text = Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(self.query.text()),
        ]))
        .block(input_block);
        frame.render_widget(input_text, input_area);

        frame.set_cursor_position((
            input_area.x + 2 + self.query.cursor() as u16 + 1, // +1 for border, +2 for "> "
            input_area.y + 1,
        ));

        let (rows, selected_row) = self.build_rows();
        let mut list_state = ListState::default();
        list_state.select(selected_row);

        let results_block =
            Block::default().borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM);
        let results = List::new(rows)
            .block(results_block)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
            .highlight_symbol("> ");

        frame.render_stateful_widget(results, results_area, &mut list_state);
    }

    /// Build list rows with section headers. Returns the rows and the row
    /// index of the selected item.
    fn build_rows(&self) -> (Vec<ListItem<'static>>, Option<usize>) {
        let mut rows = Vec::new();
        let mut selected_row = None;
        let mut current_section: Option<&str> = None;

        if self.items.is_empty() {
            rows.push(ListItem::new(Line::from(Span::styled(
                "No chats found",
                Style::default().add_modifier(Modifier::DIM),
            ))));
            return (rows, None);
        }

        for (idx, item) in self.items.iter().enumerate() {
            if current_section != Some(item.section.as_str()) {
                rows.push(ListItem::new(Line::from(Span::styled(
                    item.section.clone(),
                    Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                ))));
                current_section = Some(item.section.as_str());
            }
            if idx == self.selected {
                selected_row = Some(rows.len());
            }
            let line = if item.description.is_empty() {
                Line::from(Span::raw(format!("  {}", item.label)))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("  {}", item.label),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}", item.description),
                        Style::default().add_modifier(Modifier::DIM),
                    ),
                ])
            };
            rows.push(ListItem::new(line));
        }

        (rows, selected_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn item(id: &str, section: &str) -> PickerItem {
        PickerItem {
            label: id.to_string(),
            description: String::new(),
            id: id.to_string(),
            section: section.to_string(),
        }
    }

    #[test]
    fn test_navigation_wraps() {
        let mut picker = HistoryPicker::new();
        picker.open("History", vec![item("a", "Today"), item("b", "Older")]);
        assert_eq!(picker.selected_id(), Some("a"));
        picker.move_down();
        assert_eq!(picker.selected_id(), Some("b"));
        picker.move_down();
        assert_eq!(picker.selected_id(), Some("a"));
        picker.move_up();
        assert_eq!(picker.selected_id(), Some("b"));
    }

    #[test]
    fn test_rows_include_section_headers() {
        let mut picker = HistoryPicker::new();
        picker.open(
            "History",
            vec![item("a", "Today"), item("b", "Today"), item("c", "Older")],
        );
        picker.move_down();
        picker.move_down();
        let (rows, selected) = picker.build_rows();
        // Today, a, b, Older, c
        assert_eq!(rows.len(), 5);
        assert_eq!(selected, Some(4));
    }

    #[test]
    fn test_query_change_resets_selection() {
        let mut picker = HistoryPicker::new();
        picker.open("History", vec![item("a", "Today"), item("b", "Today")]);
        picker.move_down();
        let changed =
            picker.handle_query_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(changed);
        assert_eq!(picker.selected_id(), Some("a"));
    }

    #[test]
    fn test_set_items_clamps_selection() {
        let mut picker = HistoryPicker::new();
        picker.open("History", vec![item("a", "Today"), item("b", "Today")]);
        picker.move_down();
        picker.set_items(vec![item("a", "Today")]);
        assert_eq!(picker.selected_id(), Some("a"));
        picker.set_items(Vec::new());
        assert_eq!(picker.selected_id(), None);
    }
}

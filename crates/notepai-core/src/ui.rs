use crate::keybinds::InputMode;
use crate::line_input::LineInput;
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
};
use unicode_width::UnicodeWidthStr;

/// Render a tab bar. `active` is the index of the highlighted tab.
pub fn render_tab_bar(frame: &mut Frame, area: Rect, titles: &[&str], active: Option<usize>) {
    let titles: Vec<Line> = titles.iter().map(|t| Line::from(*t)).collect();

    let tabs = Tabs::new(titles)
        .select(active)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
        .style(Style::default().add_modifier(Modifier::DIM))
        .divider(Span::raw(" | "));

    frame.render_widget(tabs, area);
}

/// Render the bottom status bar showing the current mode and optional info.
pub fn render_status_bar(frame: &mut Frame, area: Rect, mode: InputMode, title: &str, info: &str) {
    let mode_style = match mode {
        InputMode::Review => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        _ => Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {} ", mode.label()), mode_style),
        Span::raw(" "),
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(info, Style::default().add_modifier(Modifier::DIM)),
    ]);

    let bar = Paragraph::new(line).style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(bar, area);
}

/// Render a single-line input with a prefix, placing the terminal cursor
/// when focused.
pub fn render_input_line(
    frame: &mut Frame,
    area: Rect,
    prefix: &str,
    input: &LineInput,
    placeholder: &str,
    focused: bool,
) {
    let body = if input.text().is_empty() {
        Span::styled(placeholder, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(input.text())
    };
    let line = Line::from(vec![
        Span::styled(prefix, Style::default().add_modifier(Modifier::BOLD)),
        body,
    ]);
    frame.render_widget(Paragraph::new(line), area);

    if focused {
        let x = area.x + prefix.width() as u16 + input.text()[..input.cursor()].width() as u16;
        if x < area.x + area.width {
            frame.set_cursor_position((x, area.y));
        }
    }
}

/// Standard layout: main content + status bar (1 line).
/// Returns (content_area, status_area).
pub fn standard_layout(area: Rect) -> (Rect, Rect) {
    let [content_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);
    (content_area, status_area)
}

/// Create a bordered block for a panel, bright when focused.
pub fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let border_color = if focused { Color::White } else { Color::DarkGray };
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
}

/// Helper to create a centered rect within a given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Length(width)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

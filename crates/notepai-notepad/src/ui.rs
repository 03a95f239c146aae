use notepai_core::keybinds::InputMode;
use notepai_core::ui::{
    centered_rect, panel_block, render_input_line, render_status_bar, render_tab_bar,
    standard_layout,
};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::Notepad;
use crate::review::Proposal;
use crate::sessions::{ChangeOutcome, ChatMessage, Role};

/// Share of the width given to the note when the composer is open.
const EDITOR_PERCENT: u16 = 60;

// ── Main entry point ─────────────────────────────────────────────────

pub fn render_notepad(frame: &mut Frame, area: Rect, notepad: &mut Notepad) {
    let (content_area, status_area) = standard_layout(area);
    let mode = notepad.input_mode();

    let editor_area = if notepad.composer.visible {
        let [editor_area, composer_area] = Layout::horizontal([
            Constraint::Percentage(EDITOR_PERCENT),
            Constraint::Percentage(100 - EDITOR_PERCENT),
        ])
        .areas(content_area);
        render_composer(frame, composer_area, notepad, mode == InputMode::Composer);
        editor_area
    } else {
        content_area
    };

    render_editor(frame, editor_area, notepad, mode);

    if let Some(proposal) = notepad.review.pending() {
        render_review(frame, editor_area, proposal);
    } else if notepad.quick_edit.is_some() {
        render_quick_edit(frame, editor_area, notepad);
    }

    render_status_bar(frame, status_area, mode, "NotePAI", &status_info(notepad));

    notepad.help.render(frame, area);
    notepad.picker.render(frame, area);
}

fn status_info(notepad: &Notepad) -> String {
    let mut parts = Vec::new();
    if let Some(status) = &notepad.status {
        parts.push(status.clone());
    }
    if notepad.completion.is_loading() {
        parts.push("suggesting...".to_string());
    }
    if notepad.composer.is_loading() {
        parts.push("thinking...".to_string());
    }
    parts.push(format!("{} chars", notepad.text().chars().count()));
    parts.push("F1 help".to_string());
    parts.join("  |  ")
}

// ── Editor ───────────────────────────────────────────────────────────

fn render_editor(frame: &mut Frame, area: Rect, notepad: &mut Notepad, mode: InputMode) {
    let dirty = if notepad.is_dirty() { " [+]" } else { "" };
    let title = format!("Note{dirty}");
    let focused = matches!(mode, InputMode::Edit | InputMode::Review);

    let block = panel_block(&title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let ghost = notepad.visible_suggestion().map(str::to_string);
    notepad
        .editor
        .render(frame, inner, mode == InputMode::Edit, ghost.as_deref());
}

// ── Quick edit ───────────────────────────────────────────────────────

fn render_quick_edit(frame: &mut Frame, area: Rect, notepad: &Notepad) {
    let Some(prompt) = notepad.quick_edit.as_ref() else {
        return;
    };

    let width = area.width.saturating_sub(4).min(70);
    let popup = centered_rect(width, 4, area);
    frame.render_widget(Clear, popup);

    let title = if prompt.is_generating() {
        "Generate at cursor"
    } else {
        "Edit selection"
    };
    let block = panel_block(title, true);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [input_area, hint_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(inner);

    render_input_line(
        frame,
        input_area,
        "> ",
        &prompt.input,
        "Describe the change...",
        !prompt.is_loading(),
    );

    let hint = if prompt.is_loading() {
        Span::styled("Generating...", Style::default().fg(Color::Yellow))
    } else if let Some(notice) = &prompt.notice {
        Span::styled(notice.as_str(), Style::default().fg(Color::Red))
    } else {
        Span::styled(
            "Enter submit  Esc cancel",
            Style::default().add_modifier(Modifier::DIM),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(hint)), hint_area);
}

// ── Review ───────────────────────────────────────────────────────────

/// One line of a proposal diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Removed(&'a str),
    Added(&'a str),
}

/// Line diff that drops the shared leading and trailing lines and shows the
/// changed middle as removals followed by additions.
pub fn diff_lines<'a>(original: &'a str, proposed: &'a str) -> Vec<DiffLine<'a>> {
    let old: Vec<&str> = original.lines().collect();
    let new: Vec<&str> = proposed.lines().collect();

    let prefix = old
        .iter()
        .zip(&new)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let removed = old[prefix..old.len() - suffix].iter().copied().map(DiffLine::Removed);
    let added = new[prefix..new.len() - suffix].iter().copied().map(DiffLine::Added);
    removed.chain(added).collect()
}

fn render_review(frame: &mut Frame, area: Rect, proposal: &Proposal) {
    let diff = diff_lines(proposal.original(), proposal.proposed());

    let mut lines: Vec<Line> = diff
        .iter()
        .map(|d| match d {
            DiffLine::Removed(l) => Line::from(Span::styled(
                format!("- {l}"),
                Style::default().fg(Color::Red),
            )),
            DiffLine::Added(l) => Line::from(Span::styled(
                format!("+ {l}"),
                Style::default().fg(Color::Green),
            )),
        })
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "(whitespace only)",
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Ctrl-Enter accept  Ctrl-Bksp reject",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let width = area.width.saturating_sub(4);
    let max_height = (area.height * 70 / 100).max(6);
    let height = (lines.len() as u16 + 2).min(max_height).min(area.height);
    let popup = centered_rect(width, height, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(format!(" Review {} ", proposal.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup,
    );
}

// ── Composer ─────────────────────────────────────────────────────────

fn render_composer(frame: &mut Frame, area: Rect, notepad: &Notepad, focused: bool) {
    let composer = &notepad.composer;
    let block = panel_block("Composer", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let context_height = if composer.contexts().is_empty() { 0 } else { 1 };
    let [tabs_area, transcript_area, context_area, mode_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(context_height),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let store = &notepad.store;
    let titles: Vec<&str> = store
        .open_tabs()
        .iter()
        .filter_map(|id| store.get(id))
        .map(|s| s.title.as_str())
        .collect();
    render_tab_bar(frame, tabs_area, &titles, store.current_tab_index());

    let thinking = composer
        .in_flight()
        .is_some_and(|t| store.current_id() == Some(t.session_id.as_str()));
    let messages = store.current().map(|s| s.messages.as_slice()).unwrap_or(&[]);
    render_transcript(frame, transcript_area, messages, thinking, composer.scroll);

    if context_height > 0 {
        let chips: Vec<Span> = composer
            .contexts()
            .iter()
            .map(|c| {
                Span::styled(
                    format!("[{}] ", chip_label(c)),
                    Style::default().fg(Color::Cyan),
                )
            })
            .collect();
        frame.render_widget(Paragraph::new(Line::from(chips)), context_area);
    }

    let mode_line = Line::from(vec![
        Span::styled(
            composer.mode.label(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled("  Tab switch", Style::default().add_modifier(Modifier::DIM)),
    ]);
    frame.render_widget(Paragraph::new(mode_line), mode_area);

    match &composer.renaming {
        Some(input) => render_input_line(frame, input_area, "Rename: ", input, "", focused),
        None => render_input_line(
            frame,
            input_area,
            "> ",
            &composer.input,
            "Ask about your note...",
            focused && !composer.is_loading(),
        ),
    }
}

fn chip_label(context: &str) -> String {
    let first = context.lines().next().unwrap_or_default().trim();
    if first.chars().count() > 20 {
        let cut: String = first.chars().take(20).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

fn render_transcript(
    frame: &mut Frame,
    area: Rect,
    messages: &[ChatMessage],
    thinking: bool,
    scroll_up: u16,
) {
    let width = area.width.max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();

    for message in messages {
        let (name, color) = match message.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("AI", Color::Magenta),
        };
        lines.push(Line::from(Span::styled(
            name,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for context in &message.contexts {
            lines.push(Line::from(Span::styled(
                format!("  > {}", chip_label(context)),
                Style::default().add_modifier(Modifier::DIM),
            )));
        }
        for row in wrap(&message.content, width) {
            lines.push(Line::from(row));
        }
        if let Some(changes) = &message.changes {
            let (marker, style) = match changes.outcome {
                None => ("[edit proposed]", Style::default().fg(Color::Yellow)),
                Some(ChangeOutcome::Accepted) => ("[edit accepted]", Style::default().fg(Color::Green)),
                Some(ChangeOutcome::Rejected) => ("[edit rejected]", Style::default().fg(Color::Red)),
            };
            lines.push(Line::from(Span::styled(marker, style)));
        }
        lines.push(Line::from(""));
    }

    if thinking {
        lines.push(Line::from(Span::styled(
            "Thinking...",
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        )));
    }

    // Pinned to the bottom unless scrolled up
    let visible = area.height as usize;
    let bottom = lines.len().saturating_sub(visible);
    let offset = bottom.saturating_sub(scroll_up as usize);
    frame.render_widget(Paragraph::new(lines).scroll((offset as u16, 0)), area);
}

/// Hard-wrap text to `width` display columns, breaking at spaces when a
/// word fits on the next row.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let mut row = String::new();
        let mut row_width = 0;
        for word in line.split_inclusive(' ') {
            let word_width: usize = word.chars().map(|c| c.width().unwrap_or(0)).sum();
            if row_width + word_width > width && row_width > 0 {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            for c in word.chars() {
                let w = c.width().unwrap_or(0);
                if row_width + w > width && row_width > 0 {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(c);
                row_width += w;
            }
        }
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_strips_shared_lines() {
        let diff = diff_lines("a\nb\nc\nd", "a\nB\nc\nd");
        assert_eq!(diff, vec![DiffLine::Removed("b"), DiffLine::Added("B")]);
    }

    #[test]
    fn test_diff_pure_insertion() {
        let diff = diff_lines("", "hello\nworld");
        assert_eq!(diff, vec![DiffLine::Added("hello"), DiffLine::Added("world")]);

        let diff = diff_lines("top\nbottom", "top\nmiddle\nbottom");
        assert_eq!(diff, vec![DiffLine::Added("middle")]);
    }

    #[test]
    fn test_diff_identical_is_empty() {
        assert!(diff_lines("same\ntext", "same\ntext").is_empty());
    }

    #[test]
    fn test_wrap_breaks_at_spaces() {
        assert_eq!(wrap("the quick brown fox", 10), vec!["the quick ", "brown fox"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
    }

    #[test]
    fn test_chip_label_truncates() {
        assert_eq!(chip_label("short"), "short");
        assert_eq!(
            chip_label("a long first line that keeps going\nsecond"),
            "a long first line th..."
        );
    }
}

pub mod document;
pub mod history;

use document::Document;
use history::History;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

// ── Edit commands ────────────────────────────────────────────────────

/// A plain editing command, produced by key dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    Insert(char),
    InsertStr(String),
    Newline,
    Backspace,
    Delete,
    Left { extend: bool },
    Right { extend: bool },
    Up { extend: bool },
    Down { extend: bool },
    WordLeft { extend: bool },
    WordRight { extend: bool },
    Home { extend: bool },
    End { extend: bool },
    Top { extend: bool },
    Bottom { extend: bool },
    SelectAll,
    Undo,
    Redo,
}

/// What an edit command did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Nothing changed.
    None,
    /// Only the cursor or selection moved.
    Moved,
    /// The text changed.
    Edited,
}

// ── TextEditor ───────────────────────────────────────────────────────

/// The plain text editing surface: a document, its undo history and the
/// scroll state used when rendering.
pub struct TextEditor {
    pub document: Document,
    history: History,
    scroll: usize,
}

impl Default for TextEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEditor {
    pub fn new() -> Self {
        Self {
            document: Document::new(),
            history: History::new(200),
            scroll: 0,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut editor = Self::new();
        editor.document.set_text(text);
        editor
    }

    pub fn text(&self) -> &str {
        self.document.text()
    }

    /// Load new content, discarding history.
    pub fn set_text(&mut self, text: &str) {
        self.document.set_text(text);
        self.history.clear();
        self.scroll = 0;
    }

    pub fn is_dirty(&self) -> bool {
        self.document.dirty
    }

    pub fn mark_clean(&mut self) {
        self.document.dirty = false;
    }

    /// Record the current state as an undo point before an external
    /// mutation (e.g. accepting a proposal).
    pub fn checkpoint(&mut self) {
        let snapshot = self.document.snapshot();
        self.history.record(snapshot);
    }

    /// Apply an edit command to the document.
    pub fn apply(&mut self, cmd: EditCommand) -> EditOutcome {
        let doc = &mut self.document;
        match cmd {
            EditCommand::Insert(c) => {
                self.history.record_typing(doc.snapshot(), c);
                doc.insert_char(c);
                EditOutcome::Edited
            }
            EditCommand::InsertStr(s) => {
                self.history.record(doc.snapshot());
                doc.insert_str(&s);
                EditOutcome::Edited
            }
            EditCommand::Newline => {
                self.history.record(doc.snapshot());
                doc.insert_newline();
                EditOutcome::Edited
            }
            EditCommand::Backspace => {
                let snapshot = doc.snapshot();
                if doc.backspace() {
                    self.history.record(snapshot);
                    EditOutcome::Edited
                } else {
                    EditOutcome::None
                }
            }
            EditCommand::Delete => {
                let snapshot = doc.snapshot();
                if doc.delete_forward() {
                    self.history.record(snapshot);
                    EditOutcome::Edited
                } else {
                    EditOutcome::None
                }
            }
            EditCommand::Undo => {
                let current = doc.snapshot();
                match self.history.undo(current) {
                    Some(snapshot) => {
                        doc.restore(&snapshot);
                        EditOutcome::Edited
                    }
                    None => EditOutcome::None,
                }
            }
            EditCommand::Redo => {
                let current = doc.snapshot();
                match self.history.redo(current) {
                    Some(snapshot) => {
                        doc.restore(&snapshot);
                        EditOutcome::Edited
                    }
                    None => EditOutcome::None,
                }
            }
            motion => {
                self.history.break_coalescing();
                match motion {
                    EditCommand::Left { extend } => doc.cursor_left(extend),
                    EditCommand::Right { extend } => doc.cursor_right(extend),
                    EditCommand::Up { extend } => doc.cursor_up(extend),
                    EditCommand::Down { extend } => doc.cursor_down(extend),
                    EditCommand::WordLeft { extend } => doc.word_left(extend),
                    EditCommand::WordRight { extend } => doc.word_right(extend),
                    EditCommand::Home { extend } => doc.cursor_home(extend),
                    EditCommand::End { extend } => doc.cursor_end(extend),
                    EditCommand::Top { extend } => doc.goto_top(extend),
                    EditCommand::Bottom { extend } => doc.goto_bottom(extend),
                    EditCommand::SelectAll => doc.select_all(),
                    _ => {}
                }
                EditOutcome::Moved
            }
        }
    }

    /// Apply an external replacement of `range` as a single undoable step.
    pub fn splice(&mut self, range: std::ops::Range<usize>, replacement: &str) {
        self.checkpoint();
        self.document.replace_range(range, replacement);
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// Render the document with an optional dimmed ghost suggestion drawn
    /// after the cursor.
    pub fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool, ghost: Option<&str>) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let doc = &self.document;
        let max_line_num = doc.line_count();
        let gutter_width: u16 = format!("{}", max_line_num).len() as u16 + 2;
        let text_area = Rect {
            x: area.x + gutter_width,
            width: area.width.saturating_sub(gutter_width),
            ..area
        };
        let gutter_area = Rect {
            width: gutter_width,
            ..area
        };

        let visible_lines = area.height as usize;
        let (cursor_row, cursor_col) = doc.offset_to_pos(doc.cursor());

        // Keep cursor in view
        if cursor_row < self.scroll {
            self.scroll = cursor_row;
        } else if cursor_row >= self.scroll + visible_lines {
            self.scroll = cursor_row + 1 - visible_lines;
        }
        let scroll = self.scroll;

        let selection = doc.selection();
        let normal_style = Style::default().fg(Color::White);
        let selected_style = Style::default()
            .bg(Color::Rgb(68, 68, 120))
            .fg(Color::White);
        let ghost_style = Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC);

        let mut gutter_lines: Vec<Line> = Vec::new();
        let mut text_lines: Vec<Line> = Vec::new();

        let mut line_offset = 0;
        for (row, line_text) in doc.text().split('\n').enumerate() {
            let line_start = line_offset;
            line_offset += line_text.len() + 1;
            if row < scroll {
                continue;
            }
            if row >= scroll + visible_lines {
                break;
            }

            let gutter_style = if row == cursor_row && focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            gutter_lines.push(Line::from(Span::styled(
                format!("{:>width$} ", row + 1, width = gutter_width as usize - 2),
                gutter_style,
            )));

            let mut spans = match &selection {
                Some(sel) => split_selection(line_text, line_start, sel, normal_style, selected_style),
                None => vec![Span::styled(line_text.to_string(), normal_style)],
            };

            if row == cursor_row {
                if let Some(ghost) = ghost {
                    // Only the first ghost line fits on the cursor line
                    let first = ghost.split('\n').next().unwrap_or("");
                    spans.push(Span::styled(first.to_string(), ghost_style));
                }
            }
            text_lines.push(Line::from(spans));
        }

        // Remaining ghost lines continue below the cursor line
        if let Some(ghost) = ghost {
            for extra in ghost.split('\n').skip(1) {
                if text_lines.len() >= visible_lines {
                    break;
                }
                gutter_lines.push(Line::from(""));
                text_lines.push(Line::from(Span::styled(extra.to_string(), ghost_style)));
            }
        }

        // Fill remaining lines with ~
        while text_lines.len() < visible_lines {
            gutter_lines.push(Line::from(Span::styled(
                format!("{:>width$} ", "~", width = gutter_width as usize - 2),
                Style::default().fg(Color::DarkGray),
            )));
            text_lines.push(Line::from(""));
        }

        frame.render_widget(Paragraph::new(gutter_lines), gutter_area);
        frame.render_widget(Paragraph::new(text_lines), text_area);

        if focused {
            let line_start = doc.line_start(doc.cursor());
            let prefix = &doc.text()[line_start..line_start + cursor_col];
            let cursor_x = text_area.x + prefix.width() as u16;
            let cursor_y = text_area.y + (cursor_row - scroll) as u16;
            if cursor_x < text_area.x + text_area.width && cursor_y < text_area.y + text_area.height
            {
                frame.set_cursor_position((cursor_x, cursor_y));
            }
        }
    }
}

/// Split one line into spans, highlighting the part inside `selection`.
fn split_selection(
    line_text: &str,
    line_start: usize,
    selection: &std::ops::Range<usize>,
    normal_style: Style,
    selected_style: Style,
) -> Vec<Span<'static>> {
    let line_end = line_start + line_text.len();
    if selection.end <= line_start || selection.start > line_end {
        return vec![Span::styled(line_text.to_string(), normal_style)];
    }

    let start = selection.start.saturating_sub(line_start).min(line_text.len());
    let end = selection.end.saturating_sub(line_start).min(line_text.len());

    let mut spans = Vec::new();
    if start > 0 {
        spans.push(Span::styled(line_text[..start].to_string(), normal_style));
    }
    if start < end {
        spans.push(Span::styled(line_text[start..end].to_string(), selected_style));
    }
    if end < line_text.len() {
        spans.push(Span::styled(line_text[end..].to_string(), normal_style));
    }
    spans
}

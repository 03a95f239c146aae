use std::ops::Range;

/// A single text document with a cursor and an optional selection.
///
/// The text is stored as one `String`. The cursor is a byte offset into it,
/// always on a char boundary. A selection exists while `anchor` is set and
/// differs from the cursor; it spans `[min(anchor, cursor), max(anchor, cursor))`.
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    cursor: usize,
    anchor: Option<usize>,
    /// Desired column (bytes into the line) for vertical movement.
    desired_col: usize,
    /// Whether the document has been modified since last save.
    pub dirty: bool,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document from a string with the cursor at the end.
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.set_text(text);
        doc
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the whole content, moving the cursor to the end and
    /// clearing selection and dirty state.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
        self.anchor = None;
        self.desired_col = self.column_of(self.cursor);
        self.dirty = false;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the cursor sits at the very end of the document.
    pub fn is_cursor_at_end(&self) -> bool {
        self.cursor == self.text.len()
    }

    // ── Selection ────────────────────────────────────────────────────

    /// The selected range, if non-empty.
    pub fn selection(&self) -> Option<Range<usize>> {
        let anchor = self.anchor?;
        if anchor == self.cursor {
            return None;
        }
        Some(anchor.min(self.cursor)..anchor.max(self.cursor))
    }

    /// The selected range, or an empty range at the cursor.
    pub fn selection_or_cursor(&self) -> Range<usize> {
        self.selection().unwrap_or(self.cursor..self.cursor)
    }

    pub fn selected_text(&self) -> Option<&str> {
        self.selection().map(|r| &self.text[r])
    }

    /// Select `[start, end)`, leaving the cursor at `end`.
    /// Offsets are clamped and snapped to char boundaries.
    pub fn select(&mut self, start: usize, end: usize) {
        let start = snap_to_char_boundary(&self.text, start);
        let end = snap_to_char_boundary(&self.text, end);
        let (start, end) = (start.min(end), start.max(end));
        self.anchor = Some(start);
        self.cursor = end;
        self.desired_col = self.column_of(end);
    }

    pub fn select_all(&mut self) {
        self.select(0, self.text.len());
    }

    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    // ── Cursor movement ──────────────────────────────────────────────

    /// Move the cursor to `offset`. With `extend`, the selection grows from
    /// the current anchor (or the old cursor); otherwise it is dropped.
    pub fn move_to(&mut self, offset: usize, extend: bool) {
        let offset = snap_to_char_boundary(&self.text, offset);
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
        } else {
            self.anchor = None;
        }
        self.cursor = offset;
    }

    /// Move cursor left by one character.
    pub fn cursor_left(&mut self, extend: bool) {
        // Collapsing a selection lands on its start
        if !extend {
            if let Some(range) = self.selection() {
                self.move_to(range.start, false);
                self.desired_col = self.column_of(self.cursor);
                return;
            }
        }
        let target = prev_char_boundary(&self.text, self.cursor);
        self.move_to(target, extend);
        self.desired_col = self.column_of(self.cursor);
    }

    /// Move cursor right by one character.
    pub fn cursor_right(&mut self, extend: bool) {
        if !extend {
            if let Some(range) = self.selection() {
                self.move_to(range.end, false);
                self.desired_col = self.column_of(self.cursor);
                return;
            }
        }
        let target = next_char_boundary(&self.text, self.cursor);
        self.move_to(target, extend);
        self.desired_col = self.column_of(self.cursor);
    }

    /// Move cursor up by one line, preserving desired column.
    pub fn cursor_up(&mut self, extend: bool) {
        let start = self.line_start(self.cursor);
        if start == 0 {
            self.move_to(0, extend);
            return;
        }
        let prev_start = self.line_start(start - 1);
        let prev_line = &self.text[prev_start..start - 1];
        let col = snap_to_char_boundary(prev_line, self.desired_col);
        self.move_to(prev_start + col, extend);
    }

    /// Move cursor down by one line, preserving desired column.
    pub fn cursor_down(&mut self, extend: bool) {
        let end = self.line_end(self.cursor);
        if end == self.text.len() {
            self.move_to(end, extend);
            return;
        }
        let next_start = end + 1;
        let next_end = self.line_end(next_start);
        let next_line = &self.text[next_start..next_end];
        let col = snap_to_char_boundary(next_line, self.desired_col);
        self.move_to(next_start + col, extend);
    }

    /// Move cursor to the beginning of the current line.
    pub fn cursor_home(&mut self, extend: bool) {
        self.move_to(self.line_start(self.cursor), extend);
        self.desired_col = 0;
    }

    /// Move cursor to the end of the current line.
    pub fn cursor_end(&mut self, extend: bool) {
        self.move_to(self.line_end(self.cursor), extend);
        self.desired_col = self.column_of(self.cursor);
    }

    /// Move to the start of the document.
    pub fn goto_top(&mut self, extend: bool) {
        self.move_to(0, extend);
        self.desired_col = 0;
    }

    /// Move to the end of the document.
    pub fn goto_bottom(&mut self, extend: bool) {
        self.move_to(self.text.len(), extend);
        self.desired_col = self.column_of(self.cursor);
    }

    /// Jump to the start of the next word.
    pub fn word_right(&mut self, extend: bool) {
        let target = find_word_forward(&self.text, self.cursor);
        self.move_to(target, extend);
        self.desired_col = self.column_of(self.cursor);
    }

    /// Jump to the start of the previous word.
    pub fn word_left(&mut self, extend: bool) {
        let target = find_word_backward(&self.text, self.cursor);
        self.move_to(target, extend);
        self.desired_col = self.column_of(self.cursor);
    }

    // ── Editing ──────────────────────────────────────────────────────

    /// Insert a string at the cursor, replacing the selection if any.
    pub fn insert_str(&mut self, s: &str) {
        let range = self.selection_or_cursor();
        self.replace_range(range, s);
    }

    pub fn insert_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut buf));
    }

    pub fn insert_newline(&mut self) {
        self.insert_str("\n");
    }

    /// Delete the selection, or the character before the cursor.
    /// Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        if let Some(range) = self.selection() {
            self.replace_range(range, "");
            return true;
        }
        if self.cursor == 0 {
            return false;
        }
        let start = prev_char_boundary(&self.text, self.cursor);
        self.replace_range(start..self.cursor, "");
        true
    }

    /// Delete the selection, or the character at the cursor.
    pub fn delete_forward(&mut self) -> bool {
        if let Some(range) = self.selection() {
            self.replace_range(range, "");
            return true;
        }
        if self.cursor >= self.text.len() {
            return false;
        }
        let end = next_char_boundary(&self.text, self.cursor);
        self.replace_range(self.cursor..end, "");
        true
    }

    /// Replace `range` with `replacement` and put the cursor at the end of
    /// the inserted text. Clears the selection.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) {
        let start = snap_to_char_boundary(&self.text, range.start);
        let end = snap_to_char_boundary(&self.text, range.end.max(range.start));
        self.text.replace_range(start..end, replacement);
        self.cursor = start + replacement.len();
        self.anchor = None;
        self.desired_col = self.column_of(self.cursor);
        self.dirty = true;
    }

    /// Replace the whole content as an edit (dirty, cursor at end).
    pub fn replace_all(&mut self, replacement: &str) {
        self.replace_range(0..self.text.len(), replacement);
    }

    // ── Line geometry ────────────────────────────────────────────────

    /// Byte offset of the start of the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        self.text[..offset.min(self.text.len())]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Byte offset of the end of the line containing `offset` (before `\n`).
    pub fn line_end(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        self.text[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or(self.text.len())
    }

    fn column_of(&self, offset: usize) -> usize {
        offset - self.line_start(offset)
    }

    /// Convert a byte offset to (row, col), col being a byte offset in the row.
    pub fn offset_to_pos(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let row = self.text[..offset].matches('\n').count();
        (row, self.column_of(offset))
    }

    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Create a snapshot of the document state for undo.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            text: self.text.clone(),
            cursor: self.cursor,
        }
    }

    /// Restore from a snapshot. The document becomes dirty.
    pub fn restore(&mut self, snapshot: &DocumentSnapshot) {
        self.text = snapshot.text.clone();
        self.cursor = snap_to_char_boundary(&self.text, snapshot.cursor);
        self.anchor = None;
        self.desired_col = self.column_of(self.cursor);
        self.dirty = true;
    }
}

/// A snapshot of the document state for undo/redo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub text: String,
    pub cursor: usize,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Snap a byte offset to the nearest valid char boundary at or before it.
pub fn snap_to_char_boundary(s: &str, target: usize) -> usize {
    if target >= s.len() {
        return s.len();
    }
    let mut i = target;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn prev_char_boundary(s: &str, offset: usize) -> usize {
    s[..offset]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(s: &str, offset: usize) -> usize {
    s[offset..]
        .chars()
        .next()
        .map(|c| offset + c.len_utf8())
        .unwrap_or(s.len())
}

// ── Word boundary helpers ────────────────────────────────────────────

/// Classify a character for word movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Whitespace,
    Word,
    Punctuation,
}

pub fn char_class(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Whitespace
    } else if c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

/// Offset of the start of the next word after `offset`.
pub fn find_word_forward(text: &str, offset: usize) -> usize {
    let mut chars = text[offset..].char_indices().peekable();
    let Some(&(_, first)) = chars.peek() else {
        return text.len();
    };
    let start_class = char_class(first);
    // Skip the rest of the current run
    while let Some(&(_, c)) = chars.peek() {
        if char_class(c) != start_class || start_class == CharClass::Whitespace {
            break;
        }
        chars.next();
    }
    // Then any whitespace
    while let Some(&(i, c)) = chars.peek() {
        if char_class(c) != CharClass::Whitespace {
            return offset + i;
        }
        chars.next();
    }
    text.len()
}

/// Offset of the start of the word before `offset`.
pub fn find_word_backward(text: &str, offset: usize) -> usize {
    let mut chars = text[..offset].char_indices().rev().peekable();
    // Skip whitespace before the cursor
    while let Some(&(_, c)) = chars.peek() {
        if char_class(c) != CharClass::Whitespace {
            break;
        }
        chars.next();
    }
    let Some(&(mut start, first)) = chars.peek() else {
        return 0;
    };
    let class = char_class(first);
    for (i, c) in chars {
        if char_class(c) != class {
            break;
        }
        start = i;
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document() {
        let doc = Document::new();
        assert_eq!(doc.text(), "");
        assert_eq!(doc.cursor(), 0);
        assert!(doc.selection().is_none());
    }

    #[test]
    fn test_from_text_puts_cursor_at_end() {
        let doc = Document::from_text("hello\nworld");
        assert_eq!(doc.cursor(), 11);
        assert!(doc.is_cursor_at_end());
        assert!(!doc.dirty);
    }

    #[test]
    fn test_insert_and_backspace() {
        let mut doc = Document::new();
        doc.insert_char('h');
        doc.insert_char('i');
        assert_eq!(doc.text(), "hi");
        assert!(doc.dirty);
        doc.backspace();
        assert_eq!(doc.text(), "h");
        assert_eq!(doc.cursor(), 1);
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut doc = Document::from_text("abc");
        doc.goto_top(false);
        assert!(!doc.backspace());
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_multibyte_cursor_movement() {
        let mut doc = Document::from_text("héllo");
        doc.goto_top(false);
        doc.cursor_right(false);
        doc.cursor_right(false);
        assert_eq!(doc.cursor(), 3); // 'é' is two bytes
        doc.cursor_left(false);
        assert_eq!(doc.cursor(), 1);
        doc.delete_forward();
        assert_eq!(doc.text(), "hllo");
    }

    #[test]
    fn test_vertical_movement_keeps_column() {
        let mut doc = Document::from_text("hello\nhi\nworld");
        doc.goto_top(false);
        doc.cursor_end(false); // col 5
        doc.cursor_down(false);
        assert_eq!(doc.offset_to_pos(doc.cursor()), (1, 2)); // clamped to "hi"
        doc.cursor_down(false);
        assert_eq!(doc.offset_to_pos(doc.cursor()), (2, 5)); // sticky column restored
        doc.cursor_up(false);
        doc.cursor_up(false);
        assert_eq!(doc.offset_to_pos(doc.cursor()), (0, 5));
    }

    #[test]
    fn test_shift_selection() {
        let mut doc = Document::from_text("I went to teh store");
        doc.move_to(10, false);
        doc.cursor_right(true);
        doc.cursor_right(true);
        doc.cursor_right(true);
        assert_eq!(doc.selection(), Some(10..13));
        assert_eq!(doc.selected_text(), Some("teh"));

        // Collapsing moves to the selection edge
        doc.cursor_left(false);
        assert_eq!(doc.cursor(), 10);
        assert!(doc.selection().is_none());
    }

    #[test]
    fn test_typing_replaces_selection() {
        let mut doc = Document::from_text("hello world");
        doc.select(6, 11);
        doc.insert_str("there");
        assert_eq!(doc.text(), "hello there");
        assert_eq!(doc.cursor(), 11);
        assert!(doc.selection().is_none());
    }

    #[test]
    fn test_select_normalizes_order() {
        let mut doc = Document::from_text("abcdef");
        doc.select(4, 1);
        assert_eq!(doc.selection(), Some(1..4));
    }

    #[test]
    fn test_replace_range_moves_cursor() {
        let mut doc = Document::from_text("I went to teh store");
        doc.replace_range(10..13, "the");
        assert_eq!(doc.text(), "I went to the store");
        assert_eq!(doc.cursor(), 13);
    }

    #[test]
    fn test_word_motions() {
        let mut doc = Document::from_text("hello world, foo");
        doc.goto_top(false);
        doc.word_right(false);
        assert_eq!(doc.cursor(), 6);
        doc.word_right(false);
        assert_eq!(doc.cursor(), 11); // ","
        doc.word_left(false);
        assert_eq!(doc.cursor(), 6);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut doc = Document::from_text("one");
        let snap = doc.snapshot();
        doc.insert_str(" two");
        doc.restore(&snap);
        assert_eq!(doc.text(), "one");
        assert_eq!(doc.cursor(), 3);
    }
}

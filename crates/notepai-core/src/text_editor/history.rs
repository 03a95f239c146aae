use super::document::DocumentSnapshot;

/// Linear undo/redo history of document snapshots.
///
/// A snapshot is recorded before each edit. Consecutive typing of word
/// characters is coalesced into one entry so undo steps back a word at a
/// time rather than a keystroke at a time.
pub struct History {
    undo_stack: Vec<DocumentSnapshot>,
    redo_stack: Vec<DocumentSnapshot>,
    max_depth: usize,
    /// Whether the last recorded entry may absorb the next typed character.
    coalescing: bool,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth,
            coalescing: false,
        }
    }

    /// Save a snapshot before an edit. Clears the redo stack.
    pub fn record(&mut self, snapshot: DocumentSnapshot) {
        self.coalescing = false;
        self.push(snapshot);
    }

    /// Save a snapshot before typing a character, merging runs of typing.
    pub fn record_typing(&mut self, snapshot: DocumentSnapshot, c: char) {
        let word_char = c.is_alphanumeric();
        if !(self.coalescing && word_char) {
            self.push(snapshot);
        } else {
            self.redo_stack.clear();
        }
        self.coalescing = word_char;
    }

    fn push(&mut self, snapshot: DocumentSnapshot) {
        self.redo_stack.clear();
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
    }

    /// Undo: returns the previous snapshot if available.
    /// The caller passes the current state so it can be redone.
    pub fn undo(&mut self, current: DocumentSnapshot) -> Option<DocumentSnapshot> {
        self.coalescing = false;
        let snapshot = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(snapshot)
    }

    /// Redo: returns the next snapshot if available.
    pub fn redo(&mut self, current: DocumentSnapshot) -> Option<DocumentSnapshot> {
        self.coalescing = false;
        let snapshot = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(snapshot)
    }

    /// Stop merging typed characters into the last entry.
    pub fn break_coalescing(&mut self) {
        self.coalescing = false;
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.coalescing = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str) -> DocumentSnapshot {
        DocumentSnapshot {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut h = History::new(100);
        h.record(snapshot("hello"));

        let undone = h.undo(snapshot("hello world"));
        assert_eq!(undone.unwrap().text, "hello");

        let redone = h.redo(snapshot("hello"));
        assert_eq!(redone.unwrap().text, "hello world");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut h = History::new(100);
        h.record(snapshot("a"));
        h.record(snapshot("b"));
        let _ = h.undo(snapshot("c"));
        assert!(h.can_redo());

        h.record(snapshot("d"));
        assert!(!h.can_redo());
    }

    #[test]
    fn test_typing_is_coalesced_per_word() {
        let mut h = History::new(100);
        h.record_typing(snapshot(""), 'a');
        h.record_typing(snapshot("a"), 'b');
        h.record_typing(snapshot("ab"), ' ');
        h.record_typing(snapshot("ab "), 'c');

        // "" (word ab), "ab" (space), "ab " (word c)
        assert_eq!(h.undo_stack.len(), 3);
        assert_eq!(h.undo(snapshot("ab c")).unwrap().text, "ab ");
    }

    #[test]
    fn test_max_depth() {
        let mut h = History::new(3);
        h.record(snapshot("a"));
        h.record(snapshot("b"));
        h.record(snapshot("c"));
        h.record(snapshot("d"));
        assert_eq!(h.undo_stack.len(), 3);
        assert_eq!(h.undo_stack[0].text, "b");
    }
}

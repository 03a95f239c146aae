use notepai_ai::api::{ComposerMode, ComposerRequest, HistoryTurn};
use notepai_core::line_input::LineInput;

use crate::executor::RequestId;

/// Message appended when a composer request fails.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// A composer request waiting for its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightTurn {
    pub id: RequestId,
    /// Chat the reply belongs to.
    pub session_id: String,
    /// Mode at submission; decides whether the reply may propose changes.
    pub mode: ComposerMode,
}

/// State of the composer side panel.
#[derive(Debug, Default)]
pub struct Composer {
    pub visible: bool,
    pub focused: bool,
    pub input: LineInput,
    pub mode: ComposerMode,
    /// Snippets of the note attached to the next message.
    contexts: Vec<String>,
    in_flight: Option<InFlightTurn>,
    /// Title being edited for the current chat.
    pub renaming: Option<LineInput>,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll: u16,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.focused = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.focused = false;
        self.renaming = None;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
    }

    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    /// Attach a snippet, skipping blanks and duplicates.
    pub fn attach_context(&mut self, text: &str) {
        if text.trim().is_empty() || self.contexts.iter().any(|c| c == text) {
            return;
        }
        self.contexts.push(text.to_string());
    }

    pub fn clear_contexts(&mut self) {
        self.contexts.clear();
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&InFlightTurn> {
        self.in_flight.as_ref()
    }

    /// Take the typed message and attached contexts for sending. `None`
    /// when the input is blank or a reply is still pending.
    pub fn take_submission(&mut self) -> Option<(String, Vec<String>)> {
        if self.is_loading() || self.input.is_blank() {
            return None;
        }
        let message = self.input.take().trim().to_string();
        Some((message, std::mem::take(&mut self.contexts)))
    }

    /// Build the request for a submitted message.
    pub fn build_request(
        &self,
        message: String,
        contexts: &[String],
        note: &str,
        history: Vec<HistoryTurn>,
    ) -> ComposerRequest {
        let selected_context = if contexts.is_empty() {
            None
        } else {
            Some(contexts.join("\n\n"))
        };
        ComposerRequest {
            message,
            note_content: note.to_string(),
            history,
            selected_context,
            mode: self.mode,
        }
    }

    pub fn mark_sent(&mut self, turn: InFlightTurn) {
        self.in_flight = Some(turn);
        self.scroll = 0;
    }

    /// Claim a reply by id, clearing the loading state.
    pub fn claim_reply(&mut self, id: RequestId) -> Option<InFlightTurn> {
        if self.in_flight.as_ref().is_some_and(|t| t.id == id) {
            self.in_flight.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_takes_input_and_contexts() {
        let mut composer = Composer::new();
        composer.input = LineInput::with_text("  fix grammar ");
        composer.attach_context("teh");
        composer.attach_context("teh");
        composer.attach_context("  ");
        assert_eq!(composer.contexts().len(), 1);

        let (message, contexts) = composer.take_submission().unwrap();
        assert_eq!(message, "fix grammar");
        assert_eq!(contexts, vec!["teh".to_string()]);
        assert!(composer.contexts().is_empty());
        assert!(composer.input.is_blank());
    }

    #[test]
    fn test_no_submission_while_loading_or_blank() {
        let mut composer = Composer::new();
        assert!(composer.take_submission().is_none());

        composer.input = LineInput::with_text("hi");
        composer.mark_sent(InFlightTurn {
            id: 4,
            session_id: "s".into(),
            mode: ComposerMode::Agent,
        });
        assert!(composer.take_submission().is_none());
        assert!(composer.claim_reply(3).is_none());
        assert!(composer.claim_reply(4).is_some());
        assert!(!composer.is_loading());
        assert!(composer.take_submission().is_some());
    }

    #[test]
    fn test_request_joins_contexts() {
        let mut composer = Composer::new();
        composer.toggle_mode();
        let req = composer.build_request(
            "explain".into(),
            &["one".to_string(), "two".to_string()],
            "note",
            Vec::new(),
        );
        assert_eq!(req.selected_context.as_deref(), Some("one\n\ntwo"));
        assert_eq!(req.mode, ComposerMode::Chat);
        assert_eq!(req.note_content, "note");

        let req = composer.build_request("x".into(), &[], "", Vec::new());
        assert_eq!(req.selected_context, None);
    }
}

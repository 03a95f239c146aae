use std::ops::Range;

use notepai_ai::api::QuickEditRequest;
use notepai_ai::context::{QUICK_EDIT_CONTEXT_CHARS, first_chars, last_chars};
use notepai_core::line_input::LineInput;

use crate::executor::RequestId;

/// The instruction prompt opened with Ctrl-k.
///
/// The prompt remembers the span it was opened on. An empty span means
/// new text is generated at the cursor.
#[derive(Debug)]
pub struct QuickEditPrompt {
    pub input: LineInput,
    range: Range<usize>,
    /// Request waiting for a reply, if any.
    in_flight: Option<RequestId>,
    /// Shown under the input after a reply that could not be used.
    pub notice: Option<String>,
}

impl QuickEditPrompt {
    pub fn open(range: Range<usize>) -> Self {
        Self {
            input: LineInput::new(),
            range,
            in_flight: None,
            notice: None,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Build the request for `text`. `None` while a request is already out
    /// or when the instruction is blank.
    pub fn build_request(&self, text: &str) -> Option<QuickEditRequest> {
        if self.is_loading() || self.input.is_blank() {
            return None;
        }
        let range = self.range();
        Some(QuickEditRequest {
            instruction: self.input.text().trim().to_string(),
            selected_text: text[range.clone()].to_string(),
            before_context: last_chars(&text[..range.start], QUICK_EDIT_CONTEXT_CHARS).to_string(),
            after_context: first_chars(&text[range.end..], QUICK_EDIT_CONTEXT_CHARS).to_string(),
        })
    }

    pub fn mark_sent(&mut self, id: RequestId) {
        self.in_flight = Some(id);
        self.notice = None;
    }

    /// Whether a reply belongs to this prompt. Clears the in-flight marker
    /// when it does.
    pub fn claim_reply(&mut self, id: RequestId) -> bool {
        if self.in_flight == Some(id) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }
}

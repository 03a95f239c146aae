//! Staged changes awaiting accept or reject.

use std::ops::Range;

use crate::sessions::{ChangeOutcome, ChatMessage, MessageChanges};

/// A quick edit against a snapshot of the note.
///
/// `before + original + after` equals the note at the time of the
/// proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickEditProposal {
    pub original: String,
    pub proposed: String,
    pub before: String,
    pub after: String,
}

impl QuickEditProposal {
    /// Split `text` around `range` and pair it with the proposed text.
    /// `None` if the range does not fit `text`.
    pub fn new(text: &str, range: Range<usize>, proposed: impl Into<String>) -> Option<Self> {
        Some(Self {
            original: text.get(range.clone())?.to_string(),
            proposed: proposed.into(),
            before: text[..range.start].to_string(),
            after: text[range.end..].to_string(),
        })
    }

    /// Whether the proposal still describes `text`.
    pub fn applies_to(&self, text: &str) -> bool {
        text.len() == self.before.len() + self.original.len() + self.after.len()
            && text.starts_with(&self.before)
            && text[self.before.len()..].starts_with(&self.original)
            && text.ends_with(&self.after)
    }

    /// Byte range of the original span.
    pub fn span(&self) -> Range<usize> {
        self.before.len()..self.before.len() + self.original.len()
    }

    /// The note after accepting.
    pub fn accepted_text(&self) -> String {
        format!("{}{}{}", self.before, self.proposed, self.after)
    }
}

/// A whole-note replacement suggested by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingComposerChange {
    pub original: String,
    pub proposed: String,
    /// Chat the change came from; the outcome is recorded there.
    pub session_id: String,
}

impl PendingComposerChange {
    /// The assistant message recording what happened to this change.
    pub fn outcome_message(&self, outcome: ChangeOutcome) -> ChatMessage {
        let content = match outcome {
            ChangeOutcome::Accepted => "Changes accepted and applied to the note.",
            ChangeOutcome::Rejected => "Changes rejected. The note was left unchanged.",
        };
        ChatMessage::assistant(content).with_changes(MessageChanges {
            original: self.original.clone(),
            proposed: self.proposed.clone(),
            outcome: Some(outcome),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proposal {
    QuickEdit(QuickEditProposal),
    Composer(PendingComposerChange),
}

impl Proposal {
    pub fn original(&self) -> &str {
        match self {
            Proposal::QuickEdit(p) => &p.original,
            Proposal::Composer(p) => &p.original,
        }
    }

    pub fn proposed(&self) -> &str {
        match self {
            Proposal::QuickEdit(p) => &p.proposed,
            Proposal::Composer(p) => &p.proposed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Proposal::QuickEdit(_) => "Quick edit",
            Proposal::Composer(_) => "Composer",
        }
    }
}

/// Holds at most one pending proposal.
#[derive(Debug, Default)]
pub struct Review {
    pending: Option<Proposal>,
}

impl Review {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&Proposal> {
        self.pending.as_ref()
    }

    /// Stage a proposal. Refused (and handed back) if one is already pending.
    pub fn stage(&mut self, proposal: Proposal) -> Result<(), Proposal> {
        if self.pending.is_some() {
            return Err(proposal);
        }
        self.pending = Some(proposal);
        Ok(())
    }

    /// Remove the pending proposal for accepting or rejecting.
    pub fn take(&mut self) -> Option<Proposal> {
        self.pending.take()
    }
}

//! Debounced ghost-text suggestions.
//!
//! Every keystroke bumps a monotonic request id. A request is issued once
//! typing pauses, carrying the latest id; a reply is only shown if its id
//! still matches. Superseded replies are dropped, and no network abort is
//! issued for them.

use std::time::{Duration, Instant};

use notepai_ai::AiError;
use notepai_ai::api::{AutocompleteRequest, AutocompleteResponse};
use notepai_ai::context::{AUTOCOMPLETE_CONTEXT_CHARS, last_chars, worth_completing};
use tracing::{debug, warn};

use crate::executor::RequestId;

/// Quiet period after the last edit before a suggestion is requested.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    /// Waiting for the typing pause to end.
    Debouncing { deadline: Instant },
    InFlight { id: RequestId },
    /// The latest request answered (possibly with nothing to suggest).
    Resolved,
    /// A reply arrived for a superseded request and was discarded.
    Stale,
    Failed,
}

/// A suggestion waiting to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSuggestion {
    pub text: String,
    pub request_id: RequestId,
}

#[derive(Debug)]
pub struct CompletionFetcher {
    state: FetchState,
    latest_id: RequestId,
    suggestion: Option<PendingSuggestion>,
}

impl Default for CompletionFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionFetcher {
    pub fn new() -> Self {
        Self {
            state: FetchState::Idle,
            latest_id: 0,
            suggestion: None,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn latest_id(&self) -> RequestId {
        self.latest_id
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FetchState::InFlight { .. })
    }

    pub fn suggestion(&self) -> Option<&PendingSuggestion> {
        self.suggestion.as_ref()
    }

    /// The text was edited: forget the suggestion and restart the pause.
    pub fn schedule(&mut self, now: Instant) {
        self.latest_id += 1;
        self.suggestion = None;
        self.state = FetchState::Debouncing {
            deadline: now + DEBOUNCE,
        };
    }

    /// A non-editing keystroke: forget the suggestion without refetching.
    pub fn dismiss(&mut self) {
        self.latest_id += 1;
        self.suggestion = None;
        self.state = FetchState::Idle;
    }

    /// Issue the debounced request once the pause has elapsed.
    ///
    /// Only the text before the cursor is sent, and only when the cursor is
    /// at the end of the note.
    pub fn poll(&mut self, now: Instant, text: &str, cursor: usize) -> Option<SuggestionRequest> {
        match self.state {
            FetchState::Debouncing { deadline } if now >= deadline => {
                self.state = FetchState::Idle;
                self.issue(text, cursor)
            }
            _ => None,
        }
    }

    /// Fetch immediately, skipping the pause.
    pub fn request_now(&mut self, text: &str, cursor: usize) -> Option<SuggestionRequest> {
        self.dismiss();
        self.issue(text, cursor)
    }

    fn issue(&mut self, text: &str, cursor: usize) -> Option<SuggestionRequest> {
        if cursor != text.len() {
            return None;
        }
        let prefix = &text[..cursor];
        if !worth_completing(prefix) {
            return None;
        }
        let id = self.latest_id;
        self.state = FetchState::InFlight { id };
        Some(SuggestionRequest {
            id,
            req: AutocompleteRequest {
                text: last_chars(prefix, AUTOCOMPLETE_CONTEXT_CHARS).to_string(),
            },
        })
    }

    /// Apply a reply. Returns true if it produced a visible suggestion.
    pub fn on_reply(
        &mut self,
        id: RequestId,
        result: Result<AutocompleteResponse, AiError>,
    ) -> bool {
        if id != self.latest_id {
            debug!(id, latest = self.latest_id, "dropping stale suggestion");
            // A pending pause or newer request keeps its state
            if matches!(
                self.state,
                FetchState::Idle | FetchState::Resolved | FetchState::Failed
            ) {
                self.state = FetchState::Stale;
            }
            return false;
        }

        match result {
            Ok(resp) if !resp.completion.is_empty() => {
                self.suggestion = Some(PendingSuggestion {
                    text: resp.completion,
                    request_id: id,
                });
                self.state = FetchState::Resolved;
                true
            }
            Ok(_) => {
                self.state = FetchState::Resolved;
                false
            }
            Err(e) => {
                warn!(error = %e, "autocomplete failed");
                self.state = FetchState::Failed;
                false
            }
        }
    }

    /// Take the suggestion for insertion.
    pub fn accept(&mut self) -> Option<String> {
        let suggestion = self.suggestion.take()?;
        self.latest_id += 1;
        self.state = FetchState::Idle;
        Some(suggestion.text)
    }
}

/// An autocomplete request ready to hand to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub id: RequestId,
    pub req: AutocompleteRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(s: &str) -> Result<AutocompleteResponse, AiError> {
        Ok(AutocompleteResponse {
            completion: s.to_string(),
        })
    }

    #[test]
    fn test_waits_for_pause() {
        let mut fetcher = CompletionFetcher::new();
        let t0 = Instant::now();
        let text = "The quick brown fox jum";
        fetcher.schedule(t0);
        assert!(fetcher.poll(t0 + Duration::from_millis(299), text, text.len()).is_none());

        let parts = fetcher.poll(t0 + DEBOUNCE, text, text.len()).unwrap();
        assert_eq!(parts.req.text, text);
        assert!(fetcher.is_loading());
        // One request per pause
        assert!(fetcher.poll(t0 + DEBOUNCE * 2, text, text.len()).is_none());
    }

    #[test]
    fn test_short_text_never_requests() {
        let mut fetcher = CompletionFetcher::new();
        let t0 = Instant::now();
        fetcher.schedule(t0);
        assert!(fetcher.poll(t0 + DEBOUNCE, " abc", 4).is_none());
        assert!(fetcher.request_now("abcd", 4).is_none());
        assert_eq!(fetcher.state(), FetchState::Idle);
    }

    #[test]
    fn test_cursor_not_at_end_never_requests() {
        let mut fetcher = CompletionFetcher::new();
        let t0 = Instant::now();
        fetcher.schedule(t0);
        assert!(fetcher.poll(t0 + DEBOUNCE, "hello world", 5).is_none());
    }

    #[test]
    fn test_context_is_truncated() {
        let mut fetcher = CompletionFetcher::new();
        let text = "x".repeat(1200);
        let parts = fetcher.request_now(&text, text.len()).unwrap();
        assert_eq!(parts.req.text.len(), 1000);
    }

    #[test]
    fn test_stale_reply_is_dropped() {
        let mut fetcher = CompletionFetcher::new();
        let t0 = Instant::now();
        fetcher.schedule(t0);
        let r1 = fetcher.poll(t0 + DEBOUNCE, "hello wor", 9).unwrap();

        fetcher.schedule(t0 + DEBOUNCE);
        let r2 = fetcher.poll(t0 + DEBOUNCE * 2, "hello worl", 10).unwrap();
        assert!(r1.id < r2.id);

        assert!(fetcher.on_reply(r2.id, ok("d")));
        assert!(!fetcher.on_reply(r1.id, ok("ld and more")));
        assert_eq!(fetcher.suggestion().unwrap().text, "d");
        assert_eq!(fetcher.suggestion().unwrap().request_id, r2.id);
    }

    #[test]
    fn test_late_reply_after_keystroke_is_dropped() {
        let mut fetcher = CompletionFetcher::new();
        let r1 = fetcher.request_now("hello wor", 9).unwrap();
        fetcher.schedule(Instant::now());
        assert!(!fetcher.on_reply(r1.id, ok("ld")));
        assert!(fetcher.suggestion().is_none());
    }

    #[test]
    fn test_stale_reply_keeps_pause_running() {
        let mut fetcher = CompletionFetcher::new();
        let t0 = Instant::now();
        fetcher.schedule(t0);
        let r1 = fetcher.poll(t0 + DEBOUNCE, "hello wor", 9).unwrap();

        fetcher.schedule(t0 + DEBOUNCE * 2);
        assert!(!fetcher.on_reply(r1.id, ok("ld")));
        assert!(matches!(fetcher.state(), FetchState::Debouncing { .. }));

        let r2 = fetcher.poll(t0 + DEBOUNCE * 3, "hello worl", 10).unwrap();
        assert_eq!(r2.req.text, "hello worl");
        assert!(r2.id > r1.id);
    }

    #[test]
    fn test_stale_reply_when_idle_marks_stale() {
        let mut fetcher = CompletionFetcher::new();
        let r1 = fetcher.request_now("hello wor", 9).unwrap();
        fetcher.dismiss();
        assert!(!fetcher.on_reply(r1.id, ok("ld")));
        assert_eq!(fetcher.state(), FetchState::Stale);
    }

    #[test]
    fn test_failure_leaves_no_suggestion() {
        let mut fetcher = CompletionFetcher::new();
        let r = fetcher.request_now("hello wor", 9).unwrap();
        assert!(!fetcher.on_reply(r.id, Err(AiError::EmptyResponse)));
        assert_eq!(fetcher.state(), FetchState::Failed);
        assert!(!fetcher.is_loading());
        assert!(fetcher.suggestion().is_none());
    }

    #[test]
    fn test_accept_takes_suggestion() {
        let mut fetcher = CompletionFetcher::new();
        let r = fetcher.request_now("hello wor", 9).unwrap();
        fetcher.on_reply(r.id, ok("ld"));
        assert_eq!(fetcher.accept().as_deref(), Some("ld"));
        assert!(fetcher.accept().is_none());
        assert_eq!(fetcher.state(), FetchState::Idle);
    }
}

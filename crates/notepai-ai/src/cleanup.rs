//! Post-processing of raw model output.
//!
//! Models decorate replies with quotes, ellipses, speaker labels and echoes
//! of the input. These helpers strip the common cases. They are heuristics:
//! a reply that dodges them is passed through unchanged.

use crate::api::ComposerMode;
use crate::context::{ECHO_WINDOW_CHARS, last_chars};
use crate::prompt::{NEW_CONTENT_CLOSE, NEW_CONTENT_OPEN};

const QUOTES: [char; 2] = ['"', '\''];

/// Clean an autocomplete reply. `context` is the text that was sent.
pub fn clean_completion(raw: &str, context: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix(QUOTES) {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix(QUOTES) {
        s = rest;
    }
    if let Some(rest) = s.strip_prefix("...") {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_prefix(':') {
        s = rest.trim_start();
    }

    let echo = last_chars(context, ECHO_WINDOW_CHARS);
    if !echo.is_empty() {
        if let Some(rest) = s.strip_prefix(echo) {
            s = rest;
        }
    }

    s.trim().to_string()
}

/// Clean a quick-edit reply: trim and drop one pair of matching quotes.
pub fn clean_quick_edit(raw: &str) -> String {
    let s = raw.trim();
    for q in QUOTES {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Clean a composer reply and pull out the proposed note, if any.
///
/// Returns the text to show in the chat and the replacement note. The
/// marker is only honoured in agent mode; in chat mode the reply is shown
/// as is.
pub fn clean_composer(raw: &str, mode: ComposerMode) -> (String, Option<String>) {
    let mut response = raw.trim();
    if let Some(rest) = response.strip_prefix("Assistant:") {
        response = rest.trim();
    }

    if !mode.can_edit() {
        return (response.to_string(), None);
    }

    match extract_new_content(response) {
        Some((start, end, inner)) => {
            let shown = format!("{}{}", &response[..start], &response[end..]);
            (shown.trim().to_string(), Some(inner.trim().to_string()))
        }
        None => (response.to_string(), None),
    }
}

/// Locate the first complete marker block. Returns the byte span of the
/// whole block and its inner text.
fn extract_new_content(s: &str) -> Option<(usize, usize, &str)> {
    let start = s.find(NEW_CONTENT_OPEN)?;
    let inner_start = start + NEW_CONTENT_OPEN.len();
    let inner_len = s[inner_start..].find(NEW_CONTENT_CLOSE)?;
    let inner_end = inner_start + inner_len;
    Some((
        start,
        inner_end + NEW_CONTENT_CLOSE.len(),
        &s[inner_start..inner_end],
    ))
}

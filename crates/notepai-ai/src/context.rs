//! Char-based windows over note text.
//!
//! The endpoints limit how much of the note is sent to the model. Limits are
//! counted in chars, and the returned slices always sit on char boundaries.

/// Context sent for autocomplete, taken from the end of the prefix.
pub const AUTOCOMPLETE_CONTEXT_CHARS: usize = 1000;

/// Context on each side of a quick-edit selection.
pub const QUICK_EDIT_CONTEXT_CHARS: usize = 500;

/// Minimum trimmed prefix length before autocomplete is worth asking for.
pub const MIN_AUTOCOMPLETE_CHARS: usize = 5;

/// Trailing window compared against the reply when stripping echoes.
pub const ECHO_WINDOW_CHARS: usize = 50;

/// The last `n` chars of `s`.
pub fn last_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

/// The first `n` chars of `s`.
pub fn first_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Whether a prefix is long enough to autocomplete.
pub fn worth_completing(prefix: &str) -> bool {
    prefix.trim().chars().count() >= MIN_AUTOCOMPLETE_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_and_first_chars() {
        assert_eq!(last_chars("abcdef", 3), "def");
        assert_eq!(last_chars("ab", 5), "ab");
        assert_eq!(last_chars("ab", 0), "");
        assert_eq!(last_chars("añb", 2), "ñb");
        assert_eq!(first_chars("abcdef", 2), "ab");
        assert_eq!(first_chars("ab", 10), "ab");
        assert_eq!(first_chars("ñañ", 2), "ña");
    }

    #[test]
    fn test_worth_completing() {
        assert!(!worth_completing("  abcd   "));
        assert!(worth_completing("abcde"));
        assert!(!worth_completing(""));
    }
}

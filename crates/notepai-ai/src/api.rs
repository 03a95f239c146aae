//! JSON bodies of the `/autocomplete`, `/quickedit` and `/composer` endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub completion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickEditRequest {
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub before_context: String,
    #[serde(default)]
    pub after_context: String,
}

impl QuickEditRequest {
    /// Empty selection means new text is generated at the cursor.
    pub fn is_generating(&self) -> bool {
        self.selected_text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickEditResponse {
    pub result: String,
}

/// Whether the composer may rewrite the note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposerMode {
    #[default]
    Agent,
    /// Unknown modes fall back to chat, which never edits.
    #[serde(other)]
    Chat,
}

impl ComposerMode {
    pub fn can_edit(&self) -> bool {
        matches!(self, ComposerMode::Agent)
    }

    pub fn toggle(&self) -> Self {
        match self {
            ComposerMode::Agent => ComposerMode::Chat,
            ComposerMode::Chat => ComposerMode::Agent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComposerMode::Agent => "Agent",
            ComposerMode::Chat => "Chat",
        }
    }
}

/// One prior turn of a conversation as sent to the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub note_content: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_context: Option<String>,
    #[serde(default)]
    pub mode: ComposerMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
}

/// Body returned with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_reads_as_chat() {
        let req: ComposerRequest =
            serde_json::from_str(r#"{"message":"hi","mode":"weird"}"#).unwrap();
        assert_eq!(req.mode, ComposerMode::Chat);
        assert!(!req.mode.can_edit());
    }

    #[test]
    fn test_quick_edit_uses_camel_case() {
        let req = QuickEditRequest {
            instruction: "fix spelling".into(),
            selected_text: "teh".into(),
            before_context: "I went to ".into(),
            after_context: " store".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["selectedText"], "teh");
        assert_eq!(json["beforeContext"], "I went to ");
        assert_eq!(json["afterContext"], " store");
    }

    #[test]
    fn test_composer_mode_defaults_to_agent() {
        let req: ComposerRequest =
            serde_json::from_str(r#"{"message":"hi","noteContent":"x"}"#).unwrap();
        assert_eq!(req.mode, ComposerMode::Agent);
        assert!(req.history.is_empty());
        assert_eq!(req.selected_context, None);

        let req: ComposerRequest =
            serde_json::from_str(r#"{"message":"hi","mode":"chat"}"#).unwrap();
        assert!(!req.mode.can_edit());
    }

    #[test]
    fn test_new_content_omitted_when_absent() {
        let resp = ComposerResponse {
            response: "ok".into(),
            new_content: None,
        };
        assert_eq!(serde_json::to_string(&resp).unwrap(), r#"{"response":"ok"}"#);
    }

    #[test]
    fn test_generating_when_selection_blank() {
        let mut req = QuickEditRequest::default();
        req.selected_text = "   ".into();
        assert!(req.is_generating());
        req.selected_text = "x".into();
        assert!(!req.is_generating());
    }
}

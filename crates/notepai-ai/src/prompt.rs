//! Prompt construction for the three endpoints.

use crate::api::{ComposerMode, ComposerRequest, QuickEditRequest};
use crate::context::{AUTOCOMPLETE_CONTEXT_CHARS, last_chars};

/// A single-turn prompt plus sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Marker the agent wraps a full replacement note in.
pub const NEW_CONTENT_OPEN: &str = "<new_content>";
pub const NEW_CONTENT_CLOSE: &str = "</new_content>";

const AUTOCOMPLETE_SYSTEM: &str = "You are an autocomplete assistant. Your job is to predict what the user will type next.

RULES:
- Return ONLY the completion text (the words/characters that come AFTER what's written)
- Keep it short: just a few words or complete the current sentence
- Match the writing style and language
- If text ends mid-word, complete that word first
- If text ends mid-sentence, complete the sentence
- Return empty string \"\" if you can't predict meaningfully
- Never repeat what's already written
- Be context-aware";

const GENERATE_SYSTEM: &str = "You are a writing assistant integrated into a notepad.
The user wants you to generate content at their cursor position.

Rules:
- Generate content based on the user's instruction
- Consider the surrounding context to maintain flow
- Match the existing writing style if there is context
- Only return the generated content, no explanations
- Keep the language consistent with the existing text
- NEVER wrap your response in quotes - return raw text only";

const TRANSFORM_SYSTEM: &str = "You are a writing assistant integrated into a notepad.
The user has selected some text and wants you to edit or transform it.

Rules:
- Transform the selected text according to the user's instruction
- Only return the transformed text, no explanations
- Maintain appropriate formatting
- If asked to fix, improve, or rewrite - do exactly that
- Keep the response in the same language as the input
- NEVER wrap your response in quotes - return raw text only";

const AGENT_GUIDELINES: &str = "Guidelines:
- Be concise and helpful
- When the user asks you to modify, edit, add, or change the note, YOU MUST respond with the FULL new content wrapped in <new_content> tags
- Example: If asked to fix grammar, respond with your message AND include <new_content>the corrected full note content here</new_content>
- The content inside <new_content> tags will replace the entire note
- You can reference the current note content in your responses
- If the user has selected specific text, focus your changes on that selection while preserving the rest
- Keep responses focused and relevant
- Use the same language as the user
- Only include <new_content> tags when actually making changes to the note";

const CHAT_GUIDELINES: &str = "Guidelines:
- Be concise and helpful
- Answer questions, provide information, help brainstorm ideas
- You can reference the current note content in your responses
- If the user asks you to edit or modify the note, politely explain that you're in Chat mode and suggest they switch to Agent mode to make edits
- Keep responses focused and relevant
- Use the same language as the user
- NEVER include <new_content> tags - you cannot edit in this mode";

fn or_placeholder<'a>(s: &'a str, placeholder: &'a str) -> &'a str {
    if s.is_empty() { placeholder } else { s }
}

/// Prompt asking the model to continue `text`. Only the trailing context
/// window of `text` is included.
pub fn autocomplete(text: &str) -> Prompt {
    let context = last_chars(text, AUTOCOMPLETE_CONTEXT_CHARS);
    Prompt {
        system: AUTOCOMPLETE_SYSTEM.to_string(),
        user: format!("Continue this text naturally:\n\n{context}"),
        max_tokens: 50,
        temperature: 0.3,
    }
}

/// Prompt for a quick edit. Generates at the cursor when the selection is
/// blank, transforms the selection otherwise.
pub fn quick_edit(req: &QuickEditRequest) -> Prompt {
    let before = or_placeholder(&req.before_context, "(start of document)");
    let after = or_placeholder(&req.after_context, "(end of document)");

    let (system, user) = if req.is_generating() {
        (
            GENERATE_SYSTEM,
            format!(
                "Context before cursor:\n{before}\n\nContext after cursor:\n{after}\n\n\
                 User instruction: {}\n\nGenerate the content (no quotes):",
                req.instruction
            ),
        )
    } else {
        (
            TRANSFORM_SYSTEM,
            format!(
                "Context before selection:\n{before}\n\nSelected text to edit:\n{}\n\n\
                 Context after selection:\n{after}\n\nUser instruction: {}\n\n\
                 Return the edited text (no quotes):",
                req.selected_text, req.instruction
            ),
        )
    };

    Prompt {
        system: system.to_string(),
        user,
        max_tokens: 2000,
        temperature: 0.4,
    }
}

/// Prompt for one composer turn, embedding the note and prior turns.
pub fn composer(req: &ComposerRequest) -> Prompt {
    let note = or_placeholder(&req.note_content, "(empty note)");
    let selected = match req.selected_context.as_deref() {
        Some(ctx) if !ctx.is_empty() => format!(
            "\n\nUser's selected text (they are likely asking about this):\n\"\"\"\n{ctx}\n\"\"\""
        ),
        _ => String::new(),
    };

    let system = match req.mode {
        ComposerMode::Agent => format!(
            "You are a helpful AI assistant integrated into a notepad application called NotePAI.\n\
             You are in AGENT MODE - you can actively edit and modify the user's notes.\n\n\
             Current note content:\n\"\"\"\n{note}\n\"\"\"{selected}\n\n{AGENT_GUIDELINES}"
        ),
        ComposerMode::Chat => format!(
            "You are a helpful AI assistant integrated into a notepad application called NotePAI.\n\
             You are in CHAT MODE - you can answer questions and have conversations, but you CANNOT edit the user's notes.\n\n\
             Current note content (for reference only):\n\"\"\"\n{note}\n\"\"\"{selected}\n\n{CHAT_GUIDELINES}"
        ),
    };

    let user = if req.history.is_empty() {
        req.message.clone()
    } else {
        let history = req
            .history
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Previous conversation:\n{history}\n\nUser: {}\n\nAssistant:",
            req.message
        )
    };

    Prompt {
        system,
        user,
        max_tokens: 2000,
        temperature: 0.7,
    }
}

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::text_editor::EditCommand;

/// Which layer currently receives keys (for status bar display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Typing in the note.
    #[default]
    Edit,
    /// Writing a quick-edit instruction.
    QuickEdit,
    /// Reviewing a staged proposal.
    Review,
    /// Typing in the composer panel.
    Composer,
    /// Browsing chat history.
    History,
}

impl InputMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Edit => "EDIT",
            Self::QuickEdit => "QUICK EDIT",
            Self::Review => "REVIEW",
            Self::Composer => "COMPOSER",
            Self::History => "HISTORY",
        }
    }
}

/// Actions that can result from a key in the editor surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The key was consumed, nothing happens.
    None,
    /// Quit the application.
    Quit,
    /// A plain editing command for the document.
    Edit(EditCommand),
    /// Commit the ghost suggestion.
    AcceptSuggestion,
    /// Fetch a suggestion now instead of waiting for the pause.
    RequestSuggestion,
    /// Open the quick-edit prompt at the current selection.
    OpenQuickEdit,
    /// Open or toggle the composer, attaching the selection as context.
    ToggleComposer,
    /// Accept the pending proposal.
    AcceptProposal,
    /// Reject the pending proposal.
    RejectProposal,
    /// Cancel the top transient layer.
    Cancel,
    /// Save the note.
    Save,
    /// Show help.
    Help,
    /// Open the chat history picker.
    History,
}

/// Editor state that changes what a key means.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext {
    /// A ghost suggestion is currently shown.
    pub suggestion_visible: bool,
    /// A proposal is waiting for accept/reject.
    pub proposal_pending: bool,
}

fn ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Map a key in the editor surface to an action.
pub fn process_editor_key(key: KeyEvent, ctx: KeyContext) -> Action {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    // Global bindings first
    match key.code {
        KeyCode::Esc => return Action::Cancel,
        KeyCode::F(1) => return Action::Help,
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl(&key) => return Action::Quit,
        KeyCode::Char('s') if ctrl(&key) => return Action::Save,
        KeyCode::Char('k') if ctrl(&key) => return Action::OpenQuickEdit,
        KeyCode::Char('i') | KeyCode::Char('l') if ctrl(&key) => return Action::ToggleComposer,
        KeyCode::Char('o') if ctrl(&key) => return Action::History,
        _ => {}
    }

    // Review bindings while a proposal is pending; the note is read-only
    if ctx.proposal_pending {
        return match key.code {
            KeyCode::Enter if ctrl(&key) => Action::AcceptProposal,
            KeyCode::Char('y') if ctrl(&key) => Action::AcceptProposal,
            KeyCode::Backspace if ctrl(&key) => Action::RejectProposal,
            KeyCode::Char('n') if ctrl(&key) => Action::RejectProposal,
            _ => Action::None,
        };
    }

    let edit = |cmd: EditCommand| Action::Edit(cmd);
    match key.code {
        KeyCode::Tab if ctx.suggestion_visible => Action::AcceptSuggestion,
        KeyCode::Tab => edit(EditCommand::InsertStr("    ".to_string())),
        KeyCode::Char(' ') if ctrl(&key) => Action::RequestSuggestion,
        KeyCode::Char('a') if ctrl(&key) => edit(EditCommand::SelectAll),
        KeyCode::Char('z') if ctrl(&key) => edit(EditCommand::Undo),
        KeyCode::Char('y') | KeyCode::Char('r') if ctrl(&key) => edit(EditCommand::Redo),
        KeyCode::Char(c) if !ctrl(&key) && !key.modifiers.contains(KeyModifiers::ALT) => {
            edit(EditCommand::Insert(c))
        }
        KeyCode::Enter => edit(EditCommand::Newline),
        KeyCode::Backspace => edit(EditCommand::Backspace),
        KeyCode::Delete => edit(EditCommand::Delete),
        KeyCode::Left if ctrl(&key) => edit(EditCommand::WordLeft { extend: shift }),
        KeyCode::Right if ctrl(&key) => edit(EditCommand::WordRight { extend: shift }),
        KeyCode::Left => edit(EditCommand::Left { extend: shift }),
        KeyCode::Right => edit(EditCommand::Right { extend: shift }),
        KeyCode::Up => edit(EditCommand::Up { extend: shift }),
        KeyCode::Down => edit(EditCommand::Down { extend: shift }),
        KeyCode::Home if ctrl(&key) => edit(EditCommand::Top { extend: shift }),
        KeyCode::End if ctrl(&key) => edit(EditCommand::Bottom { extend: shift }),
        KeyCode::Home => edit(EditCommand::Home { extend: shift }),
        KeyCode::End => edit(EditCommand::End { extend: shift }),
        _ => Action::None,
    }
}

/// Actions available while the composer panel has focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerAction {
    None,
    /// Key went to the input line.
    Input,
    Submit,
    /// Return focus to the note.
    Blur,
    ToggleMode,
    NewChat,
    CloseTab,
    NextTab,
    PrevTab,
    History,
    Rename,
    ClearContexts,
    Quit,
}

/// Map a key while the composer is focused. Input keys are not consumed
/// here; the caller forwards `ComposerAction::Input` keys to the line input.
pub fn process_composer_key(key: KeyEvent) -> ComposerAction {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Esc => ComposerAction::Blur,
        KeyCode::Enter => ComposerAction::Submit,
        KeyCode::Tab => ComposerAction::ToggleMode,
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl(&key) => ComposerAction::Quit,
        KeyCode::Char('i') | KeyCode::Char('l') if ctrl(&key) => ComposerAction::Blur,
        KeyCode::Char('t') if ctrl(&key) => ComposerAction::NewChat,
        KeyCode::Char('w') if ctrl(&key) => ComposerAction::CloseTab,
        KeyCode::Char('o') if ctrl(&key) => ComposerAction::History,
        KeyCode::Char('e') if ctrl(&key) => ComposerAction::Rename,
        KeyCode::Char('x') if ctrl(&key) => ComposerAction::ClearContexts,
        KeyCode::PageDown if ctrl(&key) => ComposerAction::NextTab,
        KeyCode::PageUp if ctrl(&key) => ComposerAction::PrevTab,
        KeyCode::Right if alt => ComposerAction::NextTab,
        KeyCode::Left if alt => ComposerAction::PrevTab,
        _ if ctrl(&key) => ComposerAction::None,
        _ => ComposerAction::Input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl_key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_tab_accepts_only_with_suggestion() {
        let with = KeyContext {
            suggestion_visible: true,
            ..Default::default()
        };
        assert_eq!(process_editor_key(key(KeyCode::Tab), with), Action::AcceptSuggestion);
        assert!(matches!(
            process_editor_key(key(KeyCode::Tab), KeyContext::default()),
            Action::Edit(EditCommand::InsertStr(_))
        ));
    }

    #[test]
    fn test_shortcuts() {
        let ctx = KeyContext::default();
        assert_eq!(process_editor_key(ctrl_key('k'), ctx), Action::OpenQuickEdit);
        assert_eq!(process_editor_key(ctrl_key('i'), ctx), Action::ToggleComposer);
        assert_eq!(process_editor_key(ctrl_key(' '), ctx), Action::RequestSuggestion);
        assert_eq!(process_editor_key(key(KeyCode::Esc), ctx), Action::Cancel);
        assert_eq!(process_editor_key(ctrl_key('y'), ctx), Action::Edit(EditCommand::Redo));
    }

    #[test]
    fn test_review_keys_take_over() {
        let ctx = KeyContext {
            proposal_pending: true,
            ..Default::default()
        };
        let ctrl_enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL);
        let ctrl_bs = KeyEvent::new(KeyCode::Backspace, KeyModifiers::CONTROL);
        assert_eq!(process_editor_key(ctrl_enter, ctx), Action::AcceptProposal);
        assert_eq!(process_editor_key(ctrl_key('y'), ctx), Action::AcceptProposal);
        assert_eq!(process_editor_key(ctrl_bs, ctx), Action::RejectProposal);
        assert_eq!(process_editor_key(ctrl_key('n'), ctx), Action::RejectProposal);
        // Typing is blocked while reviewing
        assert_eq!(process_editor_key(key(KeyCode::Char('x')), ctx), Action::None);
    }

    #[test]
    fn test_shift_arrows_extend() {
        let shift_left = KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT);
        assert_eq!(
            process_editor_key(shift_left, KeyContext::default()),
            Action::Edit(EditCommand::Left { extend: true })
        );
    }

    #[test]
    fn test_composer_keys() {
        assert_eq!(process_composer_key(key(KeyCode::Enter)), ComposerAction::Submit);
        assert_eq!(process_composer_key(key(KeyCode::Tab)), ComposerAction::ToggleMode);
        assert_eq!(process_composer_key(ctrl_key('t')), ComposerAction::NewChat);
        assert_eq!(process_composer_key(key(KeyCode::Char('a'))), ComposerAction::Input);
        assert_eq!(process_composer_key(ctrl_key('z')), ComposerAction::None);
    }
}

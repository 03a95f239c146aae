pub mod completion;
pub mod composer;
pub mod executor;
pub mod model;
pub mod quick_edit;
pub mod review;
pub mod sessions;
pub mod ui;

use std::time::Instant;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{Frame, layout::Rect};
use rusqlite::Connection;
use tracing::{debug, warn};

use notepai_ai::AiError;
use notepai_ai::api::{AutocompleteResponse, ComposerResponse, QuickEditResponse};
use notepai_core::help_popup::{HelpPopup, notepad_help_entries};
use notepai_core::history_picker::{HistoryPicker, PickerItem};
use notepai_core::keybinds::{
    Action, ComposerAction, InputMode, KeyContext, process_composer_key, process_editor_key,
};
use notepai_core::line_input::LineInput;
use notepai_core::text_editor::{EditCommand, EditOutcome, TextEditor};

use completion::CompletionFetcher;
use composer::{Composer, ERROR_REPLY, InFlightTurn};
use executor::{AiExecutor, AiReply, AiRequest, RequestId};
use quick_edit::QuickEditPrompt;
use review::{PendingComposerChange, Proposal, QuickEditProposal, Review};
use sessions::{ChangeOutcome, ChatMessage, ChatStore, MessageChanges};

/// The notepad: one note, its AI helpers and the chat history.
///
/// All state lives here and is driven by two entry points: [`Notepad::handle_key`]
/// for input and [`Notepad::tick`] for timers and replies from the executor.
pub struct Notepad {
    editor: TextEditor,
    conn: Connection,
    executor: AiExecutor,
    completion: CompletionFetcher,
    quick_edit: Option<QuickEditPrompt>,
    composer: Composer,
    review: Review,
    store: ChatStore,
    help: HelpPopup,
    picker: HistoryPicker,
    next_request_id: RequestId,
    /// One-line message for the status bar, cleared on the next key.
    status: Option<String>,
    quit: bool,
}

impl Notepad {
    /// Load the saved note and chat history from `conn`.
    pub fn new(conn: Connection, executor: AiExecutor) -> anyhow::Result<Self> {
        let text = model::load_note(&conn)?;
        let store = ChatStore::load_from(&conn)?;
        debug!(
            chars = text.len(),
            chats = store.sessions().len(),
            "notepad loaded"
        );
        Ok(Self {
            editor: TextEditor::from_text(&text),
            conn,
            executor,
            completion: CompletionFetcher::new(),
            quick_edit: None,
            composer: Composer::new(),
            review: Review::new(),
            store,
            help: HelpPopup::new(),
            picker: HistoryPicker::new(),
            next_request_id: 0,
            status: None,
            quit: false,
        })
    }

    pub fn text(&self) -> &str {
        self.editor.text()
    }

    pub fn is_dirty(&self) -> bool {
        self.editor.is_dirty()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn review(&self) -> &Review {
        &self.review
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn quick_edit(&self) -> Option<&QuickEditPrompt> {
        self.quick_edit.as_ref()
    }

    /// Which layer currently receives keys.
    pub fn input_mode(&self) -> InputMode {
        if self.picker.visible {
            InputMode::History
        } else if self.review.is_pending() {
            InputMode::Review
        } else if self.quick_edit.is_some() {
            InputMode::QuickEdit
        } else if self.composer.focused {
            InputMode::Composer
        } else {
            InputMode::Edit
        }
    }

    /// The ghost text to draw, if any. Suggestions only show at the end of
    /// the note and never over another layer.
    pub fn visible_suggestion(&self) -> Option<&str> {
        if self.review.is_pending()
            || self.quick_edit.is_some()
            || !self.editor.document.is_cursor_at_end()
        {
            return None;
        }
        self.completion.suggestion().map(|s| s.text.as_str())
    }

    /// Save the note to the database.
    pub fn save(&mut self) -> anyhow::Result<()> {
        model::save_note(&self.conn, self.editor.text())?;
        self.editor.mark_clean();
        debug!("note saved");
        Ok(())
    }

    /// Save only if there are unsaved changes.
    pub fn save_if_dirty(&mut self) -> anyhow::Result<()> {
        if self.editor.is_dirty() {
            self.save()?;
        }
        Ok(())
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        ui::render_notepad(frame, area, self);
    }

    fn next_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        self.next_request_id
    }

    // ── Ticking ──────────────────────────────────────────────────────

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Fire the debounced suggestion request and apply finished replies.
    pub fn tick_at(&mut self, now: Instant) {
        if !self.review.is_pending() {
            let cursor = self.editor.document.cursor();
            if let Some(request) = self.completion.poll(now, self.editor.text(), cursor) {
                self.send_suggestion_request(request);
            }
        }

        while let Some(reply) = self.executor.try_recv() {
            match reply {
                AiReply::Autocomplete { id, result } => self.on_autocomplete_reply(id, result),
                AiReply::QuickEdit { id, result } => self.on_quick_edit_reply(id, result),
                AiReply::Compose { id, result } => self.on_compose_reply(id, result),
            }
        }
    }

    fn send_suggestion_request(&mut self, request: completion::SuggestionRequest) {
        let sent = self.executor.send(AiRequest::Autocomplete {
            id: request.id,
            req: request.req,
        });
        if !sent {
            warn!("executor stopped; suggestion not requested");
            self.completion.dismiss();
        }
    }

    fn on_autocomplete_reply(&mut self, id: RequestId, result: Result<AutocompleteResponse, AiError>) {
        self.completion.on_reply(id, result);
    }

    fn on_quick_edit_reply(&mut self, id: RequestId, result: Result<QuickEditResponse, AiError>) {
        let Some(prompt) = self.quick_edit.as_mut() else {
            debug!(id, "quick edit reply after prompt closed");
            return;
        };
        if !prompt.claim_reply(id) {
            debug!(id, "dropping quick edit reply for another prompt");
            return;
        }
        let range = prompt.range();

        match result {
            Ok(resp) if resp.result.is_empty() => {
                prompt.notice = Some("No result. Try another instruction.".to_string());
            }
            Ok(resp) => {
                self.quick_edit = None;
                let Some(proposal) = QuickEditProposal::new(self.editor.text(), range, resp.result)
                else {
                    warn!("quick edit range no longer matches the note");
                    return;
                };
                if self.review.stage(Proposal::QuickEdit(proposal)).is_err() {
                    warn!("a proposal is already pending; quick edit dropped");
                    self.status = Some("Another change is waiting for review".to_string());
                }
            }
            Err(e) => {
                warn!(error = %e, "quick edit failed");
                self.quick_edit = None;
                self.editor.document.clear_selection();
                self.status = Some("Quick edit failed".to_string());
            }
        }
    }

    fn on_compose_reply(&mut self, id: RequestId, result: Result<ComposerResponse, AiError>) {
        let Some(turn) = self.composer.claim_reply(id) else {
            debug!(id, "dropping unexpected composer reply");
            return;
        };

        let message = match result {
            Ok(resp) => {
                let mut message = ChatMessage::assistant(resp.response);
                // Chat mode never edits, whatever the reply contains
                let proposed = resp.new_content.filter(|_| turn.mode.can_edit());
                if let Some(proposed) = proposed {
                    message = message.with_changes(MessageChanges {
                        original: self.editor.text().to_string(),
                        proposed: proposed.clone(),
                        outcome: None,
                    });
                    self.stage_composer_change(proposed, &turn);
                }
                message
            }
            Err(e) => {
                warn!(error = %e, "composer request failed");
                ChatMessage::assistant(ERROR_REPLY)
            }
        };
        self.append_to(&turn.session_id, message);
    }

    fn stage_composer_change(&mut self, proposed: String, turn: &InFlightTurn) {
        if proposed == self.editor.text() {
            debug!("composer proposed the current note; nothing to review");
            return;
        }
        let change = PendingComposerChange {
            original: self.editor.text().to_string(),
            proposed,
            session_id: turn.session_id.clone(),
        };
        if self.review.stage(Proposal::Composer(change)).is_err() {
            warn!("a proposal is already pending; composer change not staged");
            self.status = Some("Another change is waiting for review".to_string());
        }
    }

    fn append_to(&mut self, session_id: &str, message: ChatMessage) {
        match self.store.append_message_to(&self.conn, session_id, message) {
            Ok(true) => {}
            Ok(false) => debug!(session_id, "chat is gone; message dropped"),
            Err(e) => warn!(error = %e, "failed to save chat"),
        }
    }

    // ── Key handling ─────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.handle_key_at(key, Instant::now());
    }

    /// Route a key to the topmost layer that wants it.
    pub fn handle_key_at(&mut self, key: KeyEvent, now: Instant) {
        self.status = None;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if key.code == KeyCode::Esc {
            self.cancel_top_layer();
            return;
        }
        if self.help.visible {
            self.handle_help_key(key);
            return;
        }

        match key.code {
            KeyCode::F(1) => {
                self.help.show("NotePAI Help", notepad_help_entries());
                return;
            }
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => {
                self.quit = true;
                return;
            }
            KeyCode::Char('s') if ctrl => {
                self.save_with_status();
                return;
            }
            _ => {}
        }

        if self.picker.visible {
            self.handle_picker_key(key);
            return;
        }

        // Review keys win over every other layer while a proposal waits
        if self.review.is_pending() {
            let ctx = KeyContext {
                proposal_pending: true,
                ..Default::default()
            };
            match process_editor_key(key, ctx) {
                Action::AcceptProposal => return self.accept_proposal(),
                Action::RejectProposal => return self.reject_proposal(),
                _ => {}
            }
        }

        if self.quick_edit.is_some() {
            self.handle_quick_edit_key(key);
        } else if self.composer.focused {
            self.handle_composer_key(key);
        } else {
            self.handle_editor_key(key, now);
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::F(1) => self.help.hide(),
            KeyCode::Char('j') | KeyCode::Down => self.help.scroll_down(),
            KeyCode::Char('k') | KeyCode::Up => self.help.scroll_up(),
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent, now: Instant) {
        let ctx = KeyContext {
            suggestion_visible: self.visible_suggestion().is_some(),
            proposal_pending: self.review.is_pending(),
        };

        match process_editor_key(key, ctx) {
            Action::None => {}
            Action::Quit => self.quit = true,
            Action::Edit(cmd) => match self.editor.apply(cmd) {
                EditOutcome::Edited => self.completion.schedule(now),
                EditOutcome::Moved | EditOutcome::None => self.completion.dismiss(),
            },
            Action::AcceptSuggestion => self.accept_suggestion(),
            Action::RequestSuggestion => {
                let cursor = self.editor.document.cursor();
                if let Some(request) = self.completion.request_now(self.editor.text(), cursor) {
                    self.send_suggestion_request(request);
                }
            }
            Action::OpenQuickEdit => self.open_quick_edit(),
            Action::ToggleComposer => self.toggle_composer(),
            Action::AcceptProposal => self.accept_proposal(),
            Action::RejectProposal => self.reject_proposal(),
            Action::Cancel => self.cancel_top_layer(),
            Action::Save => self.save_with_status(),
            Action::Help => self.help.show("NotePAI Help", notepad_help_entries()),
            Action::History => self.open_history(),
        }
    }

    fn save_with_status(&mut self) {
        match self.save() {
            Ok(()) => self.status = Some("Saved".to_string()),
            Err(e) => {
                warn!(error = %e, "failed to save note");
                self.status = Some(format!("Save failed: {e}"));
            }
        }
    }

    /// Escape closes one layer: help, history, the pending proposal, the
    /// quick-edit prompt, a rename, composer focus, then the suggestion.
    fn cancel_top_layer(&mut self) {
        if self.help.visible {
            self.help.hide();
        } else if self.picker.visible {
            self.picker.close();
        } else if self.review.is_pending() {
            self.reject_proposal();
        } else if self.quick_edit.is_some() {
            self.quick_edit = None;
        } else if self.composer.renaming.is_some() {
            self.composer.renaming = None;
        } else if self.composer.focused {
            self.composer.focused = false;
        } else if self.completion.suggestion().is_some() {
            self.completion.dismiss();
        } else {
            self.editor.document.clear_selection();
        }
    }

    fn accept_suggestion(&mut self) {
        if !self.editor.document.is_cursor_at_end() {
            return;
        }
        if let Some(text) = self.completion.accept() {
            self.editor.document.clear_selection();
            self.editor.apply(EditCommand::InsertStr(text));
        }
    }

    // ── Quick edit ───────────────────────────────────────────────────

    fn open_quick_edit(&mut self) {
        if self.review.is_pending() {
            self.status = Some("Accept or reject the pending change first".to_string());
            return;
        }
        self.completion.dismiss();
        let range = self.editor.document.selection_or_cursor();
        self.quick_edit = Some(QuickEditPrompt::open(range));
    }

    fn handle_quick_edit_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Enter {
            self.submit_quick_edit();
            return;
        }
        let Some(prompt) = self.quick_edit.as_mut() else {
            return;
        };
        // Instruction is frozen while generating
        if !prompt.is_loading() && prompt.input.handle_key(key) {
            prompt.notice = None;
        }
    }

    fn submit_quick_edit(&mut self) {
        let Some(req) = self
            .quick_edit
            .as_ref()
            .and_then(|p| p.build_request(self.editor.text()))
        else {
            return;
        };
        let id = self.next_id();
        if !self.executor.send(AiRequest::QuickEdit { id, req }) {
            warn!("executor stopped; quick edit not sent");
            self.status = Some("Quick edit failed".to_string());
            self.quick_edit = None;
            return;
        }
        if let Some(prompt) = self.quick_edit.as_mut() {
            prompt.mark_sent(id);
        }
    }

    // ── Review ───────────────────────────────────────────────────────

    fn accept_proposal(&mut self) {
        let Some(proposal) = self.review.take() else {
            return;
        };
        // A prompt left open refers to the old text
        self.quick_edit = None;
        self.completion.dismiss();

        match proposal {
            Proposal::QuickEdit(p) => {
                if !p.applies_to(self.editor.text()) {
                    warn!("note changed under the quick edit; discarding it");
                    self.status = Some("The note changed; quick edit discarded".to_string());
                    return;
                }
                self.editor.splice(p.span(), &p.proposed);
            }
            Proposal::Composer(change) => {
                let len = self.editor.text().len();
                self.editor.splice(0..len, &change.proposed);
                self.append_to(
                    &change.session_id,
                    change.outcome_message(ChangeOutcome::Accepted),
                );
            }
        }
        self.status = Some("Change applied (Ctrl-z to undo)".to_string());
    }

    fn reject_proposal(&mut self) {
        let Some(proposal) = self.review.take() else {
            return;
        };
        if let Proposal::Composer(change) = proposal {
            self.append_to(
                &change.session_id,
                change.outcome_message(ChangeOutcome::Rejected),
            );
        }
        self.status = Some("Change rejected".to_string());
    }

    // ── Composer ─────────────────────────────────────────────────────

    /// Ctrl-i from the note: attach the selection and open the panel, or
    /// toggle the panel when nothing is selected.
    fn toggle_composer(&mut self) {
        let selected = self.editor.document.selected_text().map(str::to_string);
        match selected {
            Some(text) => {
                self.composer.attach_context(&text);
                self.open_composer();
            }
            None if self.composer.visible => self.composer.hide(),
            None => self.open_composer(),
        }
    }

    /// Show the panel with a current chat, creating one if needed.
    fn open_composer(&mut self) {
        if self.store.current_id().is_none() {
            if let Err(e) = self.store.create(&self.conn) {
                warn!(error = %e, "failed to create chat");
                return;
            }
        }
        self.composer.show();
    }

    fn handle_composer_key(&mut self, key: KeyEvent) {
        if let Some(input) = self.composer.renaming.as_mut() {
            if key.code == KeyCode::Enter {
                let title = input.take();
                self.composer.renaming = None;
                self.rename_current(&title);
            } else {
                input.handle_key(key);
            }
            return;
        }

        match process_composer_key(key) {
            ComposerAction::None => {}
            ComposerAction::Input => match key.code {
                KeyCode::Up => self.composer.scroll = self.composer.scroll.saturating_add(1),
                KeyCode::Down => self.composer.scroll = self.composer.scroll.saturating_sub(1),
                _ => {
                    self.composer.input.handle_key(key);
                }
            },
            ComposerAction::Submit => self.submit_composer(),
            ComposerAction::Blur => self.composer.focused = false,
            ComposerAction::ToggleMode => self.composer.toggle_mode(),
            ComposerAction::NewChat => {
                if let Err(e) = self.store.create(&self.conn) {
                    warn!(error = %e, "failed to create chat");
                }
                self.composer.scroll = 0;
            }
            ComposerAction::CloseTab => {
                let current = self.store.current_id().map(str::to_string);
                if let Some(id) = current {
                    if !self.store.close_tab(&id) {
                        self.composer.hide();
                    }
                }
                self.composer.scroll = 0;
            }
            ComposerAction::NextTab => {
                self.store.cycle_tab(1);
                self.composer.scroll = 0;
            }
            ComposerAction::PrevTab => {
                self.store.cycle_tab(-1);
                self.composer.scroll = 0;
            }
            ComposerAction::History => self.open_history(),
            ComposerAction::Rename => {
                if let Some(session) = self.store.current() {
                    self.composer.renaming = Some(LineInput::with_text(&session.title));
                }
            }
            ComposerAction::ClearContexts => self.composer.clear_contexts(),
            ComposerAction::Quit => self.quit = true,
        }
    }

    fn rename_current(&mut self, title: &str) {
        let Some(id) = self.store.current_id().map(str::to_string) else {
            return;
        };
        if let Err(e) = self.store.rename(&self.conn, &id, title) {
            warn!(error = %e, "failed to rename chat");
        }
    }

    fn submit_composer(&mut self) {
        let Some((message, contexts)) = self.composer.take_submission() else {
            return;
        };

        let session_id = match self.store.current_id() {
            Some(id) => id.to_string(),
            None => match self.store.create(&self.conn) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "failed to create chat");
                    return;
                }
            },
        };

        let history = self
            .store
            .get(&session_id)
            .map(|s| s.history())
            .unwrap_or_default();
        let req = self
            .composer
            .build_request(message.clone(), &contexts, self.editor.text(), history);
        let mode = req.mode;
        // The submitting session is always the current one
        let user = ChatMessage::user(message).with_contexts(contexts);
        if let Err(e) = self.store.append_message(&self.conn, user) {
            warn!(error = %e, "failed to save chat");
        }

        let id = self.next_id();
        if self.executor.send(AiRequest::Compose { id, req }) {
            self.composer.mark_sent(InFlightTurn {
                id,
                session_id,
                mode,
            });
        } else {
            warn!("executor stopped; composer request not sent");
            self.append_to(&session_id, ChatMessage::assistant(ERROR_REPLY));
        }
    }

    // ── History ──────────────────────────────────────────────────────

    fn open_history(&mut self) {
        self.picker.open("Chat History", Vec::new());
        self.refresh_history();
    }

    fn refresh_history(&mut self) {
        let items = self
            .store
            .search(self.picker.query.text(), Local::now())
            .into_iter()
            .flat_map(|group| {
                let section = group.bucket.label();
                group.sessions.into_iter().map(move |s| PickerItem {
                    label: s.title.clone(),
                    description: format!("{} messages", s.messages.len()),
                    id: s.id.clone(),
                    section: section.to_string(),
                })
            })
            .collect();
        self.picker.set_items(items);
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => {
                if let Some(id) = self.picker.selected_id().map(str::to_string) {
                    self.store.load(&id);
                    self.picker.close();
                    self.composer.show();
                    self.composer.scroll = 0;
                }
            }
            KeyCode::Down => self.picker.move_down(),
            KeyCode::Up => self.picker.move_up(),
            KeyCode::Char('n') if ctrl => self.picker.move_down(),
            KeyCode::Char('p') if ctrl => self.picker.move_up(),
            KeyCode::Char('d') if ctrl => {
                if let Some(id) = self.picker.selected_id().map(str::to_string) {
                    if let Err(e) = self.store.delete(&self.conn, &id) {
                        warn!(error = %e, "failed to delete chat");
                    }
                    // Deleting the open chat leaves nothing to show
                    if self.store.current_id().is_none() {
                        self.composer.hide();
                    }
                    self.refresh_history();
                }
            }
            KeyCode::Char('x') if ctrl => {
                if let Err(e) = self.store.clear_all(&self.conn) {
                    warn!(error = %e, "failed to clear chats");
                }
                self.composer.hide();
                self.picker.close();
            }
            _ => {
                if self.picker.handle_query_key(key) {
                    self.refresh_history();
                }
            }
        }
    }
}

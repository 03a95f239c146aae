//! Chat sessions: a bounded, persisted list plus the open-tab state of the
//! composer panel.
//!
//! Sessions are stored as one JSON array in the key-value table. Tabs and
//! the current session live in memory only.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use notepai_ai::api::HistoryTurn;
use notepai_core::db;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Key holding the serialized session list.
pub const SESSIONS_KEY: &str = "notepai-chat-sessions";

/// Sessions kept before the least recently updated one is evicted.
pub const MAX_SESSIONS: usize = 5;

const TITLE_CHARS: usize = 30;
const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOutcome {
    Accepted,
    Rejected,
}

/// A note change attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageChanges {
    pub original: String,
    pub proposed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ChangeOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Text the user attached from the note.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<MessageChanges>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            contexts: Vec::new(),
            changes: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(content)
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn with_changes(mut self, changes: MessageChanges) -> Self {
        self.changes = Some(changes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the user renames the chat; the title then stops following
    /// the first message.
    #[serde(default)]
    pub renamed: bool,
}

impl ChatSession {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            renamed: false,
        }
    }

    /// Prior turns in the shape the composer endpoint expects.
    pub fn history(&self) -> Vec<HistoryTurn> {
        self.messages
            .iter()
            .map(|m| HistoryTurn {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(needle))
    }
}

/// Title derived from the first user message.
pub fn derive_title(messages: &[ChatMessage]) -> String {
    let Some(first) = messages.iter().find(|m| m.role == Role::User) else {
        return DEFAULT_TITLE.to_string();
    };
    let content = first.content.trim();
    if content.chars().count() > TITLE_CHARS {
        let cut: String = content.chars().take(TITLE_CHARS).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}

// ── Date buckets ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateBucket {
    Today,
    Yesterday,
    LastWeek,
    Older,
}

impl DateBucket {
    pub fn label(&self) -> &'static str {
        match self {
            DateBucket::Today => "Today",
            DateBucket::Yesterday => "Yesterday",
            DateBucket::LastWeek => "Last 7 Days",
            DateBucket::Older => "Older",
        }
    }

    /// Bucket for a timestamp, by local calendar day relative to `now`.
    pub fn for_time(at: DateTime<Utc>, now: DateTime<Local>) -> Self {
        let days = (now.date_naive() - at.with_timezone(&Local).date_naive()).num_days();
        match days {
            i64::MIN..=0 => DateBucket::Today,
            1 => DateBucket::Yesterday,
            2..=6 => DateBucket::LastWeek,
            _ => DateBucket::Older,
        }
    }
}

/// Search results under one date heading, newest first.
#[derive(Debug, Clone)]
pub struct SearchGroup<'a> {
    pub bucket: DateBucket,
    pub sessions: Vec<&'a ChatSession>,
}

// ── Store ────────────────────────────────────────────────────────────

/// The session list and the composer's tab state.
pub struct ChatStore {
    sessions: Vec<ChatSession>,
    open_tabs: Vec<String>,
    current: Option<String>,
    clock: Box<dyn FnMut() -> DateTime<Utc>>,
}

impl ChatStore {
    /// Load persisted sessions. Unreadable data starts an empty list, and
    /// a list over the cap loses its least recently updated sessions.
    pub fn load_from(conn: &Connection) -> Result<Self> {
        let sessions: Vec<ChatSession> = match db::kv_get(conn, SESSIONS_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable chat sessions");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let overflow = sessions.len() > MAX_SESSIONS;
        let mut store = Self::with_sessions(sessions);
        if overflow {
            store.evict_overflow(None);
            store.persist(conn)?;
        }
        Ok(store)
    }

    pub fn with_sessions(sessions: Vec<ChatSession>) -> Self {
        Self {
            sessions,
            open_tabs: Vec::new(),
            current: None,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl FnMut() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn open_tabs(&self) -> &[String] {
        &self.open_tabs
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&ChatSession> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    /// Index of the current session among the open tabs.
    pub fn current_tab_index(&self) -> Option<usize> {
        let current = self.current.as_deref()?;
        self.open_tabs.iter().position(|id| id == current)
    }

    fn persist(&self, conn: &Connection) -> Result<()> {
        let json = serde_json::to_string(&self.sessions).context("serializing chat sessions")?;
        db::kv_set(conn, SESSIONS_KEY, &json)
    }

    /// Start a new empty session; it becomes current and gets a tab.
    pub fn create(&mut self, conn: &Connection) -> Result<String> {
        let session = ChatSession::new((self.clock)());
        let id = session.id.clone();
        self.sessions.push(session);
        self.evict_overflow(Some(&id));
        self.open_tabs.push(id.clone());
        self.current = Some(id.clone());
        self.persist(conn)?;
        debug!(%id, "created chat");
        Ok(id)
    }

    /// Drop the least recently updated sessions beyond the cap, never the
    /// one named by `keep`.
    fn evict_overflow(&mut self, keep: Option<&str>) {
        while self.sessions.len() > MAX_SESSIONS {
            let Some(idx) = self
                .sessions
                .iter()
                .enumerate()
                .filter(|(_, s)| Some(s.id.as_str()) != keep)
                .min_by_key(|(_, s)| s.updated_at)
                .map(|(i, _)| i)
            else {
                break;
            };
            let evicted = self.sessions.remove(idx);
            debug!(id = %evicted.id, "evicted oldest chat");
            self.close_tab(&evicted.id);
        }
    }

    /// Make an existing session current, opening a tab for it if needed.
    pub fn load(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if !self.open_tabs.iter().any(|t| t == id) {
            self.open_tabs.push(id.to_string());
        }
        self.current = Some(id.to_string());
        true
    }

    /// Change the current session among the open tabs.
    pub fn switch(&mut self, id: &str) -> bool {
        if !self.open_tabs.iter().any(|t| t == id) {
            return false;
        }
        self.current = Some(id.to_string());
        true
    }

    /// Switch to the tab `offset` positions away, wrapping.
    pub fn cycle_tab(&mut self, offset: isize) -> bool {
        let Some(idx) = self.current_tab_index() else {
            return false;
        };
        let len = self.open_tabs.len() as isize;
        let next = (idx as isize + offset).rem_euclid(len) as usize;
        self.current = Some(self.open_tabs[next].clone());
        true
    }

    /// Close a tab. If it was current, the tab now at the same position
    /// (or the one before it) takes over. Returns false once no tabs remain.
    pub fn close_tab(&mut self, id: &str) -> bool {
        if let Some(idx) = self.open_tabs.iter().position(|t| t == id) {
            self.open_tabs.remove(idx);
            if self.current.as_deref() == Some(id) {
                let promoted = idx.min(self.open_tabs.len().saturating_sub(1));
                self.current = self.open_tabs.get(promoted).cloned();
            }
        }
        !self.open_tabs.is_empty()
    }

    /// Remove a session for good. Returns false if it did not exist.
    ///
    /// Its tab is closed without promoting another one: deleting the
    /// current session leaves no current session.
    pub fn delete(&mut self, conn: &Connection, id: &str) -> Result<bool> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return Ok(false);
        }
        self.open_tabs.retain(|t| t != id);
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        self.persist(conn)?;
        debug!(%id, "deleted chat");
        Ok(true)
    }

    /// Set a custom title. Id, creation time and messages are untouched.
    pub fn rename(&mut self, conn: &Connection, id: &str, title: &str) -> Result<bool> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(false);
        }
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        session.title = title.to_string();
        session.renamed = true;
        self.persist(conn)?;
        Ok(true)
    }

    /// Forget every session and tab.
    pub fn clear_all(&mut self, conn: &Connection) -> Result<()> {
        self.sessions.clear();
        self.open_tabs.clear();
        self.current = None;
        db::kv_delete(conn, SESSIONS_KEY)
    }

    /// Append to the current session.
    pub fn append_message(&mut self, conn: &Connection, message: ChatMessage) -> Result<bool> {
        match self.current.clone() {
            Some(id) => self.append_message_to(conn, &id, message),
            None => Ok(false),
        }
    }

    /// Append to a given session, refreshing its timestamp and title.
    /// Returns false if the session no longer exists.
    pub fn append_message_to(
        &mut self,
        conn: &Connection,
        id: &str,
        message: ChatMessage,
    ) -> Result<bool> {
        let now = (self.clock)();
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        session.messages.push(message);
        session.updated_at = now;
        if !session.renamed {
            session.title = derive_title(&session.messages);
        }
        self.persist(conn)?;
        Ok(true)
    }

    /// Case-insensitive search over titles and message contents, grouped
    /// by how recently each session was updated.
    pub fn search(&self, query: &str, now: DateTime<Local>) -> Vec<SearchGroup<'_>> {
        let needle = query.trim().to_lowercase();
        let mut hits: Vec<&ChatSession> = self
            .sessions
            .iter()
            .filter(|s| needle.is_empty() || s.matches(&needle))
            .collect();
        hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut groups: Vec<SearchGroup> = Vec::new();
        for session in hits {
            let bucket = DateBucket::for_time(session.updated_at, now);
            match groups.iter_mut().find(|g| g.bucket == bucket) {
                Some(group) => group.sessions.push(session),
                None => groups.push(SearchGroup {
                    bucket,
                    sessions: vec![session],
                }),
            }
        }
        groups.sort_by_key(|g| g.bucket);
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;
    use std::rc::Rc;

    /// A clock that advances one minute per reading.
    fn stepping_clock() -> impl FnMut() -> DateTime<Utc> {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let tick = Rc::new(Cell::new(0));
        move || {
            let n = tick.get();
            tick.set(n + 1);
            start + Duration::minutes(n)
        }
    }

    fn store() -> (Connection, ChatStore) {
        let conn = db::open_memory_db().unwrap();
        let store = ChatStore::load_from(&conn).unwrap().with_clock(stepping_clock());
        (conn, store)
    }

    #[test]
    fn test_create_opens_tab_and_persists() {
        let (conn, mut store) = store();
        let id = store.create(&conn).unwrap();
        assert_eq!(store.current_id(), Some(id.as_str()));
        assert_eq!(store.open_tabs(), &[id.clone()]);
        assert_eq!(store.current().unwrap().title, "New Chat");

        let reloaded = ChatStore::load_from(&conn).unwrap();
        assert_eq!(reloaded.sessions().len(), 1);
        assert!(reloaded.open_tabs().is_empty());
    }

    #[test]
    fn test_never_more_than_five_sessions() {
        let (conn, mut store) = store();
        let first = store.create(&conn).unwrap();
        let second = store.create(&conn).unwrap();
        // Touch the first so the second becomes the oldest
        store.switch(&first);
        store
            .append_message(&conn, ChatMessage::user("hello"))
            .unwrap();
        for _ in 0..4 {
            store.create(&conn).unwrap();
        }
        assert_eq!(store.sessions().len(), MAX_SESSIONS);
        assert!(store.get(&second).is_none());
        assert!(store.get(&first).is_some());
        assert!(!store.open_tabs().contains(&second));
    }

    #[test]
    fn test_title_follows_first_user_message() {
        let (conn, mut store) = store();
        store.create(&conn).unwrap();
        store
            .append_message(
                &conn,
                ChatMessage::user("Please rewrite the introduction paragraph"),
            )
            .unwrap();
        store
            .append_message(&conn, ChatMessage::assistant("Sure"))
            .unwrap();
        assert_eq!(
            store.current().unwrap().title,
            "Please rewrite the introductio..."
        );
    }

    #[test]
    fn test_short_title_kept_whole() {
        let messages = vec![ChatMessage::assistant("hi"), ChatMessage::user("Fix typos")];
        assert_eq!(derive_title(&messages), "Fix typos");
        assert_eq!(derive_title(&[]), "New Chat");
    }

    #[test]
    fn test_rename_keeps_identity() {
        let (conn, mut store) = store();
        let id = store.create(&conn).unwrap();
        store
            .append_message(&conn, ChatMessage::user("first"))
            .unwrap();
        let before = store.current().unwrap().clone();

        assert!(store.rename(&conn, &id, "Groceries").unwrap());
        store
            .append_message(&conn, ChatMessage::user("second"))
            .unwrap();

        let after = store.current().unwrap();
        assert_eq!(after.title, "Groceries");
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.messages[0], before.messages[0]);
        assert!(!store.rename(&conn, &id, "  ").unwrap());
    }

    #[test]
    fn test_close_tab_promotes_neighbour() {
        let (conn, mut store) = store();
        let a = store.create(&conn).unwrap();
        let b = store.create(&conn).unwrap();
        let c = store.create(&conn).unwrap();

        store.switch(&b);
        assert!(store.close_tab(&b));
        assert_eq!(store.current_id(), Some(c.as_str()));

        assert!(store.close_tab(&c));
        assert_eq!(store.current_id(), Some(a.as_str()));

        assert!(!store.close_tab(&a));
        assert_eq!(store.current_id(), None);
        // Closing tabs never deletes sessions
        assert_eq!(store.sessions().len(), 3);
    }

    #[test]
    fn test_close_other_tab_keeps_current() {
        let (conn, mut store) = store();
        let a = store.create(&conn).unwrap();
        let b = store.create(&conn).unwrap();
        store.close_tab(&a);
        assert_eq!(store.current_id(), Some(b.as_str()));
    }

    #[test]
    fn test_load_and_switch() {
        let (conn, mut store) = store();
        let a = store.create(&conn).unwrap();
        let b = store.create(&conn).unwrap();
        store.close_tab(&a);

        assert!(!store.switch(&a));
        assert!(store.load(&a));
        assert_eq!(store.open_tabs(), &[b.clone(), a.clone()]);
        assert!(store.switch(&b));
        assert_eq!(store.open_tabs().len(), 2);
        assert!(!store.load("missing"));
    }

    #[test]
    fn test_cycle_tab_wraps() {
        let (conn, mut store) = store();
        let a = store.create(&conn).unwrap();
        let b = store.create(&conn).unwrap();
        store.cycle_tab(1);
        assert_eq!(store.current_id(), Some(a.as_str()));
        store.cycle_tab(-1);
        assert_eq!(store.current_id(), Some(b.as_str()));
    }

    #[test]
    fn test_delete_and_clear_all() {
        let (conn, mut store) = store();
        let a = store.create(&conn).unwrap();
        let b = store.create(&conn).unwrap();
        let c = store.create(&conn).unwrap();

        // Deleting another session keeps the current one
        assert!(store.delete(&conn, &a).unwrap());
        assert_eq!(store.current_id(), Some(c.as_str()));
        assert_eq!(store.open_tabs(), &[b.clone(), c.clone()]);

        // Deleting the current session promotes nothing
        assert!(store.delete(&conn, &c).unwrap());
        assert_eq!(store.current_id(), None);
        assert_eq!(store.open_tabs(), &[b.clone()]);
        assert_eq!(ChatStore::load_from(&conn).unwrap().sessions().len(), 1);

        assert!(!store.delete(&conn, &c).unwrap());

        store.create(&conn).unwrap();
        store.clear_all(&conn).unwrap();
        assert!(store.sessions().is_empty());
        assert!(store.open_tabs().is_empty());
        assert_eq!(db::kv_get(&conn, SESSIONS_KEY).unwrap(), None);
        assert!(ChatStore::load_from(&conn).unwrap().sessions().is_empty());
    }

    #[test]
    fn test_load_trims_oversized_list() {
        let conn = db::open_memory_db().unwrap();
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let sessions: Vec<ChatSession> = (0..7)
            .map(|i| ChatSession::new(base + Duration::minutes(i)))
            .collect();
        let newest: Vec<String> = sessions[2..].iter().map(|s| s.id.clone()).collect();
        db::kv_set(&conn, SESSIONS_KEY, &serde_json::to_string(&sessions).unwrap()).unwrap();

        let store = ChatStore::load_from(&conn).unwrap();
        let ids: Vec<String> = store.sessions().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, newest);
        assert_eq!(ChatStore::load_from(&conn).unwrap().sessions().len(), MAX_SESSIONS);
    }

    #[test]
    fn test_unreadable_sessions_start_empty() {
        let conn = db::open_memory_db().unwrap();
        db::kv_set(&conn, SESSIONS_KEY, "not json").unwrap();
        assert!(ChatStore::load_from(&conn).unwrap().sessions().is_empty());
    }

    #[test]
    fn test_buckets() {
        let now = Local::now();
        let utc = |d: chrono::DateTime<Local>| d.with_timezone(&Utc);
        assert_eq!(DateBucket::for_time(utc(now), now), DateBucket::Today);
        assert_eq!(
            DateBucket::for_time(utc(now - Duration::days(1)), now),
            DateBucket::Yesterday
        );
        assert_eq!(
            DateBucket::for_time(utc(now - Duration::days(6)), now),
            DateBucket::LastWeek
        );
        assert_eq!(
            DateBucket::for_time(utc(now - Duration::days(7)), now),
            DateBucket::Older
        );
    }

    #[test]
    fn test_search_groups_matches() {
        let now = Local::now();
        let session = |title: &str, content: &str, days: i64| {
            let at = (now - Duration::days(days)).with_timezone(&Utc);
            ChatSession {
                id: title.to_string(),
                title: title.to_string(),
                messages: vec![ChatMessage::user(content)],
                created_at: at,
                updated_at: at,
                renamed: false,
            }
        };
        let store = ChatStore::with_sessions(vec![
            session("Old recipes", "pasta", 30),
            session("Shopping", "buy PASTA and milk", 0),
            session("Work", "standup notes", 0),
            session("Weekend", "hike", 3),
        ]);

        let groups = store.search("pasta", now);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].bucket, DateBucket::Today);
        assert_eq!(groups[0].sessions[0].id, "Shopping");
        assert_eq!(groups[1].bucket, DateBucket::Older);

        let groups = store.search("WORK", now);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].sessions[0].id, "Work");

        let all: usize = store.search("", now).iter().map(|g| g.sessions.len()).sum();
        assert_eq!(all, 4);
    }
}

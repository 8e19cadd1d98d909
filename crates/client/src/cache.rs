//! Two-tier session cache: an ephemeral local working set in front of the
//! authoritative server store.
//!
//! Entries created while the service is unreachable live under a
//! [`SessionKey::Local`] key until a later [`SessionCache::save`] promotes
//! them. Reconciliation is "last local write wins": a dirty local entry is
//! pushed over the remote copy, a clean one is replaced by it.
//!
//! Transcript edits are tracked as a count of messages already persisted, so
//! a push only appends the tail and never rewrites history.

use std::collections::HashSet;

use chrono::Utc;
use playground_core::pagination::MAX_LIMIT;
use playground_core::session::{
    validate_name, ChatMessage, Language, MessageDraft, MessageRole, SessionFields,
};
use playground_core::types::{DbId, Timestamp};
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::{Session, SessionSummary};
use crate::playground::{ListQuery, PlaygroundApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Not yet known to the server.
    Local(Uuid),
    Remote(DbId),
}

impl SessionKey {
    pub fn remote_id(self) -> Option<DbId> {
        match self {
            SessionKey::Remote(id) => Some(id),
            SessionKey::Local(_) => None,
        }
    }
}

/// What the editor needs to render a loaded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub code: String,
    pub language: Language,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub struct CachedSession {
    pub key: SessionKey,
    pub name: String,
    pub description: String,
    pub code: String,
    pub language: Language,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub messages: Vec<ChatMessage>,
    pub last_modified: Timestamp,
    /// `messages[..synced_messages]` are known to be persisted remotely.
    synced_messages: usize,
    /// List responses carry no transcript; it is fetched on load.
    messages_loaded: bool,
    /// Field edits not yet pushed.
    dirty: bool,
}

impl CachedSession {
    fn local(name: String) -> Self {
        Self {
            key: SessionKey::Local(Uuid::new_v4()),
            name,
            description: String::new(),
            code: String::new(),
            language: Language::default(),
            tags: Vec::new(),
            is_public: false,
            messages: Vec::new(),
            last_modified: Utc::now(),
            synced_messages: 0,
            messages_loaded: true,
            dirty: true,
        }
    }

    fn from_summary(summary: SessionSummary) -> Self {
        Self {
            key: SessionKey::Remote(summary.id),
            name: summary.name,
            description: summary.description,
            code: summary.code,
            language: summary.language,
            tags: summary.tags,
            is_public: summary.is_public,
            messages: Vec::new(),
            last_modified: summary.last_modified,
            synced_messages: 0,
            messages_loaded: false,
            dirty: false,
        }
    }

    fn apply_summary(&mut self, summary: &SessionSummary) {
        self.name = summary.name.clone();
        self.description = summary.description.clone();
        self.code = summary.code.clone();
        self.language = summary.language;
        self.tags = summary.tags.clone();
        self.is_public = summary.is_public;
        self.last_modified = summary.last_modified;
    }

    fn apply_session_fields(&mut self, session: &Session) {
        self.name = session.name.clone();
        self.description = session.description.clone();
        self.code = session.code.clone();
        self.language = session.language;
        self.tags = session.tags.clone();
        self.is_public = session.is_public;
        self.last_modified = session.last_modified;
    }

    /// Take the remote transcript, keeping unsynced local messages after it.
    fn merge_transcript(&mut self, remote: Vec<ChatMessage>) {
        let pending = self.pending_messages().to_vec();
        self.messages = remote;
        self.synced_messages = self.messages.len();
        self.messages.extend(pending);
        self.messages_loaded = true;
    }

    fn pending_messages(&self) -> &[ChatMessage] {
        &self.messages[self.synced_messages.min(self.messages.len())..]
    }

    fn fields(&self) -> SessionFields {
        SessionFields {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            code: Some(self.code.clone()),
            language: Some(self.language.as_str().to_string()),
            tags: Some(self.tags.clone()),
            is_public: Some(self.is_public),
        }
    }

    fn editor_state(&self) -> EditorState {
        EditorState {
            code: self.code.clone(),
            language: self.language,
            messages: self.messages.clone(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.key, SessionKey::Local(_))
    }

    /// True when something here has not reached the server yet.
    pub fn needs_push(&self) -> bool {
        self.is_local() || self.dirty || !self.pending_messages().is_empty()
    }
}

pub struct SessionCache {
    api: PlaygroundApi,
    /// Most recently modified first.
    entries: Vec<CachedSession>,
    active: Option<SessionKey>,
}

impl SessionCache {
    pub fn new(api: PlaygroundApi) -> Self {
        Self {
            api,
            entries: Vec::new(),
            active: None,
        }
    }

    pub fn entries(&self) -> &[CachedSession] {
        &self.entries
    }

    pub fn get(&self, key: SessionKey) -> Option<&CachedSession> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn active_key(&self) -> Option<SessionKey> {
        self.active
    }

    pub fn active(&self) -> Option<&CachedSession> {
        self.active.and_then(|key| self.get(key))
    }

    // -----------------------------------------------------------------------
    // Create / load
    // -----------------------------------------------------------------------

    /// Start a new session and make it active.
    ///
    /// The entry is inserted locally first. If the server accepts it the entry
    /// is re-keyed to the server id; otherwise it stays local-only and the
    /// local key is returned.
    pub async fn create(&mut self, name: &str) -> Result<SessionKey, ClientError> {
        let entry = CachedSession::local(validate_name(name)?);
        let key = entry.key;
        let fields = entry.fields();
        self.entries.insert(0, entry);
        self.active = Some(key);

        match self.api.create_session(&fields).await {
            Ok(session) => {
                let remote = self.rekey(key, &session)?;
                tracing::debug!(session_id = session.id, "Session created remotely");
                Ok(remote)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session kept local-only");
                Ok(key)
            }
        }
    }

    /// Make `key` the active session and return its editor state.
    ///
    /// Remote entries whose transcript has not been fetched yet are loaded
    /// from the server first. A server 404 drops the entry.
    pub async fn load(&mut self, key: SessionKey) -> Result<EditorState, ClientError> {
        let index = self.index_of(key)?;

        if let (SessionKey::Remote(id), false) = (key, self.entries[index].messages_loaded) {
            match self.api.get_session(id).await {
                Ok(session) => {
                    let index = self.index_of(key)?;
                    let entry = &mut self.entries[index];
                    if !entry.dirty {
                        entry.apply_session_fields(&session);
                    }
                    entry.merge_transcript(session.messages);
                }
                Err(e) if e.is_not_found() => {
                    self.remove(key);
                    return Err(e);
                }
                Err(e) => tracing::warn!(session_id = id, error = %e, "Using cached session"),
            }
        }

        self.active = Some(key);
        Ok(self.entry(key)?.editor_state())
    }

    // -----------------------------------------------------------------------
    // Local edits
    // -----------------------------------------------------------------------

    pub fn update_code(&mut self, code: impl Into<String>) -> Result<(), ClientError> {
        let entry = self.active_mut()?;
        entry.code = code.into();
        entry.dirty = true;
        Ok(())
    }

    pub fn set_language(&mut self, language: Language) -> Result<(), ClientError> {
        let entry = self.active_mut()?;
        entry.language = language;
        entry.dirty = true;
        Ok(())
    }

    /// Append to the active transcript. Persisted on the next save.
    pub fn push_message(&mut self, role: MessageRole, content: &str) -> Result<(), ClientError> {
        let message = MessageDraft::new(Some(role.as_str()), Some(content))?.stamp(Utc::now());
        self.active_mut()?.messages.push(message);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Server reconciliation
    // -----------------------------------------------------------------------

    /// Push the active session upstream. Returns its (possibly new) key.
    pub async fn save(&mut self) -> Result<SessionKey, ClientError> {
        let key = self.active.ok_or(ClientError::NoActiveSession)?;
        self.push(key).await
    }

    /// Remove locally, then delete on the server. A server 404 counts as
    /// already deleted.
    pub async fn delete(&mut self, key: SessionKey) -> Result<(), ClientError> {
        if !self.remove(key) {
            return Err(ClientError::UnknownSession);
        }

        if let SessionKey::Remote(id) = key {
            match self.api.delete_session(id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::debug!(session_id = id, "Session already gone remotely");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Reconcile with the caller's server-side sessions.
    ///
    /// Unknown remote sessions are added, clean local copies take the remote
    /// metadata, dirty ones are pushed, and clean entries the server no
    /// longer has are dropped. Local-only entries are left alone.
    pub async fn sync(&mut self) -> Result<(), ClientError> {
        let remote = self.fetch_all().await?;
        let remote_ids: HashSet<DbId> = remote.iter().map(|s| s.id).collect();

        self.entries.retain(|e| match e.key {
            SessionKey::Remote(id) => remote_ids.contains(&id) || e.needs_push(),
            SessionKey::Local(_) => true,
        });
        if let Some(active) = self.active {
            if self.get(active).is_none() {
                self.active = None;
            }
        }

        let mut to_push = Vec::new();
        for summary in remote {
            let key = SessionKey::Remote(summary.id);
            match self.entries.iter_mut().find(|e| e.key == key) {
                Some(entry) if entry.needs_push() => to_push.push(key),
                Some(entry) => {
                    if entry.last_modified != summary.last_modified {
                        entry.apply_summary(&summary);
                        entry.messages_loaded = false;
                    }
                }
                None => self.entries.push(CachedSession::from_summary(summary)),
            }
        }

        for key in to_push {
            if let Err(e) = self.push(key).await {
                tracing::warn!(?key, error = %e, "Failed to push local changes");
            }
        }

        self.entries
            .sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(())
    }

    /// Create or update `key` remotely and append its unsynced messages.
    async fn push(&mut self, key: SessionKey) -> Result<SessionKey, ClientError> {
        let snapshot = self.entry(key)?.clone();

        let key = match key {
            SessionKey::Local(_) => {
                let session = self.api.create_session(&snapshot.fields()).await?;
                self.rekey(key, &session)?
            }
            SessionKey::Remote(id) if snapshot.dirty => {
                let session = self.api.update_session(id, &snapshot.fields()).await?;
                let entry = self.entry_mut(key)?;
                entry.dirty = false;
                entry.last_modified = session.last_modified;
                key
            }
            remote => remote,
        };

        let Some(id) = key.remote_id() else {
            return Ok(key);
        };

        loop {
            let next = match self.entry(key)?.pending_messages().first() {
                Some(message) => message.clone(),
                None => break,
            };
            let session = self.api.add_message(id, next.role, &next.content).await?;
            let entry = self.entry_mut(key)?;
            entry.synced_messages += 1;
            entry.last_modified = session.last_modified;
        }

        Ok(key)
    }

    async fn fetch_all(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let mut sessions = Vec::new();
        let mut page = 1;
        loop {
            let list = self
                .api
                .list_sessions(&ListQuery::page(page, MAX_LIMIT))
                .await?;
            sessions.extend(list.sessions);
            if page >= list.pagination.total {
                break;
            }
            page += 1;
        }
        Ok(sessions)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Attach a freshly created server session to the local entry `key`.
    /// Local messages are kept as pending so the next push appends them.
    fn rekey(&mut self, key: SessionKey, session: &Session) -> Result<SessionKey, ClientError> {
        let remote = SessionKey::Remote(session.id);
        let entry = self.entry_mut(key)?;
        entry.key = remote;
        entry.dirty = false;
        entry.synced_messages = 0;
        entry.messages_loaded = true;
        entry.last_modified = session.last_modified;
        if self.active == Some(key) {
            self.active = Some(remote);
        }
        Ok(remote)
    }

    fn index_of(&self, key: SessionKey) -> Result<usize, ClientError> {
        self.entries
            .iter()
            .position(|e| e.key == key)
            .ok_or(ClientError::UnknownSession)
    }

    fn entry(&self, key: SessionKey) -> Result<&CachedSession, ClientError> {
        self.get(key).ok_or(ClientError::UnknownSession)
    }

    fn entry_mut(&mut self, key: SessionKey) -> Result<&mut CachedSession, ClientError> {
        self.entries
            .iter_mut()
            .find(|e| e.key == key)
            .ok_or(ClientError::UnknownSession)
    }

    fn active_mut(&mut self) -> Result<&mut CachedSession, ClientError> {
        let key = self.active.ok_or(ClientError::NoActiveSession)?;
        self.entry_mut(key)
    }

    fn remove(&mut self, key: SessionKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        if self.active == Some(key) {
            self.active = None;
        }
        self.entries.len() != before
    }
}

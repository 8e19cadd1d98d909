//! In-process [`Store`] backend.
//!
//! Holds everything in a single `RwLock`, so each operation is atomic with
//! respect to every other. Timestamps come from a per-store clock that never
//! repeats a value, which keeps "most recent first" orderings deterministic
//! even when writes land within the same microsecond.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use playground_core::pagination::PageRequest;
use playground_core::session::{MessageDraft, SessionDraft, SessionPatch};
use playground_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::session::{
    OwnedSessionFilter, PlaygroundSession, PublicSession, PublicSessionFilter, SessionOwner,
    SessionSummary,
};
use crate::models::user::{CreateUser, UpdateProfile, User};
use crate::models::Page;
use crate::store::{SessionStore, Store, UserStore};

#[derive(Default)]
struct Inner {
    users: BTreeMap<DbId, User>,
    sessions: BTreeMap<DbId, PlaygroundSession>,
    next_user_id: DbId,
    next_session_id: DbId,
    last_tick: Option<Timestamp>,
}

impl Inner {
    /// Current time, strictly after any value previously handed out.
    fn tick(&mut self) -> Timestamp {
        let now = Utc::now();
        let ts = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(ts);
        ts
    }

    fn owned_mut(&mut self, id: DbId, owner: DbId) -> Option<&mut PlaygroundSession> {
        self.sessions.get_mut(&id).filter(|s| s.user_id == owner)
    }
}

/// A [`Store`] that keeps all data in memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Case-insensitive literal substring match.
fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total_count = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    Page { items, total_count }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::Conflict(
                "Duplicate value violates unique constraint: uq_users_email".to_string(),
            ));
        }

        inner.next_user_id += 1;
        let now = inner.tick();
        let user = User {
            id: inner.next_user_id,
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            name: input.name.clone(),
            avatar: None,
            is_email_verified: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_profile(
        &self,
        id: DbId,
        input: &UpdateProfile,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;
        let now = inner.tick();
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            user.name = name.clone();
        }
        if let Some(avatar) = &input.avatar {
            user.avatar = Some(avatar.clone());
        }
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let now = inner.tick();
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_login(&self, id: DbId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let now = inner.tick();
        if let Some(user) = inner.users.get_mut(&id) {
            user.last_login_at = Some(now);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(
        &self,
        owner: DbId,
        draft: &SessionDraft,
    ) -> Result<PlaygroundSession, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_session_id += 1;
        let now = inner.tick();
        let session = PlaygroundSession {
            id: inner.next_session_id,
            user_id: owner,
            name: draft.name.clone(),
            description: draft.description.clone(),
            code: draft.code.clone(),
            language: draft.language,
            messages: Vec::new(),
            is_public: draft.is_public,
            tags: draft.tags.clone(),
            last_modified: now,
            created_at: now,
            updated_at: now,
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: DbId) -> Result<Option<PlaygroundSession>, StoreError> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn find_owned_session(
        &self,
        id: DbId,
        owner: DbId,
    ) -> Result<Option<PlaygroundSession>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(&id)
            .filter(|s| s.user_id == owner)
            .cloned())
    }

    async fn update_owned_session(
        &self,
        id: DbId,
        owner: DbId,
        patch: &SessionPatch,
    ) -> Result<Option<PlaygroundSession>, StoreError> {
        let mut inner = self.inner.write().await;
        let now = inner.tick();
        let Some(session) = inner.owned_mut(id, owner) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            session.name = name.clone();
        }
        if let Some(description) = &patch.description {
            session.description = description.clone();
        }
        if let Some(code) = &patch.code {
            session.code = code.clone();
        }
        if let Some(language) = patch.language {
            session.language = language;
        }
        if let Some(tags) = &patch.tags {
            session.tags = tags.clone();
        }
        if let Some(is_public) = patch.is_public {
            session.is_public = is_public;
        }
        session.last_modified = now;
        session.updated_at = now;
        Ok(Some(session.clone()))
    }

    async fn append_message(
        &self,
        id: DbId,
        owner: DbId,
        message: MessageDraft,
    ) -> Result<Option<PlaygroundSession>, StoreError> {
        let mut inner = self.inner.write().await;
        let now = inner.tick();
        let Some(session) = inner.owned_mut(id, owner) else {
            return Ok(None);
        };
        session.messages.push(message.stamp(now));
        session.last_modified = now;
        session.updated_at = now;
        Ok(Some(session.clone()))
    }

    async fn delete_owned_session(&self, id: DbId, owner: DbId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.owned_mut(id, owner).is_none() {
            return Ok(false);
        }
        Ok(inner.sessions.remove(&id).is_some())
    }

    async fn list_owned_sessions(
        &self,
        owner: DbId,
        filter: &OwnedSessionFilter,
        page: PageRequest,
    ) -> Result<Page<SessionSummary>, StoreError> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let inner = self.inner.read().await;

        let mut matches: Vec<&PlaygroundSession> = inner
            .sessions
            .values()
            .filter(|s| s.user_id == owner)
            .filter(|s| match &needle {
                None => true,
                Some(n) => {
                    contains_ci(&s.name, n)
                        || contains_ci(&s.description, n)
                        || s.tags.iter().any(|t| contains_ci(t, n))
                }
            })
            .collect();
        matches.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.id.cmp(&a.id))
        });

        let summaries = matches.into_iter().map(SessionSummary::from).collect();
        Ok(paginate(summaries, page))
    }

    async fn list_public_sessions(
        &self,
        filter: &PublicSessionFilter,
        page: PageRequest,
    ) -> Result<Page<PublicSession>, StoreError> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let inner = self.inner.read().await;

        let mut matches: Vec<&PlaygroundSession> = inner
            .sessions
            .values()
            .filter(|s| s.is_public)
            .filter(|s| match &needle {
                None => true,
                Some(n) => contains_ci(&s.name, n) || contains_ci(&s.description, n),
            })
            .filter(|s| filter.tags.is_empty() || s.tags.iter().any(|t| filter.tags.contains(t)))
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let public = matches
            .into_iter()
            .filter_map(|s| {
                let owner = inner.users.get(&s.user_id)?;
                Some(PublicSession::new(
                    s,
                    SessionOwner {
                        name: owner.name.clone(),
                        avatar: owner.avatar.clone(),
                    },
                ))
            })
            .collect();
        Ok(paginate(public, page))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> bool {
        true
    }
}

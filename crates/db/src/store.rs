//! The persistence seam used by the HTTP layer.
//!
//! Handlers hold an `Arc<dyn Store>`. Production wires [`PgStore`]; tests and
//! local tooling can use [`MemoryStore`](crate::MemoryStore), which honors the
//! same ownership, ordering, and filtering rules.

use async_trait::async_trait;
use chrono::Utc;
use playground_core::pagination::PageRequest;
use playground_core::session::{MessageDraft, SessionDraft, SessionPatch};
use playground_core::types::DbId;

use crate::error::StoreError;
use crate::models::session::{
    OwnedSessionFilter, PlaygroundSession, PublicSession, PublicSessionFilter, SessionSummary,
};
use crate::models::user::{CreateUser, UpdateProfile, User};
use crate::models::Page;
use crate::repositories::{SessionRepo, UserRepo};
use crate::DbPool;

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken email yields [`StoreError::Conflict`].
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Look up by normalized (lower-cased) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn update_profile(
        &self,
        id: DbId,
        input: &UpdateProfile,
    ) -> Result<Option<User>, StoreError>;

    /// Replace the password hash. Returns `false` if the user does not exist.
    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError>;

    async fn record_login(&self, id: DbId) -> Result<(), StoreError>;
}

/// Session persistence. Every `*_owned` operation treats "absent" and
/// "owned by someone else" identically.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(
        &self,
        owner: DbId,
        draft: &SessionDraft,
    ) -> Result<PlaygroundSession, StoreError>;

    async fn find_session(&self, id: DbId) -> Result<Option<PlaygroundSession>, StoreError>;

    async fn find_owned_session(
        &self,
        id: DbId,
        owner: DbId,
    ) -> Result<Option<PlaygroundSession>, StoreError>;

    async fn update_owned_session(
        &self,
        id: DbId,
        owner: DbId,
        patch: &SessionPatch,
    ) -> Result<Option<PlaygroundSession>, StoreError>;

    /// Stamp `message` with the current time and append it to the transcript.
    async fn append_message(
        &self,
        id: DbId,
        owner: DbId,
        message: MessageDraft,
    ) -> Result<Option<PlaygroundSession>, StoreError>;

    async fn delete_owned_session(&self, id: DbId, owner: DbId) -> Result<bool, StoreError>;

    async fn list_owned_sessions(
        &self,
        owner: DbId,
        filter: &OwnedSessionFilter,
        page: PageRequest,
    ) -> Result<Page<SessionSummary>, StoreError>;

    async fn list_public_sessions(
        &self,
        filter: &PublicSessionFilter,
        page: PageRequest,
    ) -> Result<Page<PublicSession>, StoreError>;
}

/// A complete backend.
#[async_trait]
pub trait Store: UserStore + SessionStore {
    /// `true` when the backing storage is reachable.
    async fn health_check(&self) -> bool;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// [`Store`] backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        Ok(UserRepo::create(&self.pool, input).await?)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }

    async fn update_profile(
        &self,
        id: DbId,
        input: &UpdateProfile,
    ) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::update_profile(&self.pool, id, input).await?)
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError> {
        Ok(UserRepo::update_password(&self.pool, id, password_hash).await?)
    }

    async fn record_login(&self, id: DbId) -> Result<(), StoreError> {
        Ok(UserRepo::record_login(&self.pool, id).await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(
        &self,
        owner: DbId,
        draft: &SessionDraft,
    ) -> Result<PlaygroundSession, StoreError> {
        Ok(SessionRepo::create(&self.pool, owner, draft).await?)
    }

    async fn find_session(&self, id: DbId) -> Result<Option<PlaygroundSession>, StoreError> {
        Ok(SessionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_owned_session(
        &self,
        id: DbId,
        owner: DbId,
    ) -> Result<Option<PlaygroundSession>, StoreError> {
        Ok(SessionRepo::find_owned(&self.pool, id, owner).await?)
    }

    async fn update_owned_session(
        &self,
        id: DbId,
        owner: DbId,
        patch: &SessionPatch,
    ) -> Result<Option<PlaygroundSession>, StoreError> {
        Ok(SessionRepo::update_owned(&self.pool, id, owner, patch).await?)
    }

    async fn append_message(
        &self,
        id: DbId,
        owner: DbId,
        message: MessageDraft,
    ) -> Result<Option<PlaygroundSession>, StoreError> {
        let message = message.stamp(Utc::now());
        Ok(SessionRepo::append_message(&self.pool, id, owner, &message).await?)
    }

    async fn delete_owned_session(&self, id: DbId, owner: DbId) -> Result<bool, StoreError> {
        Ok(SessionRepo::delete_owned(&self.pool, id, owner).await?)
    }

    async fn list_owned_sessions(
        &self,
        owner: DbId,
        filter: &OwnedSessionFilter,
        page: PageRequest,
    ) -> Result<Page<SessionSummary>, StoreError> {
        Ok(SessionRepo::list_owned(&self.pool, owner, filter, page).await?)
    }

    async fn list_public_sessions(
        &self,
        filter: &PublicSessionFilter,
        page: PageRequest,
    ) -> Result<Page<PublicSession>, StoreError> {
        Ok(SessionRepo::list_public(&self.pool, filter, page).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> bool {
        match crate::health_check(&self.pool).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                false
            }
        }
    }
}

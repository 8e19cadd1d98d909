//! Playground session models.
//!
//! Three projections of the same row: the full [`PlaygroundSession`] (with the
//! transcript), the [`SessionSummary`] used by the owner's list view, and the
//! [`PublicSession`] exposed by discovery, which swaps the owner id for
//! [`SessionOwner`].

use playground_core::session::{ChatMessage, Language};
use playground_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A full row from the `playground_sessions` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundSession {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub description: String,
    pub code: String,
    #[sqlx(try_from = "String")]
    pub language: Language,
    #[sqlx(json)]
    pub messages: Vec<ChatMessage>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A session without its transcript, for list views.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub description: String,
    pub code: String,
    #[sqlx(try_from = "String")]
    pub language: Language,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&PlaygroundSession> for SessionSummary {
    fn from(s: &PlaygroundSession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            name: s.name.clone(),
            description: s.description.clone(),
            code: s.code.clone(),
            language: s.language,
            is_public: s.is_public,
            tags: s.tags.clone(),
            last_modified: s.last_modified,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// The public subset of a session owner's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOwner {
    pub name: String,
    pub avatar: Option<String>,
}

/// A public session as shown in discovery: no transcript, no owner id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSession {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub code: String,
    pub language: Language,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub owner: SessionOwner,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PublicSession {
    pub fn new(session: &PlaygroundSession, owner: SessionOwner) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            description: session.description.clone(),
            code: session.code.clone(),
            language: session.language,
            is_public: session.is_public,
            tags: session.tags.clone(),
            owner,
            last_modified: session.last_modified,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Filter for the owner's session list.
#[derive(Debug, Clone, Default)]
pub struct OwnedSessionFilter {
    /// Case-insensitive substring matched against name, description, and tags.
    pub search: Option<String>,
}

/// Filter for public discovery.
#[derive(Debug, Clone, Default)]
pub struct PublicSessionFilter {
    /// Case-insensitive substring matched against name and description.
    pub search: Option<String>,
    /// A session matches when it carries at least one of these tags.
    pub tags: Vec<String>,
}

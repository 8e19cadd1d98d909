//! Wire shapes returned by the playground service, as the client sees them.

use playground_core::error::FieldError;
use playground_core::pagination::Pagination;
use playground_core::session::{ChatMessage, Language};
use playground_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// `{success, message, data?, errors?}` wrapper carried by every response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

impl<T> Envelope<T> {
    /// The payload of a successful response that is expected to carry one.
    pub fn into_data(self) -> Result<T, ClientError> {
        self.data
            .ok_or_else(|| ClientError::Decode(format!("response carried no data: {}", self.message)))
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_email_verified: bool,
    pub last_login: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Register/login payload: the user plus a fresh token pair.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub user: User,
}

/// Body of `PUT /user/profile`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A session with its transcript, as returned by get/create/update/append.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub description: String,
    pub code: String,
    pub language: Language,
    pub messages: Vec<ChatMessage>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A list-view session: everything but the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub description: String,
    pub code: String,
    pub language: Language,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicOwner {
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSession {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub code: String,
    pub language: Language,
    pub tags: Vec<String>,
    pub owner: PublicOwner,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionPayload {
    pub session: Session,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionList<T> {
    pub sessions: Vec<T>,
    pub pagination: Pagination,
}

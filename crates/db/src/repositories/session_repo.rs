//! Repository for the `playground_sessions` table.
//!
//! Every mutating query is a single statement keyed by `(id, user_id)`, so an
//! update or a message append is atomic per request and a caller can never
//! touch a row it does not own. A miss (absent or not owned) is reported the
//! same way: `None` / `false`.

use playground_core::pagination::PageRequest;
use playground_core::session::{ChatMessage, Language, SessionDraft, SessionPatch};
use playground_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use super::like_pattern;
use crate::models::session::{
    OwnedSessionFilter, PlaygroundSession, PublicSession, PublicSessionFilter, SessionOwner,
    SessionSummary,
};
use crate::models::Page;

/// Column list for full rows.
const COLUMNS: &str = "id, user_id, name, description, code, language, messages, \
                       is_public, tags, last_modified, created_at, updated_at";

/// Column list for list views (no transcript).
const SUMMARY_COLUMNS: &str = "id, user_id, name, description, code, language, \
                               is_public, tags, last_modified, created_at, updated_at";

/// Owned-list predicate. `$1` owner, `$2` optional ILIKE pattern.
const OWNED_WHERE: &str = "user_id = $1
    AND ($2::text IS NULL
         OR name ILIKE $2
         OR description ILIKE $2
         OR EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE t.tag ILIKE $2))";

/// Public-list predicate. `$1` optional ILIKE pattern, `$2` tag filter (empty = any).
const PUBLIC_WHERE: &str = "s.is_public = true
    AND ($1::text IS NULL OR s.name ILIKE $1 OR s.description ILIKE $1)
    AND (cardinality($2::text[]) = 0 OR s.tags && $2::text[])";

/// Row shape of the public listing join.
#[derive(Debug, FromRow)]
struct PublicSessionRow {
    id: DbId,
    name: String,
    description: String,
    code: String,
    #[sqlx(try_from = "String")]
    language: Language,
    is_public: bool,
    tags: Vec<String>,
    last_modified: Timestamp,
    created_at: Timestamp,
    updated_at: Timestamp,
    owner_name: String,
    owner_avatar: Option<String>,
}

impl From<PublicSessionRow> for PublicSession {
    fn from(row: PublicSessionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            code: row.code,
            language: row.language,
            is_public: row.is_public,
            tags: row.tags,
            owner: SessionOwner {
                name: row.owner_name,
                avatar: row.owner_avatar,
            },
            last_modified: row.last_modified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Provides owner-scoped CRUD and the two list queries for sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a validated draft owned by `user_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        draft: &SessionDraft,
    ) -> Result<PlaygroundSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO playground_sessions
                (user_id, name, description, code, language, is_public, tags)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlaygroundSession>(&query)
            .bind(user_id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.code)
            .bind(draft.language.as_str())
            .bind(draft.is_public)
            .bind(&draft.tags)
            .fetch_one(pool)
            .await
    }

    /// Find a session by ID regardless of owner.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PlaygroundSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM playground_sessions WHERE id = $1");
        sqlx::query_as::<_, PlaygroundSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by ID only if `user_id` owns it.
    pub async fn find_owned(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<PlaygroundSession>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM playground_sessions WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, PlaygroundSession>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a validated patch. Only non-`None` fields are written;
    /// `last_modified` is always refreshed.
    pub async fn update_owned(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        patch: &SessionPatch,
    ) -> Result<Option<PlaygroundSession>, sqlx::Error> {
        let query = format!(
            "UPDATE playground_sessions SET
                name = COALESCE($3::text, name),
                description = COALESCE($4::text, description),
                code = COALESCE($5::text, code),
                language = COALESCE($6::text, language),
                tags = COALESCE($7::text[], tags),
                is_public = COALESCE($8::boolean, is_public),
                last_modified = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlaygroundSession>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&patch.name)
            .bind(&patch.description)
            .bind(&patch.code)
            .bind(patch.language.map(Language::as_str))
            .bind(&patch.tags)
            .bind(patch.is_public)
            .fetch_optional(pool)
            .await
    }

    /// Append one message to the end of the transcript in a single statement.
    pub async fn append_message(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        message: &ChatMessage,
    ) -> Result<Option<PlaygroundSession>, sqlx::Error> {
        let query = format!(
            "UPDATE playground_sessions SET
                messages = messages || jsonb_build_array($3::jsonb),
                last_modified = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlaygroundSession>(&query)
            .bind(id)
            .bind(user_id)
            .bind(Json(message))
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete an owned session. Returns `true` if a row was removed.
    pub async fn delete_owned(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM playground_sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of the owner's sessions, most recently modified first.
    pub async fn list_owned(
        pool: &PgPool,
        user_id: DbId,
        filter: &OwnedSessionFilter,
        page: PageRequest,
    ) -> Result<Page<SessionSummary>, sqlx::Error> {
        let pattern = filter.search.as_deref().map(like_pattern);

        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM playground_sessions
             WHERE {OWNED_WHERE}
             ORDER BY last_modified DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, SessionSummary>(&query)
            .bind(user_id)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM playground_sessions WHERE {OWNED_WHERE}");
        let (total_count,): (i64,) = sqlx::query_as(&count_query)
            .bind(user_id)
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        Ok(Page { items, total_count })
    }

    /// One page of public sessions, most recently created first, with the
    /// owner projected to name + avatar.
    pub async fn list_public(
        pool: &PgPool,
        filter: &PublicSessionFilter,
        page: PageRequest,
    ) -> Result<Page<PublicSession>, sqlx::Error> {
        let pattern = filter.search.as_deref().map(like_pattern);

        let query = format!(
            "SELECT s.id, s.name, s.description, s.code, s.language, s.is_public, s.tags,
                    s.last_modified, s.created_at, s.updated_at,
                    u.name AS owner_name, u.avatar AS owner_avatar
             FROM playground_sessions s
             JOIN users u ON u.id = s.user_id
             WHERE {PUBLIC_WHERE}
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, PublicSessionRow>(&query)
            .bind(&pattern)
            .bind(&filter.tags)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query =
            format!("SELECT COUNT(*) FROM playground_sessions s WHERE {PUBLIC_WHERE}");
        let (total_count,): (i64,) = sqlx::query_as(&count_query)
            .bind(&pattern)
            .bind(&filter.tags)
            .fetch_one(pool)
            .await?;

        Ok(Page {
            items: rows.into_iter().map(PublicSession::from).collect(),
            total_count,
        })
    }
}

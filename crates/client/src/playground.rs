//! Typed calls for the `/playground` endpoints.

use std::sync::Arc;

use playground_core::session::{ChatMessage, MessageRole, SessionFields};
use playground_core::types::DbId;
use serde::Serialize;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{
    Envelope, PublicSession, Session, SessionList, SessionPayload, SessionSummary,
};

/// Paging and filtering for the list endpoints. Unset fields use the
/// service defaults.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    /// Only honoured by the public listing.
    pub tags: Vec<String>,
}

impl ListQuery {
    pub fn page(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if !self.tags.is_empty() {
            pairs.push(("tags", self.tags.join(",")));
        }
        pairs
    }
}

#[derive(Serialize)]
struct NewMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Clone)]
pub struct PlaygroundApi {
    api: Arc<ApiClient>,
}

impl PlaygroundApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list_sessions(
        &self,
        query: &ListQuery,
    ) -> Result<SessionList<SessionSummary>, ClientError> {
        self.api
            .get_query("/playground/sessions", &query.pairs())
            .await?
            .into_data()
    }

    pub async fn get_session(&self, id: DbId) -> Result<Session, ClientError> {
        self.session_call(self.api.get(&session_path(id))).await
    }

    pub async fn create_session(&self, fields: &SessionFields) -> Result<Session, ClientError> {
        self.session_call(self.api.post("/playground/sessions", fields))
            .await
    }

    /// Partial update; only the fields set in `fields` are sent.
    pub async fn update_session(
        &self,
        id: DbId,
        fields: &SessionFields,
    ) -> Result<Session, ClientError> {
        self.session_call(self.api.put(&session_path(id), fields))
            .await
    }

    pub async fn add_message(
        &self,
        id: DbId,
        role: MessageRole,
        content: &str,
    ) -> Result<Session, ClientError> {
        let path = format!("{}/messages", session_path(id));
        self.session_call(self.api.post(&path, &NewMessage { role, content }))
            .await
    }

    /// Replay `messages` onto the session in order, returning the final state.
    pub async fn append_all(
        &self,
        id: DbId,
        messages: &[ChatMessage],
    ) -> Result<Option<Session>, ClientError> {
        let mut last = None;
        for message in messages {
            last = Some(self.add_message(id, message.role, &message.content).await?);
        }
        Ok(last)
    }

    pub async fn delete_session(&self, id: DbId) -> Result<(), ClientError> {
        let _: Envelope<serde_json::Value> = self.api.delete(&session_path(id)).await?;
        Ok(())
    }

    pub async fn list_public(
        &self,
        query: &ListQuery,
    ) -> Result<SessionList<PublicSession>, ClientError> {
        self.api
            .get_query("/playground/public", &query.pairs())
            .await?
            .into_data()
    }

    async fn session_call(
        &self,
        call: impl std::future::Future<Output = Result<Envelope<SessionPayload>, ClientError>>,
    ) -> Result<Session, ClientError> {
        Ok(call.await?.into_data()?.session)
    }
}

fn session_path(id: DbId) -> String {
    format!("/playground/sessions/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_unset_and_blank() {
        let query = ListQuery {
            page: Some(2),
            limit: None,
            search: Some("  ".into()),
            tags: vec!["react".into(), "ui".into()],
        };
        assert_eq!(
            query.pairs(),
            vec![("page", "2".to_string()), ("tags", "react,ui".to_string())]
        );
        assert!(ListQuery::default().pairs().is_empty());
    }
}

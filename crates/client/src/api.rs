//! HTTP client for the playground service.
//!
//! Wraps [`reqwest`] with the service's conventions: the bearer token is
//! attached from the stored pair, every body is decoded as an [`Envelope`],
//! and a 401 triggers exactly one refresh followed by exactly one retry. A
//! failed refresh clears the pair from memory and from storage.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{Envelope, TokenPair};
use crate::storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};

/// Query-string pairs appended to a request.
pub type Query<'a> = &'a [(&'a str, String)];

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: RwLock<Option<TokenPair>>,
    storage: Arc<dyn TokenStorage>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, storage: Arc<dyn TokenStorage>) -> Self {
        Self::with_http(reqwest::Client::new(), config, storage)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_http(
        http: reqwest::Client,
        config: &ClientConfig,
        storage: Arc<dyn TokenStorage>,
    ) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            tokens: RwLock::new(None),
            storage,
        }
    }

    /// Build a client whose storage follows `config.token_path`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let storage: Arc<dyn TokenStorage> = match &config.token_path {
            Some(path) => Arc::new(FileTokenStorage::new(path.clone())),
            None => Arc::new(MemoryTokenStorage::new()),
        };
        Self::new(config, storage)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- token pair ----

    /// Load the persisted pair into memory. Returns whether one was found.
    pub async fn restore_tokens(&self) -> bool {
        let stored = self.storage.load().await;
        let found = stored.is_some();
        *self.tokens.write().await = stored;
        found
    }

    pub async fn set_tokens(&self, tokens: TokenPair) -> Result<(), ClientError> {
        self.storage.save(&tokens).await?;
        *self.tokens.write().await = Some(tokens);
        Ok(())
    }

    /// Drop the pair from memory and storage. Storage failures are logged;
    /// the in-memory pair is always cleared.
    pub async fn clear_tokens(&self) {
        *self.tokens.write().await = None;
        if let Err(e) = self.storage.clear().await {
            tracing::warn!(error = %e, "Failed to clear stored tokens");
        }
    }

    pub async fn tokens(&self) -> Option<TokenPair> {
        self.tokens.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    // ---- verbs ----

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ClientError> {
        self.request(Method::GET, path, &[], None).await
    }

    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
    ) -> Result<Envelope<T>, ClientError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ClientError> {
        let body = encode(body)?;
        self.request(Method::POST, path, &[], Some(&body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ClientError> {
        let body = encode(body)?;
        self.request(Method::PUT, path, &[], Some(&body)).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Envelope<T>, ClientError> {
        self.request(Method::DELETE, path, &[], None).await
    }

    /// Send a request, refreshing and retrying once on 401.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&serde_json::Value>,
    ) -> Result<Envelope<T>, ClientError> {
        let response = self.send(method.clone(), path, query, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.has_refresh_token().await {
            tracing::debug!(path, "Access token rejected, attempting refresh");
            if self.refresh().await {
                let retry = self.send(method, path, query, body).await?;
                return Self::handle_response(retry).await;
            }
        }

        Self::handle_response(response).await
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// On any failure both tokens are cleared and `false` is returned.
    pub async fn refresh(&self) -> bool {
        let Some(refresh_token) = self
            .tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.refresh_token.clone())
        else {
            return false;
        };

        let result = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await;

        let refreshed = match result {
            Ok(response) => Self::handle_response::<TokenPair>(response)
                .await
                .and_then(Envelope::into_data),
            Err(e) => Err(e.into()),
        };

        match refreshed {
            Ok(tokens) => match self.set_tokens(tokens).await {
                Ok(()) => {
                    tracing::debug!("Token pair refreshed");
                    return true;
                }
                Err(e) => tracing::warn!(error = %e, "Failed to persist refreshed tokens"),
            },
            Err(e) => tracing::info!(error = %e, "Token refresh failed"),
        }

        self.clear_tokens().await;
        false
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn has_refresh_token(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut builder = self.http.request(method, self.url(path));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(tokens) = self.tokens.read().await.as_ref() {
            builder = builder.bearer_auth(&tokens.access_token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Decode the envelope, turning non-2xx statuses into errors that carry
    /// the service's message and field errors.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let (message, errors) =
                match serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes) {
                    Ok(env) if !env.message.is_empty() => (env.message, env.errors),
                    _ => (format!("HTTP {}", status.as_u16()), Vec::new()),
                };
            if status == StatusCode::UNAUTHORIZED {
                return Err(ClientError::Unauthenticated(message));
            }
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
                errors,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

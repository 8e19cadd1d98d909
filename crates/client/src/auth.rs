//! Explicit authentication context.
//!
//! One [`AuthContext`] per signed-in surface. It owns the signed-in user and
//! delegates the token pair to the shared [`ApiClient`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{AuthPayload, Envelope, ProfileUpdate, User, UserPayload};

#[derive(Debug, Default)]
struct AuthState {
    user: Option<User>,
    initialized: bool,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct NewAccount<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

pub struct AuthContext {
    api: Arc<ApiClient>,
    state: RwLock<AuthState>,
}

impl AuthContext {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: RwLock::new(AuthState::default()),
        }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// Restore stored tokens and resolve the profile they belong to.
    ///
    /// Any failure leaves the context signed out with the stored tokens
    /// removed. The context is initialized afterwards either way.
    pub async fn initialize(&self) {
        let mut user = None;

        if self.api.restore_tokens().await {
            match self.fetch_profile().await {
                Ok(profile) => user = Some(profile),
                Err(e) => {
                    tracing::info!(error = %e, "Stored session could not be resumed");
                    self.api.clear_tokens().await;
                }
            }
        }

        let mut state = self.state.write().await;
        state.user = user;
        state.initialized = true;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let payload: AuthPayload = self
            .api
            .post("/auth/login", &Credentials { email, password })
            .await?
            .into_data()?;
        self.sign_in(payload).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let payload: AuthPayload = self
            .api
            .post(
                "/auth/register",
                &NewAccount {
                    name,
                    email,
                    password,
                },
            )
            .await?
            .into_data()?;
        self.sign_in(payload).await
    }

    /// Sign out. Local state is cleared even when the server call fails.
    pub async fn logout(&self) {
        if self.api.is_authenticated().await {
            let result: Result<Envelope<serde_json::Value>, _> =
                self.api.post("/auth/logout", &serde_json::json!({})).await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "Logout request failed");
            }
        }

        self.api.clear_tokens().await;
        self.state.write().await.user = None;
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let payload: UserPayload = self.api.put("/user/profile", update).await?.into_data()?;
        self.state.write().await.user = Some(payload.user.clone());
        Ok(payload.user)
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let _: Envelope<serde_json::Value> = self
            .api
            .put(
                "/user/password",
                &PasswordChange {
                    current_password,
                    new_password,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.user.is_some() && self.api.is_authenticated().await
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    async fn fetch_profile(&self) -> Result<User, ClientError> {
        let payload: UserPayload = self.api.get("/user/profile").await?.into_data()?;
        Ok(payload.user)
    }

    async fn sign_in(&self, payload: AuthPayload) -> Result<User, ClientError> {
        self.api.set_tokens(payload.tokens).await?;
        tracing::debug!(user_id = payload.user.id, "Signed in");
        self.state.write().await.user = Some(payload.user.clone());
        Ok(payload.user)
    }
}

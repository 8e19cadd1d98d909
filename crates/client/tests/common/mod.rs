#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;

use chrono::Duration;
use playground_api::auth::jwt::{issue_token, JwtConfig, TokenKind};
use playground_api::config::ServerConfig;
use playground_api::router::build_app_router;
use playground_api::state::AppState;
use playground_client::api::ApiClient;
use playground_client::config::ClientConfig;
use playground_client::storage::{MemoryTokenStorage, TokenStorage};
use playground_client::AuthContext;
use playground_db::MemoryStore;

pub const TEST_SECRET: &str = "client-test-secret-long-enough-for-hmac";
pub const TEST_PASSWORD: &str = "secret123";

/// Nothing listens here; connections are refused immediately.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9/api/v1";

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_SECRET.to_string(),
        access_token_expiry_mins: 15,
        refresh_token_expiry_days: 7,
    }
}

fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        password_min_length: 6,
        jwt: jwt_config(),
    }
}

/// The real API router on an ephemeral port, backed by an in-memory store.
///
/// While switched offline every request is answered with 503.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    online: Arc<AtomicBool>,
}

impl TestServer {
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

pub async fn spawn_api() -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let online = Arc::new(AtomicBool::new(true));
    let switch = online.clone();
    let app = build_app_router(AppState::new(store.clone(), server_config())).layer(
        axum::middleware::from_fn(move |request: Request, next: Next| {
            let switch = switch.clone();
            async move {
                if switch.load(Ordering::SeqCst) {
                    next.run(request).await
                } else {
                    StatusCode::SERVICE_UNAVAILABLE.into_response()
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}/api/v1"),
        store,
        online,
    }
}

pub fn client_for(base_url: &str, storage: Arc<dyn TokenStorage>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(&ClientConfig::new(base_url), storage))
}

/// A signed-in auth context for `name` (`<name>@test.com`).
pub async fn signed_in(server: &TestServer, name: &str) -> AuthContext {
    let api = client_for(&server.base_url, Arc::new(MemoryTokenStorage::new()));
    let auth = AuthContext::new(api);
    auth.register(name, &format!("{name}@test.com"), TEST_PASSWORD)
        .await
        .unwrap();
    auth
}

/// An access token for `user_id` that expired five minutes ago.
pub fn expired_access_token(user_id: i64) -> String {
    issue_token(
        user_id,
        TokenKind::Access,
        Duration::minutes(-5),
        &jwt_config(),
    )
    .unwrap()
}

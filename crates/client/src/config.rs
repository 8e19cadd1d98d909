use std::path::PathBuf;

/// Default API root, matching the service's default port and `/api/v1` nest.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001/api/v1";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Where the token pair is persisted. `None` keeps tokens in memory only.
    pub token_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_path: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            token_path: None,
        }
    }

    /// Read `PLAYGROUND_API_URL` and `PLAYGROUND_TOKEN_FILE`, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let base_url = std::env::var("PLAYGROUND_API_URL")
            .map(normalize_base_url)
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let token_path = std::env::var("PLAYGROUND_TOKEN_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            base_url,
            token_path,
        }
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

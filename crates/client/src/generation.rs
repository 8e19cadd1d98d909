//! Text generation against the Gemini `generateContent` REST endpoint.
//!
//! Two interchangeable [`TextBackend`]s produce text from a
//! [`GenerationRequest`]:
//!
//! - [`StructuredChatBackend`] sends prior turns as role-tagged `contents`
//!   plus a `systemInstruction`.
//! - [`FlatPromptBackend`] inlines everything into a single prompt, which
//!   every model revision accepts.
//!
//! [`TextGenerator`] probes the structured backend on first use and falls
//! back to the flat one if the probe fails. The choice is made once per
//! generator.

use std::sync::Arc;

use async_trait::async_trait;
use playground_core::session::MessageRole;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

const PROBE_PROMPT: &str = "Hi";

const CODE_SYSTEM_PROMPT: &str = "You are a React/Next.js expert helping to create components.\n\
Provide clean, modern React code using:\n\
- TypeScript/TSX\n\
- Tailwind CSS for styling\n\
- Modern React patterns (hooks, functional components)\n\
- Proper TypeScript types\n\
- Clean, readable code with comments\n\
Return only the code without markdown formatting or explanations.";

const CHAT_SYSTEM_PROMPT: &str = "You are an AI assistant specialized in React/Next.js development.\n\
Help the user with their coding questions, component generation, and development guidance.\n\
Provide helpful, accurate responses about React, Next.js, TypeScript, and modern web development.";

// ---------------------------------------------------------------------------
// Config / errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    /// Provider root, without a trailing slash.
    pub base_url: String,
    pub model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl GenerationConfig {
    /// Read `GEMINI_API_KEY`, `GEMINI_BASE_URL` and `GEMINI_MODEL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("Invalid Gemini API key")]
    InvalidApiKey,

    #[error("Rate limited by the provider")]
    RateLimited,

    #[error("Provider error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response format from provider")]
    MalformedResponse,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One prior exchange in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub history: Vec<Turn>,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            prompt: prompt.into(),
        }
    }

    /// Component generation: code only, no history.
    pub fn code(prompt: &str) -> Self {
        Self {
            system: Some(CODE_SYSTEM_PROMPT.to_string()),
            history: Vec::new(),
            prompt: format!("User request: {prompt}"),
        }
    }

    /// Free-form assistant chat with the prior conversation.
    pub fn chat(message: &str, history: Vec<Turn>) -> Self {
        Self {
            system: Some(CHAT_SYSTEM_PROMPT.to_string()),
            history,
            prompt: format!("Current message: {message}"),
        }
    }

    /// Everything as one prompt string.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        if !self.history.is_empty() {
            out.push_str("Previous conversation:\n");
            for turn in &self.history {
                out.push_str(turn.role.as_str());
                out.push_str(": ");
                out.push_str(&turn.content);
                out.push('\n');
            }
            out.push('\n');
        }
        if let Some(system) = &self.system {
            out.push_str(system);
            out.push_str("\n\n");
        }
        out.push_str(&self.prompt);
        out
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TextBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// Shared HTTP plumbing for both backends.
#[derive(Clone)]
struct GeminiTransport {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl GeminiTransport {
    async fn generate_content(&self, mut body: Value) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey)?;
        body["safetySettings"] = safety_settings();

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|_| ProviderError::MalformedResponse)?;
        extract_text(&json)
    }
}

pub struct StructuredChatBackend {
    transport: GeminiTransport,
}

impl StructuredChatBackend {
    pub fn new(client: reqwest::Client, config: GenerationConfig) -> Self {
        Self {
            transport: GeminiTransport { client, config },
        }
    }
}

#[async_trait]
impl TextBackend for StructuredChatBackend {
    fn name(&self) -> &'static str {
        "structured"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|turn| content(gemini_role(turn.role), &turn.content))
            .collect();
        contents.push(content("user", &request.prompt));

        let mut body = json!({ "contents": contents });
        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        self.transport.generate_content(body).await
    }
}

pub struct FlatPromptBackend {
    transport: GeminiTransport,
}

impl FlatPromptBackend {
    pub fn new(client: reqwest::Client, config: GenerationConfig) -> Self {
        Self {
            transport: GeminiTransport { client, config },
        }
    }
}

#[async_trait]
impl TextBackend for FlatPromptBackend {
    fn name(&self) -> &'static str {
        "flat"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = json!({ "contents": [{ "parts": [{ "text": request.flatten() }] }] });
        self.transport.generate_content(body).await
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// A single "generate text" capability over two backends.
pub struct TextGenerator {
    has_api_key: bool,
    primary: Arc<dyn TextBackend>,
    fallback: Arc<dyn TextBackend>,
    selected: OnceCell<Arc<dyn TextBackend>>,
}

impl TextGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        let client = reqwest::Client::new();
        let has_api_key = config.api_key.is_some();
        Self {
            has_api_key,
            primary: Arc::new(StructuredChatBackend::new(client.clone(), config.clone())),
            fallback: Arc::new(FlatPromptBackend::new(client, config)),
            selected: OnceCell::new(),
        }
    }

    /// Use custom backends. `primary` is probed; `fallback` is used if the
    /// probe fails.
    pub fn with_backends(primary: Arc<dyn TextBackend>, fallback: Arc<dyn TextBackend>) -> Self {
        Self {
            has_api_key: true,
            primary,
            fallback,
            selected: OnceCell::new(),
        }
    }

    /// Name of the backend in use, once the probe has run.
    pub fn selected_backend(&self) -> Option<&'static str> {
        self.selected.get().map(|b| b.name())
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        if !self.has_api_key {
            return Err(ProviderError::MissingApiKey);
        }
        let backend = self.selected.get_or_init(|| self.probe()).await;
        backend.generate(request).await
    }

    pub async fn generate_code(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate(&GenerationRequest::code(prompt)).await
    }

    pub async fn chat(&self, message: &str, history: Vec<Turn>) -> Result<String, ProviderError> {
        self.generate(&GenerationRequest::chat(message, history))
            .await
    }

    async fn probe(&self) -> Arc<dyn TextBackend> {
        match self.primary.generate(&GenerationRequest::new(PROBE_PROMPT)).await {
            Ok(_) => {
                tracing::info!(backend = self.primary.name(), "Text backend selected");
                Arc::clone(&self.primary)
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "Primary text backend failed probe, falling back"
                );
                Arc::clone(&self.fallback)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

fn content(role: &str, text: &str) -> Value {
    json!({ "role": role, "parts": [{ "text": text }] })
}

fn gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

fn safety_settings() -> Value {
    let categories = [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ];
    Value::Array(
        categories
            .iter()
            .map(|c| json!({ "category": c, "threshold": "BLOCK_NONE" }))
            .collect(),
    )
}

fn classify_failure(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::InvalidApiKey,
        400 if body.contains("API key not valid") => ProviderError::InvalidApiKey,
        429 => ProviderError::RateLimited,
        _ => ProviderError::Http { status, body },
    }
}

fn extract_text(json: &Value) -> Result<String, ProviderError> {
    json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or(ProviderError::MalformedResponse)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_flatten_inlines_history_then_instructions() {
        let request = GenerationRequest::chat(
            "and a footer?",
            vec![
                Turn {
                    role: MessageRole::User,
                    content: "make a navbar".into(),
                },
                Turn {
                    role: MessageRole::Assistant,
                    content: "done".into(),
                },
            ],
        );
        let flat = request.flatten();

        assert!(flat.starts_with("Previous conversation:\nuser: make a navbar\nassistant: done\n\n"));
        assert!(flat.contains("specialized in React/Next.js"));
        assert!(flat.ends_with("Current message: and a footer?"));
    }

    #[test]
    fn test_extract_text() {
        let ok = json!({ "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }] });
        assert_eq!(extract_text(&ok).unwrap(), "hello");
        assert_matches!(
            extract_text(&json!({ "candidates": [] })),
            Err(ProviderError::MalformedResponse)
        );
    }

    #[test]
    fn test_classify_failure() {
        assert_matches!(
            classify_failure(400, "API key not valid. Please pass a valid API key.".into()),
            ProviderError::InvalidApiKey
        );
        assert_matches!(classify_failure(429, String::new()), ProviderError::RateLimited);
        assert_matches!(
            classify_failure(500, "boom".into()),
            ProviderError::Http { status: 500, .. }
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_probing() {
        let generator = TextGenerator::new(GenerationConfig::default());
        assert_matches!(
            generator.generate_code("a button").await,
            Err(ProviderError::MissingApiKey)
        );
        assert!(generator.selected_backend().is_none());
    }
}

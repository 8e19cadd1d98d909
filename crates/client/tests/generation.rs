//! Text generation and the chat assistant against a stub provider.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use playground_client::assistant::{AssistantOutcome, ChatAssistant, FAILURE_REPLY};
use playground_client::generation::{GenerationConfig, ProviderError, TextGenerator};
use playground_client::playground::PlaygroundApi;
use playground_client::storage::MemoryTokenStorage;
use playground_client::SessionCache;
use playground_core::session::MessageRole;
use serde_json::{json, Value};

const API_KEY: &str = "test-key";

// ---------------------------------------------------------------------------
// Stub provider
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Stub {
    reject_structured: Arc<AtomicBool>,
    malformed: Arc<AtomicBool>,
    structured_calls: Arc<AtomicUsize>,
    flat_calls: Arc<AtomicUsize>,
    reply: Arc<Mutex<String>>,
    last_body: Arc<Mutex<Value>>,
}

impl Stub {
    fn reply_with(&self, text: &str) {
        *self.reply.lock().unwrap() = text.to_string();
    }
}

async fn generate_content(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *stub.last_body.lock().unwrap() = body.clone();

    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "API key not valid. Please pass a valid API key." } })),
        );
    }

    let structured = body["contents"][0].get("role").is_some();
    if structured {
        stub.structured_calls.fetch_add(1, Ordering::SeqCst);
        if stub.reject_structured.load(Ordering::SeqCst) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "message": "Unknown name \"systemInstruction\"" } })),
            );
        }
    } else {
        stub.flat_calls.fetch_add(1, Ordering::SeqCst);
    }

    if stub.malformed.load(Ordering::SeqCst) {
        return (StatusCode::OK, Json(json!({ "candidates": [] })));
    }

    let text = stub.reply.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })),
    )
}

async fn spawn_provider(stub: Stub) -> String {
    let app = Router::new()
        .route("/v1beta/models/{call}", post(generate_content))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn generator(stub: &Stub, api_key: &str) -> TextGenerator {
    let base_url = spawn_provider(stub.clone()).await;
    TextGenerator::new(GenerationConfig {
        api_key: Some(api_key.to_string()),
        base_url,
        ..GenerationConfig::default()
    })
}

fn offline_cache() -> SessionCache {
    let api = common::client_for(common::UNREACHABLE_URL, Arc::new(MemoryTokenStorage::new()));
    SessionCache::new(PlaygroundApi::new(api))
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_structured_backend_is_kept_when_probe_succeeds() {
    let stub = Stub::default();
    stub.reply_with("export default function Button() {}");
    let generator = generator(&stub, API_KEY).await;

    let text = generator.generate_code("a button").await.unwrap();

    assert_eq!(text, "export default function Button() {}");
    assert_eq!(generator.selected_backend(), Some("structured"));
    assert_eq!(stub.structured_calls.load(Ordering::SeqCst), 2);
    assert_eq!(stub.flat_calls.load(Ordering::SeqCst), 0);

    let body = stub.last_body.lock().unwrap().clone();
    assert!(body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Tailwind CSS"));
    assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_failed_probe_selects_flat_backend_once() {
    let stub = Stub::default();
    stub.reject_structured.store(true, Ordering::SeqCst);
    stub.reply_with("ok");
    let generator = generator(&stub, API_KEY).await;

    for _ in 0..3 {
        assert_eq!(generator.chat("hello", Vec::new()).await.unwrap(), "ok");
    }

    assert_eq!(generator.selected_backend(), Some("flat"));
    assert_eq!(stub.structured_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stub.flat_calls.load(Ordering::SeqCst), 3);

    let body = stub.last_body.lock().unwrap().clone();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.ends_with("Current message: hello"));
}

#[tokio::test]
async fn test_invalid_key_is_reported() {
    let stub = Stub::default();
    let generator = generator(&stub, "wrong-key").await;

    assert_matches!(
        generator.generate_code("a button").await,
        Err(ProviderError::InvalidApiKey)
    );
}

#[tokio::test]
async fn test_malformed_response_is_reported() {
    let stub = Stub::default();
    stub.malformed.store(true, Ordering::SeqCst);
    let generator = generator(&stub, API_KEY).await;

    assert_matches!(
        generator.chat("hi", Vec::new()).await,
        Err(ProviderError::MalformedResponse)
    );
}

// ---------------------------------------------------------------------------
// Chat assistant
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_code_reply_updates_editor_and_transcript() {
    let stub = Stub::default();
    stub.reply_with("export default function Button() { return <button/>; }");
    let assistant = ChatAssistant::new(Arc::new(generator(&stub, API_KEY).await));
    let mut cache = offline_cache();
    cache.create("Button Demo").await.unwrap();

    let outcome = assistant
        .handle(&mut cache, "  make a button  ")
        .await
        .unwrap();

    assert_eq!(outcome, AssistantOutcome::Replied { code_updated: true });
    let active = cache.active().unwrap();
    assert_eq!(
        active.code,
        "export default function Button() { return <button/>; }"
    );
    assert_eq!(active.messages.len(), 2);
    assert_eq!(active.messages[0].role, MessageRole::User);
    assert_eq!(active.messages[0].content, "make a button");
    assert_eq!(active.messages[1].role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_chat_reply_sends_history_and_leaves_code_alone() {
    let stub = Stub::default();
    stub.reply_with("Hooks let you reuse stateful logic.");
    let assistant = ChatAssistant::new(Arc::new(generator(&stub, API_KEY).await));
    let mut cache = offline_cache();
    cache.create("Questions").await.unwrap();
    cache.update_code("// mine").unwrap();

    assistant.handle(&mut cache, "what is a hook?").await.unwrap();
    let outcome = assistant.handle(&mut cache, "and why?").await.unwrap();

    assert_eq!(outcome, AssistantOutcome::Replied { code_updated: false });
    assert_eq!(cache.active().unwrap().code, "// mine");
    assert_eq!(cache.active().unwrap().messages.len(), 4);

    let body = stub.last_body.lock().unwrap().clone();
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[2]["parts"][0]["text"], "Current message: and why?");
}

#[tokio::test]
async fn test_provider_failure_becomes_chat_message() {
    let stub = Stub::default();
    let assistant = ChatAssistant::new(Arc::new(generator(&stub, "wrong-key").await));
    let mut cache = offline_cache();
    cache.create("Broken").await.unwrap();
    cache.update_code("const keep = 1;").unwrap();

    let outcome = assistant
        .handle(&mut cache, "create a navbar")
        .await
        .unwrap();

    assert_matches!(outcome, AssistantOutcome::Failed { .. });
    let active = cache.active().unwrap();
    assert_eq!(active.code, "const keep = 1;");
    assert_eq!(active.messages.len(), 2);
    assert_eq!(active.messages[1].content, FAILURE_REPLY);
}

#[tokio::test]
async fn test_missing_key_is_a_chat_failure_too() {
    let assistant = ChatAssistant::new(Arc::new(TextGenerator::new(GenerationConfig::default())));
    let mut cache = offline_cache();
    cache.create("No key").await.unwrap();

    let outcome = assistant.handle(&mut cache, "hello").await.unwrap();
    assert_matches!(outcome, AssistantOutcome::Failed { .. });

    assert_eq!(
        assistant.handle(&mut cache, "   ").await.unwrap(),
        AssistantOutcome::Ignored
    );
}

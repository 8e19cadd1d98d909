//! Chat assistant that feeds the active session's transcript to the
//! text generator.
//!
//! Provider failures never propagate: they become an assistant message in
//! the transcript plus a [`AssistantOutcome::Failed`] notice for the UI.

use std::sync::{Arc, LazyLock};

use playground_core::session::MessageRole;
use regex::Regex;

use crate::cache::SessionCache;
use crate::error::ClientError;
use crate::generation::{ProviderError, TextGenerator, Turn};

/// Transcript entry recorded when the provider fails.
pub const FAILURE_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Notice surfaced alongside [`FAILURE_REPLY`].
pub const FAILURE_NOTICE: &str = "Failed to get AI response";

static CODE_REQUEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)generate|create|build|make|code|component").expect("valid regex")
});

/// Whether a prompt asks for code rather than conversation.
pub fn is_code_request(prompt: &str) -> bool {
    CODE_REQUEST_RE.is_match(prompt)
}

/// Whether a reply is worth putting into the editor.
fn looks_like_code(reply: &str) -> bool {
    ["export", "function", "const"]
        .iter()
        .any(|marker| reply.contains(marker))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantOutcome {
    /// Blank input; nothing recorded.
    Ignored,
    Replied { code_updated: bool },
    Failed { notice: String },
}

pub struct ChatAssistant {
    generator: Arc<TextGenerator>,
}

impl ChatAssistant {
    pub fn new(generator: Arc<TextGenerator>) -> Self {
        Self { generator }
    }

    /// Handle one user prompt against the cache's active session.
    ///
    /// Records the user message, asks the generator, and records the reply.
    /// Code replies also replace the editor code. Only local state changes;
    /// persisting is the caller's `save`.
    pub async fn handle(
        &self,
        cache: &mut SessionCache,
        prompt: &str,
    ) -> Result<AssistantOutcome, ClientError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(AssistantOutcome::Ignored);
        }

        let history: Vec<Turn> = cache
            .active()
            .ok_or(ClientError::NoActiveSession)?
            .messages
            .iter()
            .map(|m| Turn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();

        cache.push_message(MessageRole::User, prompt)?;

        let code_request = is_code_request(prompt);
        let result = if code_request {
            self.generator.generate_code(prompt).await
        } else {
            self.generator.chat(prompt, history).await
        }
        .and_then(|reply| {
            if reply.trim().is_empty() {
                Err(ProviderError::MalformedResponse)
            } else {
                Ok(reply)
            }
        });

        match result {
            Ok(reply) => {
                let code_updated = code_request && looks_like_code(&reply);
                if code_updated {
                    cache.update_code(reply.clone())?;
                }
                cache.push_message(MessageRole::Assistant, &reply)?;
                Ok(AssistantOutcome::Replied { code_updated })
            }
            Err(e) => {
                tracing::warn!(error = %e, code_request, "Assistant request failed");
                cache.push_message(MessageRole::Assistant, FAILURE_REPLY)?;
                Ok(AssistantOutcome::Failed {
                    notice: FAILURE_NOTICE.to_string(),
                })
            }
        }
    }
}

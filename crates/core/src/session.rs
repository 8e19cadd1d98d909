//! Playground session field rules and validating constructors.
//!
//! Callers hand raw [`SessionFields`] to [`SessionDraft::from_fields`] (create)
//! or [`SessionPatch::from_fields`] (partial update). Both either return a
//! fully valid value or the complete list of violated constraints, so nothing
//! reaches a store half-checked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, FieldError};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum session name length in characters (after trimming).
pub const MAX_NAME_LEN: usize = 100;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum length of a single tag in characters (after trimming).
pub const MAX_TAG_LEN: usize = 30;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Source language of a session's code blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Typescript,
    Jsx,
    #[default]
    Tsx,
    Html,
    Css,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Javascript,
        Language::Typescript,
        Language::Jsx,
        Language::Tsx,
        Language::Html,
        Language::Css,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Jsx => "jsx",
            Language::Tsx => "tsx",
            Language::Html => "html",
            Language::Css => "css",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| CoreError::invalid("language", invalid_language_message(s)))
    }
}

impl TryFrom<String> for Language {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn invalid_language_message(value: &str) -> String {
    let valid: Vec<&str> = Language::ALL.iter().map(|l| l.as_str()).collect();
    format!(
        "Invalid language '{value}'. Valid languages: {}",
        valid.join(", ")
    )
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl FromStr for MessageRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(CoreError::invalid(
                "role",
                "Role must be either \"user\" or \"assistant\"",
            )),
        }
    }
}

/// One entry of a session transcript as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: Timestamp,
}

/// A validated message awaiting its server-assigned timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub role: MessageRole,
    pub content: String,
}

impl MessageDraft {
    /// Validate an append-message request. Both fields are required.
    pub fn new(role: Option<&str>, content: Option<&str>) -> Result<Self, CoreError> {
        let mut errors = Vec::new();

        let role = match role {
            None | Some("") => {
                errors.push(FieldError::new("role", "Role is required"));
                None
            }
            Some(raw) => match raw.parse::<MessageRole>() {
                Ok(role) => Some(role),
                Err(CoreError::Validation(mut errs)) => {
                    errors.append(&mut errs);
                    None
                }
                Err(other) => return Err(other),
            },
        };

        let content = match content {
            Some(c) if !c.is_empty() => Some(c.to_string()),
            _ => {
                errors.push(FieldError::new("content", "Content is required"));
                None
            }
        };

        match (role, content) {
            (Some(role), Some(content)) if errors.is_empty() => Ok(Self { role, content }),
            _ => Err(CoreError::Validation(errors)),
        }
    }

    /// Stamp the draft, producing the persisted form.
    pub fn stamp(self, timestamp: Timestamp) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// Session fields exactly as a caller supplied them. Every field is optional
/// at this stage; which ones are required depends on the operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// A fully validated new session, defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub name: String,
    pub description: String,
    pub code: String,
    pub language: Language,
    pub tags: Vec<String>,
    pub is_public: bool,
}

impl SessionDraft {
    pub fn from_fields(fields: SessionFields) -> Result<Self, CoreError> {
        let mut errors = Vec::new();

        let name = match fields.name.as_deref() {
            Some(raw) => collect(validate_name(raw), &mut errors),
            None => {
                errors.push(FieldError::new("name", "Session name is required"));
                None
            }
        };
        let description = match fields.description {
            Some(d) => collect(validate_description(&d).map(|()| d), &mut errors),
            None => Some(String::new()),
        };
        let language = match fields.language.as_deref() {
            Some(raw) => collect(raw.parse::<Language>(), &mut errors),
            None => Some(Language::default()),
        };
        let tags = match fields.tags {
            Some(raw) => collect(normalize_tags(&raw), &mut errors),
            None => Some(Vec::new()),
        };

        match (name, description, language, tags) {
            (Some(name), Some(description), Some(language), Some(tags)) if errors.is_empty() => {
                Ok(Self {
                    name,
                    description,
                    code: fields.code.unwrap_or_default(),
                    language,
                    tags,
                    is_public: fields.is_public.unwrap_or(false),
                })
            }
            _ => Err(CoreError::Validation(errors)),
        }
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// A validated partial update. `None` means "keep the stored value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub language: Option<Language>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl SessionPatch {
    /// Validate every supplied field with the creation rules. Any violation
    /// rejects the whole patch.
    pub fn from_fields(fields: SessionFields) -> Result<Self, CoreError> {
        let mut errors = Vec::new();

        let name = fields
            .name
            .as_deref()
            .and_then(|raw| collect(validate_name(raw), &mut errors));
        let description = fields
            .description
            .and_then(|d| collect(validate_description(&d).map(|()| d), &mut errors));
        let language = fields
            .language
            .as_deref()
            .and_then(|raw| collect(raw.parse::<Language>(), &mut errors));
        let tags = fields
            .tags
            .as_deref()
            .and_then(|raw| collect(normalize_tags(raw), &mut errors));

        if !errors.is_empty() {
            return Err(CoreError::Validation(errors));
        }

        Ok(Self {
            name,
            description,
            code: fields.code,
            language,
            tags,
            is_public: fields.is_public,
        })
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Trim and check a session name, returning the stored form.
pub fn validate_name(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(CoreError::invalid(
            "name",
            format!("Session name must be between 1 and {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::invalid(
            "description",
            format!("Description cannot be more than {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(())
}

/// Trim tags, drop empty ones, and collapse duplicates to their first
/// occurrence. Any tag longer than [`MAX_TAG_LEN`] rejects the whole list.
pub fn normalize_tags(raw: &[String]) -> Result<Vec<String>, CoreError> {
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();

    for (index, tag) in raw.iter().enumerate() {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_TAG_LEN {
            errors.push(FieldError::new(
                format!("tags[{index}]"),
                format!("Tag cannot be more than {MAX_TAG_LEN} characters"),
            ));
            continue;
        }
        if !tags.iter().any(|t| t == trimmed) {
            tags.push(trimmed.to_string());
        }
    }

    if errors.is_empty() {
        Ok(tags)
    } else {
        Err(CoreError::Validation(errors))
    }
}

/// Split a comma-separated tag filter (`?tags=a,b`) into trimmed, non-empty tags.
pub fn parse_tag_filter(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Move a field result into `errors` on failure.
fn collect<T>(result: Result<T, CoreError>, errors: &mut Vec<FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(CoreError::Validation(mut errs)) => {
            errors.append(&mut errs);
            None
        }
        Err(other) => {
            errors.push(FieldError::new("_", other.to_string()));
            None
        }
    }
}

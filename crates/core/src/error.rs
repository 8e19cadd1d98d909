use std::fmt;

use serde::{Deserialize, Serialize};

/// A single violated constraint on one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Covers both "does not exist" and "exists but belongs to someone else".
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl CoreError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation(vec![FieldError::new(field, message)])
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_every_field() {
        let err = CoreError::Validation(vec![
            FieldError::new("name", "is required"),
            FieldError::new("language", "is invalid"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: name: is required; language: is invalid"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = CoreError::NotFound { entity: "Session" };
        assert_eq!(err.to_string(), "Session not found");
    }
}

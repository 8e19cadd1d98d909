//! Account field rules: display names, emails, and password strength.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, FieldError};

/// Maximum display name length in characters (after trimming).
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Maximum avatar reference length in characters.
pub const MAX_AVATAR_LEN: usize = 2048;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

/// A validated registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    /// Validate all registration fields, collecting every violation.
    pub fn new(
        name: &str,
        email: &str,
        password: &str,
        min_password_len: usize,
    ) -> Result<Self, CoreError> {
        let mut errors = Vec::new();

        let name = push_err(validate_display_name(name), &mut errors);
        let email = push_err(normalize_email(email), &mut errors);
        push_err(
            validate_password_strength(password, min_password_len),
            &mut errors,
        );

        match (name, email) {
            (Some(name), Some(email)) if errors.is_empty() => Ok(Self {
                name,
                email,
                password: password.to_string(),
            }),
            _ => Err(CoreError::Validation(errors)),
        }
    }
}

/// Trim and check a display name.
pub fn validate_display_name(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_DISPLAY_NAME_LEN {
        return Err(CoreError::invalid(
            "name",
            format!("Name must be between 1 and {MAX_DISPLAY_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trim, lower-case, and shape-check an email address.
pub fn normalize_email(raw: &str) -> Result<String, CoreError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(CoreError::invalid(
            "email",
            "Please provide a valid email address",
        ));
    }
    Ok(email)
}

/// Check that a password meets the minimum length.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), CoreError> {
    if password.chars().count() < min_length {
        return Err(CoreError::invalid(
            "password",
            format!("Password must be at least {min_length} characters long"),
        ));
    }
    Ok(())
}

pub fn validate_avatar(avatar: &str) -> Result<(), CoreError> {
    if avatar.chars().count() > MAX_AVATAR_LEN {
        return Err(CoreError::invalid(
            "avatar",
            format!("Avatar cannot be more than {MAX_AVATAR_LEN} characters"),
        ));
    }
    Ok(())
}

fn push_err<T>(result: Result<T, CoreError>, errors: &mut Vec<FieldError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_normalizes_fields() {
        let reg = Registration::new("  Ada ", " Ada@Example.COM ", "secret1", 6).unwrap();
        assert_eq!(reg.name, "Ada");
        assert_eq!(reg.email, "ada@example.com");
        assert_eq!(reg.password, "secret1");
    }

    #[test]
    fn test_registration_collects_errors() {
        let err = Registration::new("", "not-an-email", "123", 6).unwrap_err();
        match err {
            CoreError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "email", "password"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(normalize_email("a@b.co").is_ok());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("a b@c.de").is_err());
        assert!(normalize_email("@c.de").is_err());
    }

    #[test]
    fn test_password_min_length_boundary() {
        assert!(validate_password_strength("123456", 6).is_ok());
        let msg = validate_password_strength("12345", 6)
            .unwrap_err()
            .to_string();
        assert!(msg.contains("at least 6 characters"));
    }

    #[test]
    fn test_display_name_bounds() {
        assert!(validate_display_name(&"n".repeat(50)).is_ok());
        assert!(validate_display_name(&"n".repeat(51)).is_err());
        assert!(validate_display_name("   ").is_err());
    }
}

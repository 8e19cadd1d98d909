//! PostgreSQL repositories. Each is a zero-sized namespace of async functions
//! taking a `&PgPool`, mirroring one table.

pub mod session_repo;
pub mod user_repo;

pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;

/// Turn free-text search input into an `ILIKE` substring pattern, escaping
/// the pattern metacharacters so the input is matched literally.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

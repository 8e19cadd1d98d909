pub mod session;
pub mod user;

/// One page of rows plus the number of rows matching the query overall.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}

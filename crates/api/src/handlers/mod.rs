pub mod auth;
pub mod public;
pub mod sessions;
pub mod user;

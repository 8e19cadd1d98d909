//! Client-side half of the component playground.
//!
//! [`api::ApiClient`] speaks the HTTP envelope and owns the token pair,
//! [`auth::AuthContext`] and [`cache::SessionCache`] are the explicit state
//! objects a UI holds, and [`assistant::ChatAssistant`] drives the
//! text-generation provider through [`generation::TextGenerator`].

pub mod api;
pub mod assistant;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod playground;
pub mod storage;

pub use api::ApiClient;
pub use auth::AuthContext;
pub use cache::{SessionCache, SessionKey};
pub use config::ClientConfig;
pub use error::ClientError;

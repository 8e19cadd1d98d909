//! Playground API server library.
//!
//! Exposes configuration, state, auth, error handling, and the router so the
//! binary entrypoint, integration tests, and the client crate's tests can all
//! build the same service.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;

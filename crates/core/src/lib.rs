//! Domain layer for the component playground.
//!
//! Everything here is free of I/O so the HTTP service, the stores, and the
//! client crate all apply the same field rules.

pub mod account;
pub mod error;
pub mod pagination;
pub mod session;
pub mod types;

//! Access control extractors.
//!
//! - [`auth::AuthUser`] -- required authentication; rejects with 401.
//! - [`auth::MaybeAuthUser`] -- optional authentication; never rejects.

pub mod auth;

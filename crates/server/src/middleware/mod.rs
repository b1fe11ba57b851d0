//! Request middleware and extractors.

pub mod auth;

pub use auth::{ACCESS_COOKIE, CurrentUser, REFRESH_COOKIE, RequireAuth, require_role};

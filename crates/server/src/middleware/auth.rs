//! Authentication extractor and role checks.
//!
//! The access token travels either as a `Bearer` header or as the
//! `access_token` cookie; both are accepted everywhere. Role
//! requirements are an explicit check at the top of each handler, not a
//! route-layer closure.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};
use axum_extra::extract::cookie::CookieJar;

use marketplace_core::{Role, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// The authenticated caller, as attested by a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
}

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("hello, user {}", user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing credentials".to_string()))?;

        let claims = state
            .tokens()
            .verify_access(&token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(Self(CurrentUser {
            id: claims.user_id(),
            role: claims.role,
        }))
    }
}

/// Pull the access token from the `Authorization: Bearer` header or the
/// `access_token` cookie, in that order.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token.to_string());
    }
    CookieJar::from_headers(headers)
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}

/// Explicit capability check: does `actual` satisfy `required`?
///
/// An empty `required` slice means "any authenticated identity".
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the caller's role is not in the
/// required set.
pub fn require_role(required: &[Role], actual: Role) -> Result<(), AppError> {
    if required.is_empty() || required.contains(&actual) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ))
    }
}

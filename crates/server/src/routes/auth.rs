//! Auth route handlers: register, login, refresh, logout.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::instrument;

use marketplace_core::{Email, Role};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::middleware::{ACCESS_COOKIE, REFRESH_COOKIE};
use crate::models::User;
use crate::response::ApiResponse;
use crate::services::passwords;
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 6;

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
}

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<Email, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        Email::parse(&self.email).map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile subset returned on login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub name: String,
    pub email: Email,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: LoginUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

// =============================================================================
// Cookie Helpers
// =============================================================================

fn auth_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

fn clear_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, String::new()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account. The requested role is ignored; everyone registers
/// as a customer.
#[instrument(skip(state, body))]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let email = body.validate()?;

    let hash = passwords::hash_password(&body.password, state.config().bcrypt_cost)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = UserRepository::new(state.pool())
        .create(body.name.trim(), &email, &hash)
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::created("User registered successfully", user))
}

/// Verify credentials and issue the access/refresh token pair, both in
/// the body and as httpOnly cookies.
#[instrument(skip(state, jar, body))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = Email::parse(&body.email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (user, hash) = UserRepository::new(state.pool())
        .get_with_credentials(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    let matches = passwords::verify_password(&body.password, &hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !matches {
        return Err(AppError::Unauthorized("Incorrect password".to_string()));
    }

    let tokens = state.tokens();
    let access = tokens
        .issue_access(user.id, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let refresh = tokens
        .issue_refresh(user.id, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let jar = jar
        .add(auth_cookie(
            ACCESS_COOKIE,
            access.clone(),
            tokens.access_ttl_secs(),
        ))
        .add(auth_cookie(
            REFRESH_COOKIE,
            refresh.clone(),
            tokens.refresh_ttl_secs(),
        ));

    let data = LoginResponse {
        user: LoginUser {
            name: user.name,
            email: user.email,
            role: user.role,
        },
        access_token: access,
        refresh_token: refresh,
    };

    Ok((jar, ApiResponse::ok("Logged in successfully", data)))
}

/// Exchange a valid refresh token (body or cookie) for a fresh access
/// token, after re-confirming the user still exists.
#[instrument(skip(state, jar, body))]
async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let token = body
        .and_then(|Json(b)| b.refresh_token)
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let tokens = state.tokens();
    let claims = tokens
        .verify_refresh(&token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

    let user = UserRepository::new(state.pool())
        .get_by_id(claims.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let access = tokens
        .issue_access(user.id, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let jar = jar.add(auth_cookie(
        ACCESS_COOKIE,
        access.clone(),
        tokens.access_ttl_secs(),
    ));

    Ok((
        jar,
        ApiResponse::ok(
            "Access token refreshed successfully",
            RefreshResponse {
                access_token: access,
            },
        ),
    ))
}

/// Clear auth cookies. Tokens are stateless, so there is nothing to
/// revoke server-side.
#[instrument(skip(jar))]
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .add(clear_cookie(ACCESS_COOKIE))
        .add(clear_cookie(REFRESH_COOKIE));
    (
        jar,
        ApiResponse::<serde_json::Value>::ok_empty("Logged out successfully"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret-password".to_string(),
        };
        assert!(ok.validate().is_ok());

        let blank_name = RegisterRequest {
            name: "   ".to_string(),
            ..clone_req(&ok)
        };
        assert!(blank_name.validate().is_err());

        let short_password = RegisterRequest {
            password: "abc".to_string(),
            ..clone_req(&ok)
        };
        assert!(short_password.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..clone_req(&ok)
        };
        assert!(bad_email.validate().is_err());
    }

    fn clone_req(req: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            name: req.name.clone(),
            email: req.email.clone(),
            password: req.password.clone(),
        }
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = auth_cookie(ACCESS_COOKIE, "tok".to_string(), 900);
        assert_eq!(cookie.name(), "access_token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(900)));

        let cleared = clear_cookie(ACCESS_COOKIE);
        assert_eq!(cleared.max_age(), Some(Duration::ZERO));
    }
}

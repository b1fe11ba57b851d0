//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Access token signing secret (min 32 chars)
//! - `JWT_REFRESH_SECRET` - Refresh token signing secret (min 32 chars)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `JWT_EXPIRES_IN_SECS` - Access token lifetime (default: 900)
//! - `JWT_REFRESH_EXPIRES_IN_SECS` - Refresh token lifetime (default: 2592000)
//! - `BCRYPT_COST` - Password hashing cost factor (default: 10)
//! - `UPLOAD_DIR` - Directory for product image assets (default: uploads)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_SECRET_LENGTH: usize = 32;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ACCESS_EXPIRY_SECS: i64 = 15 * 60;
const DEFAULT_REFRESH_EXPIRY_SECS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_BCRYPT_COST: u32 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Password hashing cost factor
    pub bcrypt_cost: u32,
    /// Directory where uploaded product images are stored
    pub upload_dir: String,
}

/// Signed-token configuration.
///
/// Implements `Debug` manually to redact both secrets.
#[derive(Clone)]
pub struct JwtConfig {
    /// Access token signing secret
    pub secret: SecretString,
    /// Refresh token signing secret
    pub refresh_secret: SecretString,
    /// Access token lifetime in seconds
    pub expires_in_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("expires_in_secs", &self.expires_in_secs)
            .field("refresh_expires_in_secs", &self.refresh_expires_in_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is missing, a value
    /// fails to parse, or a signing secret is too short.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = SecretString::from(required_var("DATABASE_URL")?);

        let host = optional_var("HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;

        let port = match optional_var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let jwt = JwtConfig {
            secret: secret_var("JWT_SECRET")?,
            refresh_secret: secret_var("JWT_REFRESH_SECRET")?,
            expires_in_secs: int_var("JWT_EXPIRES_IN_SECS", DEFAULT_ACCESS_EXPIRY_SECS)?,
            refresh_expires_in_secs: int_var(
                "JWT_REFRESH_EXPIRES_IN_SECS",
                DEFAULT_REFRESH_EXPIRY_SECS,
            )?,
        };

        let bcrypt_cost = match optional_var("BCRYPT_COST") {
            Some(raw) => raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidEnvVar("BCRYPT_COST".to_string(), e.to_string())
            })?,
            None => DEFAULT_BCRYPT_COST,
        };

        let upload_dir = optional_var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string());

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            bcrypt_cost,
            upload_dir,
        })
    }

    /// Socket address to bind the listener to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn int_var(name: &str, default: i64) -> Result<i64, ConfigError> {
    match optional_var(name) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Load a signing secret, rejecting values that are too short to be real.
fn secret_var(name: &str) -> Result<SecretString, ConfigError> {
    let value = required_var(name)?;
    validate_secret(name, &value)?;
    Ok(SecretString::from(value))
}

fn validate_secret(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            name.to_string(),
            format!("must be at least {MIN_SECRET_LENGTH} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        let err = validate_secret("JWT_SECRET", "short").expect_err("should reject");
        assert!(matches!(err, ConfigError::InsecureSecret(name, _) if name == "JWT_SECRET"));
    }

    #[test]
    fn test_long_secret_accepted() {
        let value = "a".repeat(MIN_SECRET_LENGTH);
        assert!(validate_secret("JWT_SECRET", &value).is_ok());
    }

    #[test]
    fn test_jwt_config_debug_redacts_secrets() {
        let jwt = JwtConfig {
            secret: SecretString::from("x".repeat(40)),
            refresh_secret: SecretString::from("y".repeat(40)),
            expires_in_secs: 900,
            refresh_expires_in_secs: 3600,
        };
        let debug = format!("{jwt:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("xxxx"));
        assert!(!debug.contains("yyyy"));
    }
}

//! User account model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{Email, Role, UserId};

/// A user account as exposed by the API.
///
/// The password hash never leaves the db layer; this struct has no field
/// for it by construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serializes_without_password() {
        let user = User {
            id: UserId::new(1),
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            role: Role::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "customer");
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
    }
}

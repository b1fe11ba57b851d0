//! Product review model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{ProductId, ReviewId, UserId};

/// A review with the reviewer resolved to a display name only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

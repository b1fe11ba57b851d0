//! Catalog product model and listing filters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::ProductId;

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing filter: free-text term over the searchable fields (name,
/// description) plus an inclusive price range.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    pub search_term: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilters {
    /// Whether any filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.search_term.is_none() && self.min_price.is_none() && self.max_price.is_none()
    }
}

/// Whitelisted sort fields for the product listing.
///
/// The column name never comes from user input unparsed; unknown fields
/// fall back to the default at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    Name,
    Price,
    #[default]
    CreatedAt,
}

impl ProductSort {
    /// Column name for the ORDER BY clause.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::CreatedAt => "created_at",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_columns() {
        assert_eq!(ProductSort::Name.column(), "name");
        assert_eq!(ProductSort::Price.column(), "price");
        assert_eq!(ProductSort::CreatedAt.column(), "created_at");
    }

    #[test]
    fn test_sort_field_deserializes_snake_case() {
        let sort: ProductSort = serde_json::from_str("\"created_at\"").unwrap();
        assert_eq!(sort, ProductSort::CreatedAt);
        assert!(serde_json::from_str::<ProductSort>("\"; DROP TABLE\"").is_err());
    }

    #[test]
    fn test_filters_is_empty() {
        assert!(ProductFilters::default().is_empty());
        let filters = ProductFilters {
            search_term: Some("chair".to_string()),
            ..Default::default()
        };
        assert!(!filters.is_empty());
    }
}

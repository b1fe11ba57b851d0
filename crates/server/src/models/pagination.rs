//! Pagination query options and normalization.

use serde::Deserialize;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Sort direction supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Normalized page/limit pair.
///
/// Raw query values are clamped: page is at least 1, limit is between 1
/// and 100, both defaulting when absent or nonsensical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub page: i64,
    pub limit: i64,
}

impl PageOptions {
    /// Build normalized options from raw (possibly absent) query values.
    #[must_use]
    pub fn from_raw(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(self) -> i64 {
        (self.page - 1) * self.limit
    }
}

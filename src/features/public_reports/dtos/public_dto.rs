use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::incidents::models::{DomainRankingRow, PublicIncidentRow};
use crate::shared::constants::{
    DEFAULT_FEED_WINDOW_DAYS, DEFAULT_PUBLIC_PAGE_SIZE, DEFAULT_RANKING_PAGE_SIZE,
    DEFAULT_RANKING_WINDOW_DAYS, PUBLIC_SEARCH_PATH,
};
use crate::shared::types::{FeedOrder, SearchOrder};
use crate::shared::validation::PAGE_URL_REGEX;

fn default_public_limit() -> i64 {
    DEFAULT_PUBLIC_PAGE_SIZE
}

fn default_ranking_limit() -> i64 {
    DEFAULT_RANKING_PAGE_SIZE
}

fn default_ranking_window() -> i32 {
    DEFAULT_RANKING_WINDOW_DAYS
}

fn default_feed_window() -> i32 {
    DEFAULT_FEED_WINDOW_DAYS
}

// =============================================================================
// QUERY DTOs
// =============================================================================

/// Query params for searching published reports
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
pub struct PublicSearchQuery {
    /// Only reports linked to this category
    #[serde(alias = "categoryId")]
    #[validate(range(min = 1, message = "category_id must be a positive id"))]
    pub category_id: Option<i64>,
    /// Domain to match; scheme and leading `www.` are ignored
    #[validate(length(max = 253, message = "domain must not exceed 253 characters"))]
    pub domain: Option<String>,
    /// Full page URL, used for its host when `domain` is absent
    #[validate(regex(path = *PAGE_URL_REGEX, message = "url must be an http(s) URL"))]
    pub url: Option<String>,
    #[serde(default = "default_public_limit")]
    #[param(minimum = 1, maximum = 100)]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[param(minimum = 0)]
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,
    #[serde(default)]
    pub order: SearchOrder,
}

/// Query params for the domain ranking
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
pub struct DomainRankingQuery {
    /// Trailing window in days
    #[serde(default = "default_ranking_window")]
    #[param(minimum = 1, maximum = 365)]
    #[validate(range(min = 1, max = 365, message = "window must be between 1 and 365 days"))]
    pub window: i32,
    #[serde(default = "default_ranking_limit")]
    #[param(minimum = 1, maximum = 100)]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[param(minimum = 0)]
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,
}

/// Query params for the public feed
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
pub struct PublicFeedQuery {
    #[serde(default)]
    pub order: FeedOrder,
    #[serde(default = "default_public_limit")]
    #[param(minimum = 1, maximum = 100)]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    /// Ignored when `order=random`
    #[serde(default)]
    #[param(minimum = 0)]
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,
    /// Sampling window in days for `order=random`
    #[serde(default = "default_feed_window")]
    #[param(minimum = 1, maximum = 365)]
    #[validate(range(min = 1, max = 365, message = "window must be between 1 and 365 days"))]
    pub window: i32,
}

// =============================================================================
// RESPONSE DTOs
// =============================================================================

/// Published report as shown to anonymous visitors
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicReportDto {
    pub id: i64,
    /// Reporter name, or "Anonymous"
    pub reporter: String,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    /// Public URL of the cover image
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PublicIncidentRow> for PublicReportDto {
    fn from(row: PublicIncidentRow) -> Self {
        Self {
            reporter: row.reporter_name(),
            id: row.id,
            url: row.page_url,
            domain: row.domain,
            description: row.description,
            image_url: row.cover_path.as_deref().map(public_url),
            category_id: row.category_id,
            category: row.category_name,
            created_at: row.created_at,
        }
    }
}

/// One domain of the ranking
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DomainRankingDto {
    #[schema(example = "shop.example")]
    pub domain: String,
    pub reports: i64,
    pub top_category_id: Option<i64>,
    pub top_category_name: Option<String>,
    pub cover_image: Option<String>,
    pub last_report_at: Option<DateTime<Utc>>,
    /// Search link listing the reports of this domain
    #[schema(example = "/api/public/reports/search?domain=shop.example")]
    pub search_url: String,
}

impl From<DomainRankingRow> for DomainRankingDto {
    fn from(row: DomainRankingRow) -> Self {
        Self {
            search_url: format!(
                "{}?domain={}",
                PUBLIC_SEARCH_PATH,
                urlencoding::encode(&row.domain)
            ),
            domain: row.domain,
            reports: row.reports,
            top_category_id: row.top_category_id,
            top_category_name: row.top_category_name,
            cover_image: row.cover_path.as_deref().map(public_url),
            last_report_at: row.last_report_at,
        }
    }
}

fn public_url(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

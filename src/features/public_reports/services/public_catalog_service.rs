use crate::core::error::{AppError, Result};
use crate::features::incidents::models::{DomainRankingRow, PublicIncidentRow};
use crate::features::incidents::services::{
    public_incident_select, IncidentStore, COVER_ATTACHMENT_FILTER,
};
use crate::features::public_reports::dtos::{
    DomainRankingDto, DomainRankingQuery, PublicFeedQuery, PublicReportDto, PublicSearchQuery,
};
use crate::shared::domain::{normalize_domain, normalized_domain_of_url};
use crate::shared::types::FeedOrder;

/// Read-only projections over published reports
///
/// Every query goes through the published-only select, so drafts, rejected
/// and deleted reports never leak.
pub struct PublicCatalogService {
    store: IncidentStore,
}

impl PublicCatalogService {
    pub fn new(store: IncidentStore) -> Self {
        Self { store }
    }

    pub async fn search(&self, params: &PublicSearchQuery) -> Result<Vec<PublicReportDto>> {
        let domain = search_domain(params);
        let direction = params.order.as_sql();

        let query = format!(
            r#"
            {}
              AND ($1::BIGINT IS NULL OR EXISTS (
                    SELECT 1 FROM incident_categories ic
                     WHERE ic.incident_id = i.id AND ic.category_id = $1))
              AND ($2::TEXT IS NULL OR regexp_replace(lower(i.domain), '^www\.', '') = $2)
            ORDER BY i.created_at {direction}, i.id {direction}
            LIMIT $3 OFFSET $4
            "#,
            public_incident_select()
        );

        let rows = sqlx::query_as::<_, PublicIncidentRow>(&query)
            .bind(params.category_id)
            .bind(domain)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(self.store.pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to search published reports: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(rows.into_iter().map(PublicReportDto::from).collect())
    }

    /// Domains with the most published reports over a trailing window
    pub async fn rank_domains(&self, params: &DomainRankingQuery) -> Result<Vec<DomainRankingDto>> {
        let query = format!(
            r#"
            WITH fi AS (
                SELECT i.id,
                       i.created_at,
                       regexp_replace(lower(i.domain), '^www\.', '') AS domain_norm
                  FROM incidents i
                 WHERE i.status = 'published'
                   AND i.is_published = TRUE
                   AND i.domain IS NOT NULL
                   AND i.created_at >= NOW() - make_interval(days => $1)
            ),
            domain_counts AS (
                SELECT domain_norm AS domain,
                       COUNT(*) AS reports,
                       MAX(created_at) AS last_report_at
                  FROM fi
                 WHERE domain_norm <> ''
                 GROUP BY domain_norm
            ),
            top_category AS (
                SELECT DISTINCT ON (fi.domain_norm)
                       fi.domain_norm AS domain,
                       ic.category_id
                  FROM fi
                  JOIN incident_categories ic ON ic.incident_id = fi.id
                 GROUP BY fi.domain_norm, ic.category_id
                 ORDER BY fi.domain_norm, COUNT(*) DESC, ic.category_id ASC
            )
            SELECT d.domain,
                   d.reports,
                   tc.category_id AS top_category_id,
                   c.name AS top_category_name,
                   d.last_report_at,
                   (SELECT a.path
                      FROM attachments a
                      JOIN fi ON fi.id = a.incident_id
                     WHERE fi.domain_norm = d.domain
                       AND {COVER_ATTACHMENT_FILTER}
                     ORDER BY a.id ASC
                     LIMIT 1) AS cover_path
              FROM domain_counts d
              LEFT JOIN top_category tc ON tc.domain = d.domain
              LEFT JOIN categories c ON c.id = tc.category_id
             ORDER BY d.reports DESC, d.domain ASC
             LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, DomainRankingRow>(&query)
            .bind(params.window)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(self.store.pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to rank domains: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(rows.into_iter().map(DomainRankingDto::from).collect())
    }

    /// Newest published reports, or a random sample of a trailing window
    pub async fn feed(&self, params: &PublicFeedQuery) -> Result<Vec<PublicReportDto>> {
        let select = public_incident_select();

        let result = match params.order {
            FeedOrder::Newest => {
                let query = format!(
                    "{select} ORDER BY i.created_at DESC, i.id DESC LIMIT $1 OFFSET $2"
                );
                sqlx::query_as::<_, PublicIncidentRow>(&query)
                    .bind(params.limit)
                    .bind(params.offset)
                    .fetch_all(self.store.pool())
                    .await
            }
            FeedOrder::Random => {
                let query = format!(
                    "{select} AND i.created_at >= NOW() - make_interval(days => $2) \
                     ORDER BY random() LIMIT $1"
                );
                sqlx::query_as::<_, PublicIncidentRow>(&query)
                    .bind(params.limit)
                    .bind(params.window)
                    .fetch_all(self.store.pool())
                    .await
            }
        };

        let rows = result.map_err(|e| {
            tracing::error!("Failed to load public feed: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(rows.into_iter().map(PublicReportDto::from).collect())
    }

    pub async fn get_published(&self, incident_id: i64) -> Result<PublicReportDto> {
        self.store
            .find_published_by_id(incident_id)
            .await?
            .map(PublicReportDto::from)
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }
}

/// Normalized domain filter; `url` is only consulted when `domain` is absent
fn search_domain(params: &PublicSearchQuery) -> Option<String> {
    match (&params.domain, &params.url) {
        (Some(domain), _) => Some(normalize_domain(domain)).filter(|d| !d.is_empty()),
        (None, Some(url)) => normalized_domain_of_url(url),
        (None, None) => None,
    }
}

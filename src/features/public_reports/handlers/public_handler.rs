use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::core::error::AppError;
use crate::core::extractor::ValidatedQuery;
use crate::features::public_reports::dtos::{
    DomainRankingDto, DomainRankingQuery, PublicFeedQuery, PublicReportDto, PublicSearchQuery,
};
use crate::features::public_reports::services::PublicCatalogService;
use crate::shared::types::{ApiResponse, Meta};

fn listed<T>(items: Vec<T>) -> Json<ApiResponse<Vec<T>>> {
    let total = items.len() as i64;
    Json(ApiResponse::success(Some(items), None, Some(Meta { total })))
}

/// Search published reports by category and domain
#[utoipa::path(
    get,
    path = "/api/public/reports/search",
    tag = "public-reports",
    params(PublicSearchQuery),
    responses(
        (status = 200, description = "Matching published reports", body = ApiResponse<Vec<PublicReportDto>>),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn search_reports(
    State(service): State<Arc<PublicCatalogService>>,
    ValidatedQuery(params): ValidatedQuery<PublicSearchQuery>,
) -> Result<Json<ApiResponse<Vec<PublicReportDto>>>, AppError> {
    let reports = service.search(&params).await?;
    Ok(listed(reports))
}

/// Most reported domains over a trailing window
#[utoipa::path(
    get,
    path = "/api/public/reports/domains",
    tag = "public-reports",
    params(DomainRankingQuery),
    responses(
        (status = 200, description = "Domain ranking", body = ApiResponse<Vec<DomainRankingDto>>),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn rank_domains(
    State(service): State<Arc<PublicCatalogService>>,
    ValidatedQuery(params): ValidatedQuery<DomainRankingQuery>,
) -> Result<Json<ApiResponse<Vec<DomainRankingDto>>>, AppError> {
    let ranking = service.rank_domains(&params).await?;
    Ok(listed(ranking))
}

/// Public feed, newest first or a random sample
#[utoipa::path(
    get,
    path = "/api/public/reports/feed",
    tag = "public-reports",
    params(PublicFeedQuery),
    responses(
        (status = 200, description = "Published reports", body = ApiResponse<Vec<PublicReportDto>>),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn feed(
    State(service): State<Arc<PublicCatalogService>>,
    ValidatedQuery(params): ValidatedQuery<PublicFeedQuery>,
) -> Result<Json<ApiResponse<Vec<PublicReportDto>>>, AppError> {
    let reports = service.feed(&params).await?;
    Ok(listed(reports))
}

/// Get one published report
#[utoipa::path(
    get,
    path = "/api/public/reports/{id}",
    tag = "public-reports",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Published report", body = ApiResponse<PublicReportDto>),
        (status = 404, description = "Report not found or not published")
    )
)]
pub async fn get_report(
    State(service): State<Arc<PublicCatalogService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PublicReportDto>>, AppError> {
    let report = service.get_published(id).await?;
    Ok(Json(ApiResponse::success(Some(report), None, None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::lazy_test_pool;
    use crate::features::incidents::services::IncidentStore;
    use crate::features::public_reports::routes::routes;
    use axum::http::StatusCode;
    use axum_test::TestServer;

    fn server() -> TestServer {
        let service = Arc::new(PublicCatalogService::new(IncidentStore::new(lazy_test_pool())));
        TestServer::new(routes(service)).unwrap()
    }

    #[tokio::test]
    async fn test_limit_bounds_are_enforced() {
        let server = server();

        for path in [
            "/api/public/reports/search?limit=0",
            "/api/public/reports/search?limit=101",
            "/api/public/reports/feed?limit=0",
            "/api/public/reports/domains?limit=101",
        ] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_window_bounds_are_enforced() {
        let server = server();

        server
            .get("/api/public/reports/domains?window=366")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/public/reports/feed?order=random&window=0")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_parameters_are_rejected() {
        let server = server();

        for path in [
            "/api/public/reports/search?order=sideways",
            "/api/public/reports/search?offset=-1",
            "/api/public/reports/search?url=shop.example",
            "/api/public/reports/feed?order=oldest",
            "/api/public/reports/domains?limit=many",
        ] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: serde_json::Value = response.json();
            assert_eq!(body["success"], false);
        }
    }
}

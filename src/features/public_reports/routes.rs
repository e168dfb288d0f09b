use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::public_reports::handlers::{feed, get_report, rank_domains, search_reports};
use crate::features::public_reports::services::PublicCatalogService;

/// Create routes for the public catalog (no auth)
pub fn routes(service: Arc<PublicCatalogService>) -> Router {
    Router::new()
        .route("/api/public/reports/search", get(search_reports))
        .route("/api/public/reports/domains", get(rank_domains))
        .route("/api/public/reports/feed", get(feed))
        .route("/api/public/reports/{id}", get(get_report))
        .with_state(service)
}

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::core::config::StorageConfig;
use crate::features::incidents::handlers::{
    create_report, delete_my_report, get_my_report, list_my_reports, update_my_report, ReportState,
};

/// Headroom for multipart boundaries and text fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Body limits of the create and update endpoints; saturates on huge settings
fn body_limits(limits: &StorageConfig) -> (usize, usize) {
    let create = limits
        .max_file_size
        .saturating_mul(limits.max_files_per_report)
        .saturating_add(MULTIPART_OVERHEAD);
    let update = limits.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    (create, update)
}

/// Create routes for the owner-facing report endpoints
pub fn routes(state: ReportState) -> Router {
    let (create_limit, update_limit) = body_limits(&state.limits);

    Router::new()
        .route(
            "/api/reports",
            get(list_my_reports)
                .post(create_report)
                .layer(DefaultBodyLimit::max(create_limit)),
        )
        .route(
            "/api/reports/{id}",
            get(get_my_report)
                .patch(update_my_report)
                .delete(delete_my_report)
                .layer(DefaultBodyLimit::max(update_limit)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limits_cover_every_file() {
        let limits = StorageConfig {
            max_file_size: 10,
            max_files_per_report: 3,
            ..StorageConfig::default()
        };
        assert_eq!(
            body_limits(&limits),
            (30 + MULTIPART_OVERHEAD, 10 + MULTIPART_OVERHEAD)
        );
    }

    #[test]
    fn test_body_limits_saturate() {
        let limits = StorageConfig {
            max_file_size: usize::MAX / 2,
            max_files_per_report: 8,
            ..StorageConfig::default()
        };
        assert_eq!(body_limits(&limits), (usize::MAX, usize::MAX / 2 + MULTIPART_OVERHEAD));
    }
}

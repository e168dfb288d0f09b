use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::incidents::{
    dtos as incidents_dtos, handlers as incidents_handlers, models as incidents_models,
};
use crate::features::public_reports::{
    dtos as public_reports_dtos, handlers as public_reports_handlers,
};
use crate::shared::types::{ApiResponse, FeedOrder, Meta, SearchOrder};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Reports (owner)
        incidents_handlers::create_report,
        incidents_handlers::list_my_reports,
        incidents_handlers::get_my_report,
        incidents_handlers::update_my_report,
        incidents_handlers::delete_my_report,
        // Public catalog
        public_reports_handlers::search_reports,
        public_reports_handlers::rank_domains,
        public_reports_handlers::feed,
        public_reports_handlers::get_report,
    ),
    components(
        schemas(
            // Shared
            Meta,
            SearchOrder,
            FeedOrder,
            // Reports
            incidents_models::IncidentStatus,
            incidents_dtos::CreateIncidentForm,
            incidents_dtos::UpdateIncidentForm,
            incidents_dtos::AttachmentDto,
            incidents_dtos::IncidentDetailDto,
            incidents_dtos::OwnedIncidentDetailDto,
            incidents_dtos::IncidentSummaryDto,
            ApiResponse<incidents_dtos::IncidentDetailDto>,
            ApiResponse<incidents_dtos::OwnedIncidentDetailDto>,
            ApiResponse<Vec<incidents_dtos::IncidentSummaryDto>>,
            // Public catalog
            public_reports_dtos::PublicReportDto,
            public_reports_dtos::DomainRankingDto,
            ApiResponse<public_reports_dtos::PublicReportDto>,
            ApiResponse<Vec<public_reports_dtos::PublicReportDto>>,
            ApiResponse<Vec<public_reports_dtos::DomainRankingDto>>,
        )
    ),
    tags(
        (name = "reports", description = "Fraud reports owned by the signed-in user"),
        (name = "public-reports", description = "Published reports, domain ranking and feed (public)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Fraudwatch API",
        version = "0.1.0",
        description = "API documentation for Fraudwatch",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

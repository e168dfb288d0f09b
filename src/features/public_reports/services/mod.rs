mod public_catalog_service;

pub use public_catalog_service::PublicCatalogService;

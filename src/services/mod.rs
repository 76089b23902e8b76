//! Service layer
//!
//! ```text
//! HTTP routes (thin)
//!     ↓
//! Services (validation, cache, projection)
//!     ↓
//! Catalog queries (db/catalog.rs)
//!     ↓
//! SQLite
//! ```

pub mod catalog_service;
pub mod response;

pub use catalog_service::{CatalogService, GraphResponse};
pub use response::*;

use std::sync::Arc;

use crate::cache::{CacheConfig, ResultCache};
use crate::db::CatalogDb;
use crate::facets::{CatalogFacetSource, FacetOptions};
use crate::graph::LayoutConfig;
use crate::table::TableProjector;
use crate::types::Result;

/// Service container for dependency injection
pub struct Services {
    pub catalog: Arc<CatalogService>,
    pub cache: Arc<ResultCache>,
    pub facets: Arc<CatalogFacetSource>,
}

impl Services {
    pub fn new(
        db: Arc<CatalogDb>,
        cache_config: CacheConfig,
        layout: LayoutConfig,
        table: TableProjector,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(db, layout, table));
        Self {
            facets: Arc::new(CatalogFacetSource::new(catalog.clone())),
            cache: Arc::new(ResultCache::new(cache_config)),
            catalog,
        }
    }

    /// Default configuration over `db` (for testing)
    pub fn with_defaults(db: Arc<CatalogDb>) -> Self {
        Self::new(
            db,
            CacheConfig::default(),
            LayoutConfig::default(),
            TableProjector::default(),
        )
    }

    /// Unfiltered facet lists, the fallback when a facet query fails
    pub fn reference_facets(&self) -> Result<FacetOptions> {
        Ok(FacetOptions {
            domains: self.catalog.domains()?,
            objectives: self.catalog.objectives(None)?,
            tools: self.catalog.tools()?.iter().map(|t| t.summary()).collect(),
        })
    }
}

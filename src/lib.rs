//! COBIT 2019 catalog explorer
//!
//! Read-only HTTP API over the COBIT 2019 governance catalog: domains,
//! objectives, practices, activities and the tools that support them.
//! Filters compose across facets and drive three views of the same data:
//! the facet option lists, an objective/tool graph and a flattened table.

pub mod cache;
pub mod config;
pub mod db;
pub mod facets;
pub mod graph;
pub mod query;
pub mod routes;
pub mod server;
pub mod services;
pub mod table;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use services::Services;
pub use types::{CatalogError, Result};

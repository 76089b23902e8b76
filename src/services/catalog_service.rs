//! Catalog service - read operations over the catalog store
//!
//! Wraps the SQLite catalog with input validation and composes the query
//! builder with the graph and table projections.

use std::sync::Arc;

use serde::Serialize;

use crate::db::{self, catalog, CatalogDb};
use crate::graph::{self, GraphData, GraphLayout, LayoutConfig};
use crate::query::{domain_code, FilterSelection};
use crate::table::{TableProjector, TableQuery, TableView};
use crate::types::{CatalogError, Result};

/// Graph plus its layout inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphResponse {
    #[serde(flatten)]
    pub graph: GraphData,
    pub layout: GraphLayout,
}

pub struct CatalogService {
    db: Arc<CatalogDb>,
    layout: LayoutConfig,
    table: TableProjector,
}

impl CatalogService {
    pub fn new(db: Arc<CatalogDb>, layout: LayoutConfig, table: TableProjector) -> Self {
        Self { db, layout, table }
    }

    pub fn with_defaults(db: Arc<CatalogDb>) -> Self {
        Self::new(db, LayoutConfig::default(), TableProjector::default())
    }

    pub fn db(&self) -> &Arc<CatalogDb> {
        &self.db
    }

    fn require_id<'a>(&self, what: &str, id: &'a str) -> Result<&'a str> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CatalogError::InvalidInput(format!("{} id is required", what)));
        }
        Ok(id)
    }

    // =========================================================================
    // Reference data
    // =========================================================================

    pub fn domains(&self) -> Result<Vec<db::Domain>> {
        self.db.with_conn(catalog::list_domains)
    }

    /// Objectives, optionally of one domain given as code or `"CODE - Label"`
    pub fn objectives(&self, domain: Option<&str>) -> Result<Vec<db::Objective>> {
        let code = domain.map(domain_code).filter(|c| !c.is_empty());
        self.db.with_conn(|conn| catalog::list_objectives(conn, code))
    }

    pub fn objective(&self, id: &str) -> Result<db::Objective> {
        let id = self.require_id("Objective", id)?;
        self.db
            .with_conn(|conn| catalog::get_objective(conn, id))?
            .ok_or_else(|| CatalogError::NotFound(format!("Objective {} not found", id)))
    }

    pub fn practices(&self, objective_id: &str) -> Result<Vec<db::Practice>> {
        let objective = self.objective(objective_id)?;
        self.db
            .with_conn(|conn| catalog::practices_for_objective(conn, &objective.id))
    }

    pub fn activities(&self, practice_id: &str) -> Result<Vec<db::Activity>> {
        let id = self.require_id("Practice", practice_id)?;
        self.db.with_conn(|conn| catalog::activities_for_practice(conn, id))
    }

    pub fn tools(&self) -> Result<Vec<db::Tool>> {
        self.db.with_conn(catalog::list_tools)
    }

    pub fn tool(&self, id: &str) -> Result<db::Tool> {
        let id = self.require_id("Tool", id)?;
        self.db
            .with_conn(|conn| catalog::get_tool(conn, id))?
            .ok_or_else(|| CatalogError::NotFound(format!("Tool {} not found", id)))
    }

    pub fn tool_categories(&self) -> Result<Vec<db::CategoryCount>> {
        self.db.with_conn(catalog::tool_categories)
    }

    // =========================================================================
    // Filtered projections
    // =========================================================================

    pub fn domains_filtered(&self, selection: &FilterSelection) -> Result<Vec<db::Domain>> {
        self.db.with_conn(|conn| catalog::filtered_domains(conn, selection))
    }

    pub fn objectives_filtered(&self, selection: &FilterSelection) -> Result<Vec<db::Objective>> {
        self.db.with_conn(|conn| catalog::filtered_objectives(conn, selection))
    }

    pub fn tools_filtered(&self, selection: &FilterSelection) -> Result<Vec<db::ToolSummary>> {
        self.db.with_conn(|conn| catalog::filtered_tools(conn, selection))
    }

    pub fn graph(&self, selection: &FilterSelection) -> Result<GraphResponse> {
        let rows = self.db.with_conn(|conn| catalog::graph_rows(conn, selection))?;
        let graph = graph::materialize(&rows);
        let layout = graph::layout::compute(&graph, &self.layout);
        Ok(GraphResponse { graph, layout })
    }

    pub fn table_rows(&self, selection: &FilterSelection) -> Result<Vec<db::TableRow>> {
        self.db.with_conn(|conn| catalog::table_rows(conn, selection))
    }

    pub fn table(&self, selection: &FilterSelection, query: &TableQuery) -> Result<TableView> {
        let rows = self.table_rows(selection)?;
        Ok(self.table.project(&rows, query))
    }
}

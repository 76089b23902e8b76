//! Filtered projection routes
//!
//! All of these accept the shared filter parameters: repeated `domain`,
//! `objective` and `tool` keys plus `obj_N=CODE:LEVEL` pairs.
//!
//! - `GET /domains-filtered` - domains matching the objective/tool filters
//! - `GET /objectives-filtered` - objectives matching the domain/tool filters
//! - `GET /tools-filtered` - tools matching every filter
//! - `GET /graph` - objective/tool graph with layout inputs
//! - `GET /table` - flattened rows, with `q`, `sort`, `dir` and `page`
//! - `GET /facets` - all three facet lists for the current filters

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::{error, warn};

use super::{cached_json, RouteRequest};
use crate::cache::{CacheKey, TtlClass};
use crate::db::ToolsEnvelope;
use crate::facets::{self, FacetFilters};
use crate::server::AppState;
use crate::services::{cached, error_response, json_response, ok};

pub fn handle_domains_filtered(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let mut selection = req.query.selection();
    selection.domains.clear();

    let key = CacheKey::generate("domains-filtered", selection.cache_params());
    cached_json(state, req, key, TtlClass::Filtered, || {
        catalog.domains_filtered(&selection)
    })
}

pub fn handle_objectives_filtered(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let mut selection = req.query.selection();
    selection.objectives.clear();
    selection.selected_objectives.clear();

    let key = CacheKey::generate("objectives-filtered", selection.cache_params());
    cached_json(state, req, key, TtlClass::Filtered, || {
        catalog.objectives_filtered(&selection)
    })
}

/// Failures are reported in the envelope with an empty tool list.
///
/// Without filters this is the whole tool catalog and is cached as static data.
pub fn handle_tools_filtered(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let services = &state.services;
    let selection = req.query.selection();
    let class = if selection.is_empty() {
        TtlClass::Static
    } else {
        TtlClass::Filtered
    };

    let key = CacheKey::generate("tools-filtered", selection.cache_params());
    let result = services.cache.get_or_insert_with(&key, class, || {
        let tools = services.catalog.tools_filtered(&selection)?;
        Ok(serde_json::to_vec(&ToolsEnvelope::ok(tools))?)
    });

    match result {
        Ok(entry) => cached(&entry, req.if_none_match.as_deref()),
        Err(e) => {
            error!(error = %e, "Filtered tool query failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ToolsEnvelope::failed(e.public_message()),
            )
        }
    }
}

pub fn handle_graph(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let selection = req.query.selection();

    let key = CacheKey::generate("graph", selection.cache_params());
    cached_json(state, req, key, TtlClass::Graph, || catalog.graph(&selection))
}

pub fn handle_table(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let selection = req.query.selection();
    let view = req.query.table_query();

    let mut params = selection.cache_params();
    params.extend(req.query.table_cache_params());
    let key = CacheKey::generate("table", params);

    cached_json(state, req, key, TtlClass::Filtered, || catalog.table(&selection, &view))
}

/// Facet lists are resolved per request. A facet whose query fails falls back
/// to its unfiltered list and reports the error alongside.
pub async fn handle_facets(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let services = &state.services;
    let filters = FacetFilters::from_selection(&req.query.selection());

    let reference = match services.reference_facets() {
        Ok(reference) => Some(reference),
        Err(e) => {
            warn!(error = %e, "Reference facet lists unavailable");
            None
        }
    };

    match facets::resolve(services.facets.as_ref(), &filters, reference.as_ref()).await {
        Ok(snapshot) => ok(&snapshot),
        Err(e) => error_response(e),
    }
}

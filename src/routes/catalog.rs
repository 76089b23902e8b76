//! Reference data routes
//!
//! - `GET /domains`
//! - `GET /objectives?domain=...`
//! - `GET /objectives/{id}`
//! - `GET /objectives/{id}/practices`
//! - `GET /practices/{id}/activities`
//! - `GET /tools`
//! - `GET /tools/categories`
//! - `GET /tools/{id}`

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;

use super::{cached_json, RouteRequest};
use crate::cache::{CacheKey, TtlClass};
use crate::query::domain_code;
use crate::server::AppState;

pub fn handle_domains(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    cached_json(state, req, CacheKey::endpoint("domains"), TtlClass::Static, || {
        catalog.domains()
    })
}

pub fn handle_objectives(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let domain = req.query.get("domain");
    let code: Vec<String> = domain
        .map(|d| domain_code(d).to_string())
        .filter(|c| !c.is_empty())
        .into_iter()
        .collect();

    let key = CacheKey::generate("objectives", [("domain", code)]);
    cached_json(state, req, key, TtlClass::Static, || catalog.objectives(domain))
}

pub fn handle_objective(state: &AppState, req: &RouteRequest, id: &str) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let key = CacheKey::for_id("objective", id.trim());
    cached_json(state, req, key, TtlClass::Static, || catalog.objective(id))
}

pub fn handle_practices(state: &AppState, req: &RouteRequest, objective_id: &str) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let key = CacheKey::for_id("practices", objective_id.trim());
    cached_json(state, req, key, TtlClass::Static, || catalog.practices(objective_id))
}

pub fn handle_activities(state: &AppState, req: &RouteRequest, practice_id: &str) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let key = CacheKey::for_id("activities", practice_id.trim());
    cached_json(state, req, key, TtlClass::Static, || catalog.activities(practice_id))
}

pub fn handle_tools(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    cached_json(state, req, CacheKey::endpoint("tools"), TtlClass::Static, || {
        catalog.tools()
    })
}

pub fn handle_tool_categories(state: &AppState, req: &RouteRequest) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    cached_json(state, req, CacheKey::endpoint("tool-categories"), TtlClass::Static, || {
        catalog.tool_categories()
    })
}

pub fn handle_tool(state: &AppState, req: &RouteRequest, id: &str) -> Response<Full<Bytes>> {
    let catalog = &state.services.catalog;
    let key = CacheKey::for_id("tool", id.trim());
    cached_json(state, req, key, TtlClass::Static, || catalog.tool(id))
}

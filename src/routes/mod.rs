//! HTTP routes for the catalog explorer
//!
//! Every route is a read-only GET. Handlers take the shared [`AppState`] and
//! the parsed request parts, so they can be exercised without a socket.
//!
//! [`AppState`]: crate::server::AppState

pub mod catalog;
pub mod filtered;
pub mod health;
pub mod params;

pub use catalog::{
    handle_activities, handle_domains, handle_objective, handle_objectives, handle_practices,
    handle_tool, handle_tool_categories, handle_tools,
};
pub use filtered::{
    handle_domains_filtered, handle_facets, handle_graph, handle_objectives_filtered,
    handle_table, handle_tools_filtered,
};
pub use health::health_check;
pub use params::{decode_segment, path_param, QueryParams};

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde::Serialize;

use crate::cache::{CacheKey, TtlClass};
use crate::server::AppState;
use crate::services::{cached, error_response};
use crate::types::Result;

/// Parsed parts of one GET request
#[derive(Debug, Clone, Default)]
pub struct RouteRequest {
    pub query: QueryParams,
    pub if_none_match: Option<String>,
}

impl RouteRequest {
    pub fn new(query: Option<&str>, if_none_match: Option<&str>) -> Self {
        Self {
            query: QueryParams::parse(query),
            if_none_match: if_none_match.map(str::to_string),
        }
    }
}

/// Serve `compute`'s result through the result cache.
///
/// Errors are never cached; they go straight to an error response.
pub(crate) fn cached_json<T, F>(
    state: &AppState,
    req: &RouteRequest,
    key: CacheKey,
    class: TtlClass,
    compute: F,
) -> Response<Full<Bytes>>
where
    T: Serialize,
    F: FnOnce() -> Result<T>,
{
    let result = state
        .services
        .cache
        .get_or_insert_with(&key, class, || Ok(serde_json::to_vec(&compute()?)?));

    match result {
        Ok(entry) => cached(&entry, req.if_none_match.as_deref()),
        Err(e) => error_response(e),
    }
}

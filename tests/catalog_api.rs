//! End-to-end route tests over the bundled sample catalog
//!
//! Requests go through `server::dispatch`, the same entry point the hyper
//! service uses, against a seeded in-memory store.

use std::sync::Arc;

use bytes::Bytes;
use cobit_explorer::db::seed::{self, CatalogFixture};
use cobit_explorer::db::CatalogDb;
use cobit_explorer::routes::RouteRequest;
use cobit_explorer::server::{dispatch, AppState};
use cobit_explorer::Services;
use http_body_util::{BodyExt, Full};
use hyper::header;
use hyper::{Method, Response, StatusCode};
use serde_json::Value;

fn seeded_state() -> AppState {
    let db = Arc::new(CatalogDb::open_in_memory().unwrap());
    seed::import(&db, &CatalogFixture::sample()).unwrap();
    AppState::new("127.0.0.1:0".parse().unwrap(), Arc::new(Services::with_defaults(db)))
}

/// Sample catalog plus a tool whose id needs percent-encoding in a path
fn state_with_spaced_tool() -> AppState {
    let mut fixture = CatalogFixture::sample();
    let mut power_bi = fixture.tools[0].clone();
    power_bi.id = "Power BI".to_string();
    power_bi.category = "Analytics".to_string();
    fixture.tools.push(power_bi);

    let db = Arc::new(CatalogDb::open_in_memory().unwrap());
    seed::import(&db, &fixture).unwrap();
    AppState::new("127.0.0.1:0".parse().unwrap(), Arc::new(Services::with_defaults(db)))
}

async fn get(state: &AppState, path: &str, query: &str) -> Response<Full<Bytes>> {
    let query = (!query.is_empty()).then_some(query);
    dispatch(state, &Method::GET, path, &RouteRequest::new(query, None)).await
}

async fn body(response: Response<Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_json(state: &AppState, path: &str, query: &str) -> Value {
    let response = get(state, path, query).await;
    assert_eq!(response.status(), StatusCode::OK, "GET {}?{}", path, query);
    body(response).await
}

fn ids(value: &Value, field: &str) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item[field].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Reference data
// ============================================================================

#[tokio::test]
async fn test_reference_lists() {
    let state = seeded_state();

    let domains = get_json(&state, "/domains", "").await;
    assert_eq!(ids(&domains, "code"), vec!["APO", "BAI", "EDM"]);

    let tools = get_json(&state, "/tools", "").await;
    assert_eq!(tools.as_array().unwrap().len(), 4);
    let github = tools
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == "GitHub")
        .unwrap();
    assert_eq!(github["useCases"], serde_json::json!(["Version control", "Code review"]));
    assert_eq!(github["toolType"], "SaaS");

    let apo = get_json(&state, "/objectives", "domain=APO+-+Align%2C+Plan+and+Organise").await;
    assert_eq!(ids(&apo, "id"), vec!["APO01", "APO02"]);
}

#[tokio::test]
async fn test_single_lookups() {
    let state = seeded_state();

    let objective = get_json(&state, "/objectives/BAI01", "").await;
    assert_eq!(objective["domainCode"], "BAI");

    let tool = get_json(&state, "/tools/Jira", "").await;
    assert_eq!(tool["category"], "DevOps");

    let missing = get(&state, "/tools/Nope", "").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(missing).await["error"], "Tool Nope not found");
}

#[tokio::test]
async fn test_path_ids_are_percent_decoded() {
    let state = state_with_spaced_tool();

    let tool = get_json(&state, "/tools/Power%20BI", "").await;
    assert_eq!(tool["id"], "Power BI");
    assert_eq!(tool["category"], "Analytics");

    let filtered = get_json(&state, "/tools-filtered", "tool=Power%20BI").await;
    assert_eq!(filtered["success"], true);

    let missing = get(&state, "/objectives/ZZ%2001", "").await;
    assert_eq!(body(missing).await["error"], "Objective ZZ 01 not found");
}

#[tokio::test]
async fn test_undecodable_path_id_is_bad_request() {
    let state = seeded_state();
    let response = get(&state, "/tools/%FF", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(state.services.cache.is_empty());
}

// ============================================================================
// Filtered facets
// ============================================================================

#[tokio::test]
async fn test_domain_filter_is_code_prefix() {
    let state = seeded_state();
    let objectives = get_json(&state, "/objectives-filtered", "domain%5B%5D=APO").await;
    assert_eq!(ids(&objectives, "id"), vec!["APO01", "APO02"]);
}

#[tokio::test]
async fn test_domain_prefix_is_case_sensitive() {
    let state = seeded_state();
    let objectives = get_json(&state, "/objectives-filtered", "domain=apo").await;
    assert!(objectives.as_array().unwrap().is_empty());

    let tools = get_json(&state, "/tools-filtered", "domain=apo").await;
    assert!(tools["tools"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tools_filtered_ttl_class() {
    let state = seeded_state();
    let max_age = |response: &Response<Full<Bytes>>| -> u64 {
        let value = response.headers()[header::CACHE_CONTROL].to_str().unwrap();
        value.trim_start_matches("max-age=").parse().unwrap()
    };

    // No filters: the whole tool catalog, cached as static data
    let all = get(&state, "/tools-filtered", "").await;
    assert!(max_age(&all) > 300);

    let narrowed = get(&state, "/tools-filtered", "domain=APO").await;
    assert!(max_age(&narrowed) <= 120);
}
#[tokio::test]
async fn test_domains_filtered_by_tool() {
    let state = seeded_state();
    let domains = get_json(&state, "/domains-filtered", "tool=Jira").await;
    assert_eq!(ids(&domains, "code"), vec!["APO"]);

    let domains = get_json(&state, "/domains-filtered", "tool=Jira&tool=ServiceNow").await;
    assert_eq!(ids(&domains, "code"), vec!["APO", "BAI"]);
}

#[tokio::test]
async fn test_tools_filtered_envelope() {
    let state = seeded_state();

    let all = get_json(&state, "/tools-filtered", "").await;
    assert_eq!(all["success"], true);
    assert_eq!(ids(&all["tools"], "id"), vec!["Confluence", "GitHub", "Jira", "ServiceNow"]);

    let apo = get_json(&state, "/tools-filtered", "domain=APO").await;
    assert_eq!(ids(&apo["tools"], "id"), vec!["GitHub", "Jira"]);
    assert!(apo.get("error").is_none());
}

#[tokio::test]
async fn test_facets_exclude_own_selection() {
    let state = seeded_state();
    let facets = get_json(&state, "/facets", "domain=APO&tool=Jira").await;

    // Domains ignore the domain selection, so only the tool narrows them
    assert_eq!(ids(&facets["domains"], "code"), vec!["APO"]);
    assert_eq!(ids(&facets["objectives"], "id"), vec!["APO01"]);
    assert_eq!(ids(&facets["tools"], "id"), vec!["GitHub", "Jira"]);
    assert!(facets["errors"].as_object().unwrap().is_empty());
}

// ============================================================================
// Graph
// ============================================================================

#[tokio::test]
async fn test_graph_for_selected_objective() {
    let state = seeded_state();
    let graph = get_json(&state, "/graph", "obj_0=APO01:3").await;

    let nodes = graph["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["id"], "APO01");
    assert_eq!(nodes[0]["type"], "objective");

    let links = graph["links"].as_array().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["target"], "GitHub");
    assert_eq!(links[0]["count"], 2);
    assert_eq!(links[1]["target"], "Jira");
    assert_eq!(links[1]["count"], 1);
}

#[tokio::test]
async fn test_graph_level_cap() {
    let state = seeded_state();
    let graph = get_json(&state, "/graph", "obj_0=APO01:1").await;
    let links = graph["links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["target"], "GitHub");
    assert_eq!(links[0]["count"], 1);
}

#[tokio::test]
async fn test_graph_without_filters_covers_every_tool_link() {
    let state = seeded_state();
    let graph = get_json(&state, "/graph", "").await;
    let tool_nodes = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["type"] == "tool")
        .count();
    assert_eq!(tool_nodes, 4);
    assert_eq!(graph["layout"]["nodes"].as_array().unwrap().len(), graph["nodes"].as_array().unwrap().len());
}

// ============================================================================
// Table
// ============================================================================

#[tokio::test]
async fn test_table_selected_objective_levels() {
    let state = seeded_state();

    let table = get_json(&state, "/table", "obj_0=APO01:2").await;
    assert_eq!(table["total"], 2);
    assert_eq!(ids(&table["data"], "activityId"), vec!["APO01-P01-A01", "APO01-P01-A02"]);

    // Activities without a tool still appear in the table
    let table = get_json(&state, "/table", "obj_0=APO01:5").await;
    assert_eq!(table["total"], 4);
    assert!(table["data"][3]["toolId"].is_null());
}

#[tokio::test]
async fn test_table_level_is_monotonic() {
    let state = seeded_state();
    let mut previous = 0;
    for level in 1..=5 {
        let query = format!("obj_0=APO01:{}&obj_1=BAI01:{}", level, level);
        let total = get_json(&state, "/table", &query).await["total"].as_u64().unwrap();
        assert!(total >= previous, "level {} returned fewer rows", level);
        previous = total;
    }
    assert_eq!(previous, 6);
}

#[tokio::test]
async fn test_table_view_options() {
    let state = seeded_state();

    let everything = get_json(&state, "/table", "").await;
    assert_eq!(everything["total"], 7);

    let searched = get_json(&state, "/table", "q=confluence").await;
    assert_eq!(searched["total"], 1);
    assert_eq!(searched["data"][0]["objectiveId"], "EDM01");

    let paged = get_json(&state, "/table", "sort=capabilityLevel&dir=desc&page=1").await;
    assert_eq!(paged["pageSize"], 10);
    assert_eq!(paged["totalPages"], 1);
    assert_eq!(paged["data"][0]["capabilityLevel"], 4);
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_parameter_order_does_not_change_result() {
    let state = seeded_state();

    let a = get(&state, "/graph", "domain=APO&domain=BAI&tool=Jira").await;
    let b = get(&state, "/graph", "tool=Jira&domain=BAI&domain=APO").await;
    assert_eq!(a.headers()[header::ETAG], b.headers()[header::ETAG]);
    assert_eq!(body(a).await, body(b).await);

    let stats = state.services.cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_etag_revalidation() {
    let state = seeded_state();

    let first = get(&state, "/domains", "").await;
    let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();

    let req = RouteRequest::new(None, Some(&etag));
    let second = dispatch(&state, &Method::GET, "/domains", &req).await;
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(second.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let state = seeded_state();
    assert_eq!(get(&state, "/objectives/ZZZ99", "").await.status(), StatusCode::NOT_FOUND);
    assert!(state.services.cache.is_empty());
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let state = seeded_state();
    let _ = get(&state, "/domains", "").await;
    let _ = get(&state, "/domains", "").await;

    let health = get_json(&state, "/health", "").await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["database"], "connected");
    assert_eq!(health["cache"]["entries"], 1);
    assert_eq!(health["cache"]["hits"], 1);
    assert_eq!(health["cache"]["hit_rate"], 50.0);
    assert!(health["timestamp"].as_str().unwrap().contains('T'));
}

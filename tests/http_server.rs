//! Tests against a live listener
//!
//! The server runs on an ephemeral port; requests go over real sockets with
//! reqwest, and the HTTP facet source drives the coordinator through the
//! `*-filtered` endpoints.

use std::sync::Arc;
use std::time::Duration;

use cobit_explorer::db::seed::{self, CatalogFixture};
use cobit_explorer::db::CatalogDb;
use cobit_explorer::facets::{FacetConfig, FacetCoordinator, FacetFilters, HttpFacetSource};
use cobit_explorer::server::{serve, AppState};
use cobit_explorer::Services;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_test::assert_ok;

/// Start a server over a seeded on-disk catalog and return its base URL
async fn start_server() -> (String, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Arc::new(CatalogDb::open(&temp_dir.path().join("catalog.db")).unwrap());
    seed::import(&db, &CatalogFixture::sample()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::new(addr, Arc::new(Services::with_defaults(db))));
    tokio::spawn(serve(listener, state));

    (format!("http://{}", addr), temp_dir)
}

#[tokio::test]
async fn test_health_over_socket() {
    let (base, _temp) = start_server().await;

    let response = assert_ok!(reqwest::get(format!("{}/health", base)).await);
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: serde_json::Value = assert_ok!(response.json().await);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_conditional_get_over_socket() {
    let (base, _temp) = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/tools", base);

    let first = assert_ok!(client.get(&url).send().await);
    let etag = first.headers()["etag"].to_str().unwrap().to_string();
    assert!(first.headers().contains_key("cache-control"));

    let second = assert_ok!(client.get(&url).header("If-None-Match", &etag).send().await);
    assert_eq!(second.status(), reqwest::StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_coordinator_over_http_source() {
    let (base, _temp) = start_server().await;
    let source = Arc::new(HttpFacetSource::new(base).unwrap());

    let coordinator = assert_ok!(FacetCoordinator::load(source, FacetConfig::default()).await);
    assert_eq!(coordinator.reference().domains.len(), 3);
    assert_eq!(coordinator.reference().tools.len(), 4);

    let snapshot = assert_ok!(
        coordinator
            .refresh(FacetFilters {
                domain: vec!["APO".into()],
                ..Default::default()
            })
            .await
    );

    let objectives: Vec<_> = snapshot.options.objectives.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(objectives, vec!["APO01", "APO02"]);
    let tools: Vec<_> = snapshot.options.tools.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(tools, vec!["GitHub", "Jira"]);
    // The domain facet keeps its own full list
    assert_eq!(snapshot.options.domains.len(), 3);
    assert!(snapshot.errors.is_empty());
    assert!(snapshot.loading.is_empty());
}

#[tokio::test]
async fn test_debounced_update_over_http_source() {
    let (base, _temp) = start_server().await;
    let source = Arc::new(HttpFacetSource::new(base).unwrap());
    let coordinator = Arc::new(
        FacetCoordinator::load(source, FacetConfig {
            debounce: Duration::from_millis(20),
        })
        .await
        .unwrap(),
    );
    let mut rx = coordinator.subscribe();

    let generation = coordinator
        .update(FacetFilters {
            tool: vec!["ServiceNow".into()],
            ..Default::default()
        })
        .unwrap()
        .unwrap();

    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            let snapshot = rx.borrow().clone();
            if snapshot.generation == generation && snapshot.loading.is_empty() {
                return snapshot;
            }
        }
    })
    .await
    .expect("facet refresh did not settle");

    let domains: Vec<_> = settled.options.domains.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(domains, vec!["BAI"]);
    let objectives: Vec<_> = settled.options.objectives.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(objectives, vec!["BAI01"]);
}

#[tokio::test]
async fn test_unreachable_source_fails_load() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = Arc::new(HttpFacetSource::new(format!("http://{}", addr)).unwrap());
    let result = FacetCoordinator::load(source, FacetConfig::default()).await;
    assert!(result.is_err());
}

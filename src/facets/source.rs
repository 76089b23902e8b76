//! Where facet option lists come from
//!
//! [`CatalogFacetSource`] queries the local catalog service directly;
//! [`HttpFacetSource`] calls the `*-filtered` endpoints of a running server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{FacetKind, FacetList};
use crate::db::{Domain, Objective, ToolSummary, ToolsEnvelope};
use crate::query::FilterSelection;
use crate::services::CatalogService;
use crate::types::{CatalogError, Result};

/// Provider of filtered facet option lists
#[async_trait]
pub trait FacetSource: Send + Sync {
    async fn domains(&self, selection: &FilterSelection) -> Result<Vec<Domain>>;

    async fn objectives(&self, selection: &FilterSelection) -> Result<Vec<Objective>>;

    async fn tools(&self, selection: &FilterSelection) -> Result<Vec<ToolSummary>>;
}

pub(crate) async fn fetch(
    source: &dyn FacetSource,
    kind: FacetKind,
    selection: &FilterSelection,
) -> Result<FacetList> {
    Ok(match kind {
        FacetKind::Domain => FacetList::Domains(source.domains(selection).await?),
        FacetKind::Objective => FacetList::Objectives(source.objectives(selection).await?),
        FacetKind::Tool => FacetList::Tools(source.tools(selection).await?),
    })
}

/// Facet source backed by the in-process catalog
pub struct CatalogFacetSource {
    service: Arc<CatalogService>,
}

impl CatalogFacetSource {
    pub fn new(service: Arc<CatalogService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl FacetSource for CatalogFacetSource {
    async fn domains(&self, selection: &FilterSelection) -> Result<Vec<Domain>> {
        self.service.domains_filtered(selection)
    }

    async fn objectives(&self, selection: &FilterSelection) -> Result<Vec<Objective>> {
        self.service.objectives_filtered(selection)
    }

    async fn tools(&self, selection: &FilterSelection) -> Result<Vec<ToolSummary>> {
        self.service.tools_filtered(selection)
    }
}

/// Facet source calling a remote catalog over HTTP
pub struct HttpFacetSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFacetSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        selection: &FilterSelection,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, "Fetching facet options");

        let response = self
            .client
            .get(&url)
            .query(&selection.to_query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Upstream(format!(
                "{} returned {}",
                endpoint, status
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl FacetSource for HttpFacetSource {
    async fn domains(&self, selection: &FilterSelection) -> Result<Vec<Domain>> {
        self.get("domains-filtered", selection).await
    }

    async fn objectives(&self, selection: &FilterSelection) -> Result<Vec<Objective>> {
        self.get("objectives-filtered", selection).await
    }

    async fn tools(&self, selection: &FilterSelection) -> Result<Vec<ToolSummary>> {
        let envelope: ToolsEnvelope = self.get("tools-filtered", selection).await?;
        if !envelope.success {
            return Err(CatalogError::Upstream(
                envelope
                    .error
                    .unwrap_or_else(|| "tools-filtered reported failure".to_string()),
            ));
        }
        Ok(envelope.tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source = HttpFacetSource::with_client(reqwest::Client::new(), "http://localhost:3000/");
        assert_eq!(source.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_tools_envelope_parses() {
        let envelope: ToolsEnvelope = serde_json::from_str(
            r#"{"success":true,"tools":[{"id":"Jira","category":"DevOps"}]}"#,
        )
        .unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.tools[0].id, "Jira");

        let failed: ToolsEnvelope =
            serde_json::from_str(r#"{"success":false,"error":"x","tools":[]}"#).unwrap();
        assert!(!failed.success);
    }
}

//! Debounced, generation-checked facet refresh

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::source::{fetch, FacetSource};
use super::{stale_facets, FacetConfig, FacetFilters, FacetKind, FacetOptions, FacetSnapshot};
use crate::types::{CatalogError, Result};

struct State {
    /// Latest requested filters
    filters: FacetFilters,
    /// Facets waiting for a refetch, accumulated across debounced changes
    pending: BTreeSet<FacetKind>,
}

/// Keeps the three facet option lists consistent with the current filters.
///
/// Every accepted change bumps a generation counter. A debounced refresh
/// only runs if no newer change arrived during the quiet period, and its
/// results are only applied if the generation is still current when they
/// come back. Late results from a superseded refresh are dropped.
pub struct FacetCoordinator {
    source: Arc<dyn FacetSource>,
    /// Unfiltered lists, used when nothing is selected and as fallback
    reference: FacetOptions,
    config: FacetConfig,
    generation: AtomicU64,
    state: Mutex<State>,
    snapshot_tx: watch::Sender<FacetSnapshot>,
}

impl FacetCoordinator {
    pub fn new(source: Arc<dyn FacetSource>, reference: FacetOptions, config: FacetConfig) -> Self {
        let initial = FacetSnapshot {
            options: reference.clone(),
            ..Default::default()
        };
        let (snapshot_tx, _) = watch::channel(initial);

        Self {
            source,
            reference,
            config,
            generation: AtomicU64::new(0),
            state: Mutex::new(State {
                filters: FacetFilters::default(),
                pending: BTreeSet::new(),
            }),
            snapshot_tx,
        }
    }

    /// Build a coordinator whose reference lists are fetched unfiltered
    pub async fn load(source: Arc<dyn FacetSource>, config: FacetConfig) -> Result<Self> {
        let reference = resolve(source.as_ref(), &FacetFilters::default(), None).await?;
        Ok(Self::new(source, reference.options, config))
    }

    pub fn reference(&self) -> &FacetOptions {
        &self.reference
    }

    pub fn snapshot(&self) -> FacetSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FacetSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| CatalogError::Internal(format!("Facet state lock poisoned: {}", e)))
    }

    /// Record new filters and schedule a debounced refresh of stale facets.
    ///
    /// Returns the generation assigned to this change, or `None` when the
    /// filters did not change.
    pub fn update(self: &Arc<Self>, filters: FacetFilters) -> Result<Option<u64>> {
        let Some(generation) = self.accept(filters)? else {
            return Ok(None);
        };

        if self.lock()?.pending.is_empty() {
            return Ok(Some(generation));
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(coordinator.config.debounce).await;
            if coordinator.current_generation() != generation {
                debug!(generation, "Facet refresh superseded during debounce");
                return;
            }
            if let Err(e) = coordinator.run_refresh(generation).await {
                warn!(error = %e, "Facet refresh failed");
            }
        });

        Ok(Some(generation))
    }

    /// Apply new filters and refresh stale facets immediately
    pub async fn refresh(&self, filters: FacetFilters) -> Result<FacetSnapshot> {
        if let Some(generation) = self.accept(filters)? {
            self.run_refresh(generation).await?;
        }
        Ok(self.snapshot())
    }

    /// Store `filters`, bump the generation and mark stale facets as loading.
    ///
    /// With every facet empty the reference lists are published directly
    /// and nothing is left pending.
    fn accept(&self, filters: FacetFilters) -> Result<Option<u64>> {
        let mut state = self.lock()?;

        let stale = stale_facets(&state.filters, &filters);
        if stale.is_empty() && state.filters == filters {
            return Ok(None);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        state.filters = filters;

        if state.filters.is_empty() {
            state.pending.clear();
            let reference = self.reference.clone();
            self.snapshot_tx.send_modify(|snapshot| {
                snapshot.options = reference;
                snapshot.loading.clear();
                snapshot.errors.clear();
                snapshot.generation = generation;
            });
            debug!(generation, "No facet filters active, using reference lists");
            return Ok(Some(generation));
        }

        state.pending.extend(stale);
        let loading = state.pending.clone();
        self.snapshot_tx.send_modify(|snapshot| snapshot.loading = loading);
        Ok(Some(generation))
    }

    /// Fetch every pending facet in parallel and apply the results if
    /// `generation` is still the latest.
    async fn run_refresh(&self, generation: u64) -> Result<()> {
        let (filters, stale) = {
            let state = self.lock()?;
            (state.filters.clone(), state.pending.clone())
        };
        if stale.is_empty() {
            return Ok(());
        }

        debug!(generation, facets = ?stale, "Refreshing facets");

        let source = self.source.as_ref();
        let fetches = stale.iter().map(|&kind| {
            let selection = filters.selection_for(kind);
            async move { (kind, fetch(source, kind, &selection).await) }
        });
        let results = join_all(fetches).await;

        let mut state = self.lock()?;
        if self.current_generation() != generation {
            debug!(generation, "Discarding superseded facet results");
            return Ok(());
        }

        let reference = &self.reference;
        self.snapshot_tx.send_modify(|snapshot| {
            for (kind, result) in results {
                match result {
                    Ok(list) => {
                        snapshot.options.apply(list);
                        snapshot.errors.remove(&kind);
                    }
                    Err(e) => {
                        warn!(facet = ?kind, error = %e, "Facet refresh failed, using full list");
                        snapshot.options.take_from(reference, kind);
                        snapshot.errors.insert(kind, e.public_message());
                    }
                }
                state.pending.remove(&kind);
                snapshot.loading.remove(&kind);
            }
            snapshot.generation = generation;
        });

        Ok(())
    }
}

/// Resolve all three facets for `filters` in one pass.
///
/// Each facet is fetched with every other facet's selection. On failure a
/// facet falls back to its `fallback` list, with the error recorded in the
/// snapshot; without a fallback the error is returned.
pub async fn resolve(
    source: &dyn FacetSource,
    filters: &FacetFilters,
    fallback: Option<&FacetOptions>,
) -> Result<FacetSnapshot> {
    let results = join_all(FacetKind::ALL.into_iter().map(|kind| {
        let selection = filters.selection_for(kind);
        async move { (kind, fetch(source, kind, &selection).await) }
    }))
    .await;

    let mut snapshot = FacetSnapshot::default();
    for (kind, result) in results {
        match (result, fallback) {
            (Ok(list), _) => snapshot.options.apply(list),
            (Err(e), Some(full)) => {
                warn!(facet = ?kind, error = %e, "Facet resolve failed, using full list");
                snapshot.options.take_from(full, kind);
                snapshot.errors.insert(kind, e.public_message());
            }
            (Err(e), None) => return Err(e),
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Domain, Objective, ToolSummary};
    use crate::query::FilterSelection;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Records calls; objectives filter by domain prefix, tools can fail
    #[derive(Default)]
    struct RecordingSource {
        calls: Mutex<Vec<(FacetKind, FilterSelection)>>,
        fail_tools: bool,
        delay: Duration,
    }

    impl RecordingSource {
        fn calls(&self) -> Vec<(FacetKind, FilterSelection)> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_for(&self, kind: FacetKind) -> usize {
            self.calls().iter().filter(|(k, _)| *k == kind).count()
        }

        async fn record(&self, kind: FacetKind, selection: &FilterSelection) {
            self.calls.lock().unwrap().push((kind, selection.clone()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
    }

    fn objective(id: &str) -> Objective {
        Objective {
            id: id.to_string(),
            name: id.to_string(),
            purpose: String::new(),
            domain_code: id[..3].to_string(),
        }
    }

    fn reference() -> FacetOptions {
        FacetOptions {
            domains: vec![
                Domain { code: "APO".into(), name: "Align".into() },
                Domain { code: "BAI".into(), name: "Build".into() },
            ],
            objectives: vec![objective("APO01"), objective("APO02"), objective("BAI01")],
            tools: vec![
                ToolSummary { id: "GitHub".into(), category: "DevOps".into() },
                ToolSummary { id: "Jira".into(), category: "DevOps".into() },
            ],
        }
    }

    #[async_trait]
    impl FacetSource for RecordingSource {
        async fn domains(&self, selection: &FilterSelection) -> Result<Vec<Domain>> {
            self.record(FacetKind::Domain, selection).await;
            Ok(reference().domains[..1].to_vec())
        }

        async fn objectives(&self, selection: &FilterSelection) -> Result<Vec<Objective>> {
            self.record(FacetKind::Objective, selection).await;
            let codes = selection.domain_codes();
            Ok(reference()
                .objectives
                .into_iter()
                .filter(|o| codes.is_empty() || codes.iter().any(|c| o.id.starts_with(c.as_str())))
                .collect())
        }

        async fn tools(&self, selection: &FilterSelection) -> Result<Vec<ToolSummary>> {
            self.record(FacetKind::Tool, selection).await;
            if self.fail_tools {
                return Err(CatalogError::Upstream("connection refused".into()));
            }
            Ok(reference().tools[1..].to_vec())
        }
    }

    fn coordinator(source: Arc<RecordingSource>) -> Arc<FacetCoordinator> {
        Arc::new(FacetCoordinator::new(source, reference(), FacetConfig::default()))
    }

    fn domain_filter(code: &str) -> FacetFilters {
        FacetFilters {
            domain: vec![code.to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_domain_change_refreshes_other_facets_only() {
        let source = Arc::new(RecordingSource::default());
        let coordinator = coordinator(source.clone());

        let snapshot = coordinator.refresh(domain_filter("APO")).await.unwrap();

        assert_eq!(source.calls_for(FacetKind::Domain), 0);
        assert_eq!(source.calls_for(FacetKind::Objective), 1);
        assert_eq!(source.calls_for(FacetKind::Tool), 1);
        assert_eq!(snapshot.options.domains, reference().domains);
        assert_eq!(snapshot.options.objectives.len(), 2);
        assert_eq!(snapshot.options.tools.len(), 1);
        assert!(snapshot.loading.is_empty());
    }

    #[tokio::test]
    async fn test_own_selection_not_sent_for_own_facet() {
        let source = Arc::new(RecordingSource::default());
        let coordinator = coordinator(source.clone());

        coordinator
            .refresh(FacetFilters {
                objective: vec!["APO01".into()],
                tool: vec!["Jira".into()],
                ..Default::default()
            })
            .await
            .unwrap();

        for (kind, selection) in source.calls() {
            match kind {
                FacetKind::Domain => assert_eq!(selection.objectives, vec!["APO01"]),
                FacetKind::Objective => assert!(selection.objectives.is_empty()),
                FacetKind::Tool => assert!(selection.tools.is_empty()),
            }
        }
    }

    #[tokio::test]
    async fn test_no_filters_uses_reference_without_fetching() {
        let source = Arc::new(RecordingSource::default());
        let coordinator = coordinator(source.clone());

        coordinator.refresh(domain_filter("APO")).await.unwrap();
        let calls_before = source.calls().len();

        let snapshot = coordinator.refresh(FacetFilters::default()).await.unwrap();
        assert_eq!(source.calls().len(), calls_before);
        assert_eq!(snapshot.options, reference());
    }

    #[tokio::test]
    async fn test_unchanged_filters_are_ignored() {
        let source = Arc::new(RecordingSource::default());
        let coordinator = coordinator(source.clone());

        coordinator.refresh(domain_filter("APO")).await.unwrap();
        let generation = coordinator.current_generation();
        coordinator.refresh(domain_filter("APO")).await.unwrap();

        assert_eq!(coordinator.current_generation(), generation);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_facet_falls_back_to_full_list() {
        let source = Arc::new(RecordingSource {
            fail_tools: true,
            ..Default::default()
        });
        let coordinator = coordinator(source.clone());

        let snapshot = coordinator.refresh(domain_filter("BAI")).await.unwrap();

        assert_eq!(snapshot.options.tools, reference().tools);
        assert_eq!(
            snapshot.errors.get(&FacetKind::Tool).map(String::as_str),
            Some("Upstream catalog request failed")
        );
        assert_eq!(snapshot.options.objectives, vec![objective("BAI01")]);
        assert!(!snapshot.errors.contains_key(&FacetKind::Objective));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_collapse_into_one_refresh() {
        let source = Arc::new(RecordingSource::default());
        let coordinator = coordinator(source.clone());
        let mut rx = coordinator.subscribe();

        coordinator.update(domain_filter("APO")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        coordinator.update(domain_filter("BAI")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let last = coordinator
            .update(FacetFilters {
                domain: vec!["BAI".into()],
                tool: vec!["Jira".into()],
                ..Default::default()
            })
            .unwrap()
            .unwrap();

        assert!(!rx.borrow_and_update().loading.is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.generation, last);
        assert!(snapshot.loading.is_empty());

        // One fetch per invalidated facet, using the final filters
        assert_eq!(source.calls_for(FacetKind::Domain), 1);
        assert_eq!(source.calls_for(FacetKind::Objective), 1);
        assert_eq!(source.calls_for(FacetKind::Tool), 1);
        let (_, objective_selection) = source
            .calls()
            .into_iter()
            .find(|(k, _)| *k == FacetKind::Objective)
            .unwrap();
        assert_eq!(objective_selection.domains, vec!["BAI"]);
        assert_eq!(snapshot.options.objectives, vec![objective("BAI01")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_results_of_superseded_refresh_are_dropped() {
        let source = Arc::new(RecordingSource {
            delay: Duration::from_millis(500),
            ..Default::default()
        });
        let coordinator = coordinator(source.clone());

        coordinator.update(domain_filter("APO")).unwrap();
        // Debounce elapses, the slow APO fetch is now in flight
        tokio::time::sleep(Duration::from_millis(200)).await;
        let latest = coordinator.update(domain_filter("BAI")).unwrap().unwrap();

        // The APO results arrive first and are dropped
        tokio::time::sleep(Duration::from_millis(500)).await;
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.generation, 0);
        assert_eq!(snapshot.options.objectives, reference().objectives);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.generation, latest);
        assert_eq!(snapshot.options.objectives, vec![objective("BAI01")]);
    }

    #[tokio::test]
    async fn test_resolve_all_facets() {
        let source = RecordingSource::default();
        let snapshot = resolve(&source, &domain_filter("APO"), None).await.unwrap();
        assert_eq!(snapshot.options.objectives.len(), 2);
        assert_eq!(source.calls().len(), 3);

        let failing = RecordingSource {
            fail_tools: true,
            ..Default::default()
        };
        assert!(resolve(&failing, &domain_filter("APO"), None).await.is_err());
        let full = reference();
        let snapshot = resolve(&failing, &domain_filter("APO"), Some(&full)).await.unwrap();
        assert_eq!(snapshot.options.tools, full.tools);
        assert!(snapshot.errors.contains_key(&FacetKind::Tool));
    }
}

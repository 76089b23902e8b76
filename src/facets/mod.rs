//! Facet filter coordination
//!
//! The three facets (domains, objectives, tools) each filter the other two.
//! When one facet's selection changes, only the other two option lists are
//! stale. The [`FacetCoordinator`] tracks which lists are stale, debounces
//! bursts of changes, and refetches the stale lists in parallel through a
//! [`FacetSource`].

pub mod coordinator;
pub mod source;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::{Domain, Objective, ToolSummary};
use crate::query::FilterSelection;

pub use coordinator::{resolve, FacetCoordinator};
pub use source::{CatalogFacetSource, FacetSource, HttpFacetSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Domain,
    Objective,
    Tool,
}

impl FacetKind {
    pub const ALL: [FacetKind; 3] = [FacetKind::Domain, FacetKind::Objective, FacetKind::Tool];

    /// Facets whose options go stale when this facet's selection changes.
    ///
    /// A facet never invalidates itself; its selection is user input.
    pub fn invalidates(self) -> [FacetKind; 2] {
        match self {
            FacetKind::Domain => [FacetKind::Objective, FacetKind::Tool],
            FacetKind::Objective => [FacetKind::Domain, FacetKind::Tool],
            FacetKind::Tool => [FacetKind::Domain, FacetKind::Objective],
        }
    }
}

/// Current selection in each facet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFilters {
    #[serde(default)]
    pub domain: Vec<String>,
    #[serde(default)]
    pub objective: Vec<String>,
    #[serde(default)]
    pub tool: Vec<String>,
}

impl FacetFilters {
    pub fn values(&self, kind: FacetKind) -> &[String] {
        match kind {
            FacetKind::Domain => &self.domain,
            FacetKind::Objective => &self.objective,
            FacetKind::Tool => &self.tool,
        }
    }

    pub fn is_empty(&self) -> bool {
        FacetKind::ALL.iter().all(|k| self.values(*k).is_empty())
    }

    /// Predicates used to fetch `kind`'s options: every other facet's
    /// selection, never its own.
    pub fn selection_for(&self, kind: FacetKind) -> FilterSelection {
        let keep = |k: FacetKind| {
            if k == kind {
                Vec::new()
            } else {
                self.values(k).to_vec()
            }
        };
        FilterSelection {
            domains: keep(FacetKind::Domain),
            objectives: keep(FacetKind::Objective),
            tools: keep(FacetKind::Tool),
            selected_objectives: Vec::new(),
        }
    }

    /// Pull the facet lists out of a full request selection
    pub fn from_selection(selection: &FilterSelection) -> Self {
        Self {
            domain: selection.domains.clone(),
            objective: selection.objectives.clone(),
            tool: selection.tools.clone(),
        }
    }
}

/// Facets made stale by moving from `old` to `new`.
///
/// Selections compare as sets, so reordering alone changes nothing.
pub fn stale_facets(old: &FacetFilters, new: &FacetFilters) -> BTreeSet<FacetKind> {
    let as_set = |values: &[String]| values.iter().cloned().collect::<BTreeSet<_>>();

    FacetKind::ALL
        .into_iter()
        .filter(|kind| as_set(old.values(*kind)) != as_set(new.values(*kind)))
        .flat_map(FacetKind::invalidates)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOptions {
    pub domains: Vec<Domain>,
    pub objectives: Vec<Objective>,
    pub tools: Vec<ToolSummary>,
}

impl FacetOptions {
    pub fn len(&self, kind: FacetKind) -> usize {
        match kind {
            FacetKind::Domain => self.domains.len(),
            FacetKind::Objective => self.objectives.len(),
            FacetKind::Tool => self.tools.len(),
        }
    }

    /// Copy one facet's list from `other`
    pub fn take_from(&mut self, other: &FacetOptions, kind: FacetKind) {
        match kind {
            FacetKind::Domain => self.domains = other.domains.clone(),
            FacetKind::Objective => self.objectives = other.objectives.clone(),
            FacetKind::Tool => self.tools = other.tools.clone(),
        }
    }

    pub(crate) fn apply(&mut self, list: FacetList) {
        match list {
            FacetList::Domains(domains) => self.domains = domains,
            FacetList::Objectives(objectives) => self.objectives = objectives,
            FacetList::Tools(tools) => self.tools = tools,
        }
    }
}

/// One fetched facet list
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FacetList {
    Domains(Vec<Domain>),
    Objectives(Vec<Objective>),
    Tools(Vec<ToolSummary>),
}

/// Published facet state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetSnapshot {
    #[serde(flatten)]
    pub options: FacetOptions,
    /// Facets with a refetch scheduled or in flight
    pub loading: BTreeSet<FacetKind>,
    /// Non-fatal errors for facets that fell back to the full list
    pub errors: BTreeMap<FacetKind, String>,
    /// Generation of the update these options belong to
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct FacetConfig {
    /// Quiet period after the last change before refetching
    pub debounce: Duration,
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(150),
        }
    }
}

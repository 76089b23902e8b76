//! Filter selection and SQL query construction
//!
//! A [`FilterSelection`] is the combined state of the three facets plus any
//! selected objectives with a capability ceiling. [`builder`] turns it into
//! parameterized SQL for each projection of the catalog join.

pub mod builder;

use serde::{Deserialize, Serialize};

pub use builder::{BuiltQuery, Projection, WhereClause};

/// Highest capability level in the catalog
pub const MAX_CAPABILITY_LEVEL: u8 = 5;

/// An objective picked by the user together with the maximum capability
/// level whose activities should be included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SelectedObjective {
    pub code: String,
    pub level: u8,
}

impl SelectedObjective {
    pub fn new(code: impl Into<String>, level: u8) -> Self {
        Self {
            code: code.into(),
            level,
        }
    }

    /// Parse the `CODE:LEVEL` query value.
    ///
    /// Returns `None` for an empty code or a level that is not a number, so
    /// callers can skip the entry.
    pub fn parse(raw: &str) -> Option<Self> {
        let (code, level) = raw.split_once(':')?;
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        let level = level.trim().parse::<u8>().ok()?;
        Some(Self::new(code, level))
    }

    /// Encode back to the `CODE:LEVEL` query value
    pub fn to_query_value(&self) -> String {
        format!("{}:{}", self.code, self.level)
    }
}

/// Extract the domain code from a label like `"APO - Align, Plan and Organise"`.
///
/// A label without the `" - "` separator is used whole.
pub fn domain_code(label: &str) -> &str {
    label
        .split_once(" - ")
        .map(|(code, _)| code)
        .unwrap_or(label)
        .trim()
}

/// Combined filter state across facets.
///
/// Entries in one list are alternatives; non-empty lists all have to match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSelection {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub selected_objectives: Vec<SelectedObjective>,
}

impl FilterSelection {
    /// Build a selection from decoded query-string pairs.
    ///
    /// Repeated `domain`, `objective` and `tool` keys (bare or with a `[]`
    /// suffix) form the facet lists; any key starting with `obj_` carries one
    /// `CODE:LEVEL` pair. Blank values and unparseable pairs are skipped.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut selection = Self::default();
        let mut indexed: Vec<(Option<u32>, SelectedObjective)> = Vec::new();

        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }

            match key.trim_end_matches("[]") {
                "domain" => selection.domains.push(value.to_string()),
                "objective" => selection.objectives.push(value.to_string()),
                "tool" => selection.tools.push(value.to_string()),
                k if k.starts_with("obj_") => {
                    if let Some(selected) = SelectedObjective::parse(value) {
                        let index = k["obj_".len()..].parse::<u32>().ok();
                        indexed.push((index, selected));
                    }
                }
                _ => {}
            }
        }

        // Positional keys first in index order, then anything unnumbered
        indexed.sort_by_key(|(index, _)| index.unwrap_or(u32::MAX));
        selection.selected_objectives = indexed.into_iter().map(|(_, s)| s).collect();
        selection
    }

    /// True when no group would contribute a predicate
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.objectives.is_empty()
            && self.tools.is_empty()
            && self.selected_objectives.is_empty()
    }

    /// Domain codes with any human label stripped
    pub fn domain_codes(&self) -> Vec<String> {
        self.domains
            .iter()
            .map(|d| domain_code(d).to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Query-string pairs that reproduce this selection
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        pairs.extend(self.domains.iter().map(|v| ("domain".to_string(), v.clone())));
        pairs.extend(self.objectives.iter().map(|v| ("objective".to_string(), v.clone())));
        pairs.extend(self.tools.iter().map(|v| ("tool".to_string(), v.clone())));
        pairs.extend(
            self.selected_objectives
                .iter()
                .enumerate()
                .map(|(i, s)| (format!("obj_{}", i), s.to_query_value())),
        );
        pairs
    }

    /// Named value lists used to derive cache keys
    pub fn cache_params(&self) -> Vec<(&'static str, Vec<String>)> {
        vec![
            ("domain", self.domain_codes()),
            ("objective", self.objectives.clone()),
            ("tool", self.tools.clone()),
            (
                "obj",
                self.selected_objectives
                    .iter()
                    .map(SelectedObjective::to_query_value)
                    .collect(),
            ),
        ]
    }
}

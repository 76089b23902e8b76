//! Cache key generation
//!
//! Keys look like:
//!
//! ```text
//! graph:domain=["APO"]&obj=["APO01:2","BAI02:3"]&tool=["GitHub"]
//! ```
//!
//! Parameter names are sorted, each value list is sorted, and empty lists are
//! left out, so the same logical filter always maps to the same key.

use std::fmt;

/// Canonical cache key for one endpoint call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    /// Non-empty parameters, sorted by name with sorted values
    pub params: Vec<(String, Vec<String>)>,
}

impl CacheKey {
    /// Key for an endpoint without parameters
    pub fn endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params: Vec::new(),
        }
    }

    /// Build a key from named value lists in any order
    pub fn generate<I, K>(endpoint: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let mut params: Vec<(String, Vec<String>)> = params
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, mut values)| {
                values.sort();
                (name.into(), values)
            })
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            endpoint: endpoint.to_string(),
            params,
        }
    }

    /// Key for a single-id lookup such as `tool:GitHub`
    pub fn for_id(endpoint: &str, id: &str) -> Self {
        Self::generate(endpoint, [("id", vec![id.to_string()])])
    }

    /// Convert to the string stored in the map
    pub fn to_storage_key(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, values)| {
                let encoded = serde_json::to_string(values).unwrap_or_default();
                format!("{}={}", name, encoded)
            })
            .collect();
        format!("{}:{}", self.endpoint, params.join("&"))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_key())
    }
}

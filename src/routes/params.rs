//! Request parameter extraction

use std::borrow::Cow;

use crate::query::FilterSelection;
use crate::table::{SortDirection, SortField, TableQuery};
use crate::types::{CatalogError, Result};

/// Decoded query-string pairs in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string
    pub fn parse(query: Option<&str>) -> Self {
        let pairs = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self { pairs }
    }

    /// First non-blank value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn selection(&self) -> FilterSelection {
        FilterSelection::from_query_pairs(self.pairs.iter().map(|(k, v)| (k, v)))
    }

    /// Table view options. Unknown sort columns and bad page numbers are ignored.
    pub fn table_query(&self) -> TableQuery {
        let sort = self
            .get("sort")
            .and_then(|s| s.parse::<SortField>().ok())
            .map(|field| {
                let direction = self
                    .get("dir")
                    .and_then(|d| d.parse::<SortDirection>().ok())
                    .unwrap_or(SortDirection::Asc);
                (field, direction)
            });

        TableQuery {
            search: self.get("q").map(str::to_string),
            sort,
            page: self
                .get("page")
                .and_then(|p| p.parse::<usize>().ok())
                .filter(|p| *p > 0),
        }
    }

    /// Table view options as cache key parameters
    pub fn table_cache_params(&self) -> Vec<(&'static str, Vec<String>)> {
        ["q", "sort", "dir", "page"]
            .into_iter()
            .map(|key| (key, self.get(key).map(str::to_string).into_iter().collect()))
            .collect()
    }
}

/// Strip `prefix` and a trailing slash, returning the remaining path segment
pub fn path_param<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix).map(|rest| rest.trim_end_matches('/'))
}

/// Percent-decode one raw path segment
pub fn decode_segment(raw: &str) -> Result<Cow<'_, str>> {
    urlencoding::decode(raw).map_err(|_| {
        CatalogError::InvalidInput(format!("Path segment {} is not valid UTF-8", raw))
    })
}

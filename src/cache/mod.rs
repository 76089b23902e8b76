//! Result cache for catalog queries
//!
//! Memoizes serialized endpoint responses under a canonical key built from
//! the endpoint name and its sorted filter values.
//!
//! ## TTL classes
//!
//! - **Static**: unfiltered reference lists (domains, tools) - 30 minutes
//! - **Graph**: graph materializations - 5 minutes
//! - **Filtered**: facet and table results - 2 minutes
//!
//! Capacity is bounded; when full, the oldest-inserted entry is evicted.

pub mod keys;
pub mod store;

pub use keys::CacheKey;
pub use store::{spawn_cleanup_task, CacheEntry, CacheStats, ResultCache};

use std::time::Duration;

/// TTL class of a cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    Static,
    Graph,
    Filtered,
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// TTL for unfiltered reference data
    pub static_ttl: Duration,
    /// TTL for graph results
    pub graph_ttl: Duration,
    /// TTL for filtered facet and table results
    pub filtered_ttl: Duration,
    /// Interval of the background expiry sweep
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            static_ttl: Duration::from_secs(30 * 60),
            graph_ttl: Duration::from_secs(5 * 60),
            filtered_ttl: Duration::from_secs(2 * 60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Static => self.static_ttl,
            TtlClass::Graph => self.graph_ttl,
            TtlClass::Filtered => self.filtered_ttl,
        }
    }

    /// Check capacity and the static > graph > filtered ordering
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("cache capacity must be at least 1".to_string());
        }
        if !(self.static_ttl > self.graph_ttl && self.graph_ttl > self.filtered_ttl) {
            return Err(format!(
                "cache TTLs must satisfy static ({}s) > graph ({}s) > filtered ({}s)",
                self.static_ttl.as_secs(),
                self.graph_ttl.as_secs(),
                self.filtered_ttl.as_secs()
            ));
        }
        Ok(())
    }
}

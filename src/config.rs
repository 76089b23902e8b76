//! Configuration for the catalog explorer
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::graph::LayoutConfig;
use crate::table::TableProjector;

/// COBIT 2019 catalog explorer - filter, graph and table API
#[derive(Parser, Debug, Clone)]
#[command(name = "cobit-explorer")]
#[command(about = "Read-only API over the COBIT 2019 objective/tool catalog")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// SQLite catalog path (`:memory:` for an in-memory store)
    #[arg(long, env = "DATABASE_PATH", default_value = "cobit.db")]
    pub database_path: PathBuf,

    /// JSON catalog fixture imported when the store is empty
    #[arg(long, env = "SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Cache configuration
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Rows per table page
    #[arg(long, env = "TABLE_PAGE_SIZE", default_value = "10")]
    pub table_page_size: usize,
}

/// Result cache settings
#[derive(Parser, Debug, Clone)]
pub struct CacheArgs {
    /// Maximum number of cached results
    #[arg(long, env = "CACHE_MAX_ENTRIES", default_value = "100")]
    pub cache_max_entries: usize,

    /// TTL for unfiltered reference lists, in seconds
    #[arg(long, env = "CACHE_STATIC_TTL_SECS", default_value = "1800")]
    pub cache_static_ttl_secs: u64,

    /// TTL for graph results, in seconds
    #[arg(long, env = "CACHE_GRAPH_TTL_SECS", default_value = "300")]
    pub cache_graph_ttl_secs: u64,

    /// TTL for filtered facet and table results, in seconds
    #[arg(long, env = "CACHE_FILTERED_TTL_SECS", default_value = "120")]
    pub cache_filtered_ttl_secs: u64,

    /// Interval of the expired-entry sweep, in seconds
    #[arg(long, env = "CACHE_CLEANUP_INTERVAL_SECS", default_value = "60")]
    pub cache_cleanup_interval_secs: u64,
}

impl Args {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache.cache_max_entries,
            static_ttl: Duration::from_secs(self.cache.cache_static_ttl_secs),
            graph_ttl: Duration::from_secs(self.cache.cache_graph_ttl_secs),
            filtered_ttl: Duration::from_secs(self.cache.cache_filtered_ttl_secs),
            cleanup_interval: Duration::from_secs(self.cache.cache_cleanup_interval_secs.max(1)),
        }
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig::default()
    }

    pub fn table_projector(&self) -> TableProjector {
        TableProjector::new(self.table_page_size)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.cache_config().validate()?;
        self.layout_config().validate()?;

        if self.table_page_size == 0 {
            return Err("table page size must be at least 1".to_string());
        }

        if let Some(seed) = &self.seed_file {
            if !seed.exists() {
                return Err(format!("seed file {} does not exist", seed.display()));
            }
        }

        Ok(())
    }
}

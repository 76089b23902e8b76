//! COBIT 2019 catalog explorer

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cobit_explorer::{
    cache,
    config::Args,
    db::{seed, CatalogDb},
    server, Services,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("cobit_explorer={},info", log_level).into()),
    );
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let cache_config = args.cache_config();

    info!("======================================");
    info!("  COBIT 2019 Catalog Explorer");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Database: {}", args.database_path.display());
    info!("Cache: {} entries, TTL static={}s graph={}s filtered={}s",
        cache_config.max_entries,
        cache_config.static_ttl.as_secs(),
        cache_config.graph_ttl.as_secs(),
        cache_config.filtered_ttl.as_secs(),
    );
    info!("Table page size: {}", args.table_page_size);
    info!("======================================");

    let db = Arc::new(CatalogDb::open(&args.database_path)?);
    let stats = db.stats()?;

    if stats.is_empty() {
        match &args.seed_file {
            Some(path) => {
                let fixture = seed::CatalogFixture::from_path(path)?;
                let imported = seed::import(&db, &fixture)?;
                info!(
                    objectives = imported.objectives,
                    activities = imported.activities,
                    tools = imported.tools,
                    "Seeded catalog from {}",
                    path.display()
                );
            }
            None => warn!("Catalog is empty and no seed file was given; every list will be empty"),
        }
    } else {
        info!(
            domains = stats.domains,
            objectives = stats.objectives,
            activities = stats.activities,
            tools = stats.tools,
            "Catalog loaded"
        );
    }

    let services = Arc::new(Services::new(
        db,
        cache_config,
        args.layout_config(),
        args.table_projector(),
    ));
    cache::spawn_cleanup_task(Arc::clone(&services.cache));

    let state = Arc::new(server::AppState::new(args.listen, services));

    tokio::select! {
        result = server::run(state) => {
            if let Err(e) = result {
                error!("Server error: {:?}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

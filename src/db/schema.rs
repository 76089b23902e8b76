//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::types::{CatalogError, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating catalog schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        create_indexes(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(CatalogError::Config(format!(
            "Database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    } else {
        info!("Catalog schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| CatalogError::Database(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .map_err(|e| CatalogError::Database(format!("Failed to read schema_version: {}", e)))?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| CatalogError::Database(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| CatalogError::Database(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CATALOG_SCHEMA)
        .map_err(|e| CatalogError::Database(format!("Failed to create catalog tables: {}", e)))
}

/// Create lookup indexes for the join skeleton and refresh planner statistics
pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(CATALOG_INDEXES)
        .map_err(|e| CatalogError::Database(format!("Failed to create indexes: {}", e)))?;
    conn.execute_batch("ANALYZE;")
        .map_err(|e| CatalogError::Database(format!("Failed to analyze: {}", e)))?;
    Ok(())
}

const CATALOG_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dominio (
    codigo TEXT PRIMARY KEY,
    nombre TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ogg (
    id TEXT PRIMARY KEY,
    nombre TEXT NOT NULL,
    proposito TEXT NOT NULL DEFAULT '',
    dominio_codigo TEXT NOT NULL REFERENCES dominio(codigo)
);

CREATE TABLE IF NOT EXISTS practica (
    practica_id TEXT PRIMARY KEY,
    ogg_id TEXT NOT NULL REFERENCES ogg(id),
    nombre TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS herramienta (
    id TEXT PRIMARY KEY,
    categoria TEXT NOT NULL,
    descripcion TEXT NOT NULL DEFAULT '',
    casos_uso TEXT NOT NULL DEFAULT '[]',
    tipo_herramienta TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS actividad (
    actividad_id TEXT PRIMARY KEY,
    practica_id TEXT NOT NULL REFERENCES practica(practica_id),
    descripcion TEXT NOT NULL,
    nivel_capacidad INTEGER NOT NULL CHECK (nivel_capacidad BETWEEN 1 AND 5),
    herramienta_id TEXT REFERENCES herramienta(id),
    justificacion TEXT NOT NULL DEFAULT '',
    observaciones TEXT,
    integracion TEXT
);
"#;

const CATALOG_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_ogg_dominio ON ogg(dominio_codigo);
CREATE INDEX IF NOT EXISTS idx_practica_ogg ON practica(ogg_id);
CREATE INDEX IF NOT EXISTS idx_actividad_practica ON actividad(practica_id);
CREATE INDEX IF NOT EXISTS idx_actividad_herramienta ON actividad(herramienta_id);
CREATE INDEX IF NOT EXISTS idx_actividad_nivel ON actividad(nivel_capacidad);
CREATE INDEX IF NOT EXISTS idx_herramienta_categoria ON herramienta(categoria);
"#;

//! SQLite catalog store
//!
//! The catalog is read-only at runtime. Tables keep the names of the upstream
//! relational schema so that filter SQL reads the same against either store.
//!
//! ## Tables
//!
//! - `dominio` - domains (codigo, nombre)
//! - `ogg` - objectives, keyed by id with the domain code as a 3-letter prefix
//! - `practica` - practices per objective
//! - `actividad` - activities per practice, with capability level and optional tool
//! - `herramienta` - tools (use cases stored as a JSON array)

pub mod catalog;
pub mod models;
pub mod schema;
pub mod seed;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::types::{CatalogError, Result};

pub use models::*;

/// Path value that selects an in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// SQLite database holding the catalog
pub struct CatalogDb {
    conn: Mutex<Connection>,
}

impl CatalogDb {
    /// Open or create the catalog database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == IN_MEMORY {
            return Self::open_in_memory();
        }

        info!("Opening SQLite catalog at {:?}", path);

        let conn = Connection::open(path)
            .map_err(|e| CatalogError::Unavailable(format!("Failed to open SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| CatalogError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite catalog");

        let conn = Connection::open_in_memory()
            .map_err(|e| CatalogError::Unavailable(format!("Failed to open in-memory SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| CatalogError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.with_conn(schema::init_schema)
    }

    /// Run `f` with shared access to the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run `f` with exclusive access (transactions)
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Connectivity probe used by `/health`
    pub fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| CatalogError::Unavailable(format!("Ping failed: {}", e)))?;
            Ok(())
        })
    }

    /// Row counts per table
    pub fn stats(&self) -> Result<DbStats> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<i64> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                    .map_err(|e| CatalogError::Database(format!("Query failed: {}", e)))
            };

            Ok(DbStats {
                domains: count("dominio")?,
                objectives: count("ogg")?,
                practices: count("practica")?,
                activities: count("actividad")?,
                tools: count("herramienta")?,
            })
        })
    }
}

/// Catalog table sizes
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DbStats {
    pub domains: i64,
    pub objectives: i64,
    pub practices: i64,
    pub activities: i64,
    pub tools: i64,
}

impl DbStats {
    pub fn is_empty(&self) -> bool {
        self.domains == 0 && self.objectives == 0 && self.tools == 0
    }
}

//! Catalog fixture import
//!
//! Loads a JSON document of domains, objectives, practices, tools and
//! activities into an empty store at startup. The HTTP surface never writes.

use std::path::Path;

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::models::{Activity, Domain, Objective, Practice, Tool};
use super::CatalogDb;
use crate::types::{CatalogError, Result};

/// Bundled demo catalog
pub const SAMPLE_CATALOG: &str = include_str!("../../data/sample-catalog.json");

/// Complete catalog document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub practices: Vec<Practice>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl CatalogFixture {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// The bundled demo catalog
    pub fn sample() -> Self {
        // The bundled file is checked by `test_sample_catalog_parses`
        Self::from_json(SAMPLE_CATALOG).unwrap_or_default()
    }
}

/// Rows written by [`import`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub domains: usize,
    pub objectives: usize,
    pub practices: usize,
    pub tools: usize,
    pub activities: usize,
}

fn insert_failed(table: &str, e: rusqlite::Error) -> CatalogError {
    CatalogError::Database(format!("Failed to insert into {}: {}", table, e))
}

/// Import `fixture` in a single transaction
pub fn import(db: &CatalogDb, fixture: &CatalogFixture) -> Result<ImportStats> {
    for activity in &fixture.activities {
        if !(1..=5).contains(&activity.capability_level) {
            return Err(CatalogError::InvalidInput(format!(
                "Activity {} has capability level {} outside 1..5",
                activity.id, activity.capability_level
            )));
        }
    }

    let stats = db.with_conn_mut(|conn| {
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(format!("Failed to begin transaction: {}", e)))?;

        for domain in &fixture.domains {
            tx.execute(
                "INSERT OR REPLACE INTO dominio (codigo, nombre) VALUES (?1, ?2)",
                params![domain.code, domain.name],
            )
            .map_err(|e| insert_failed("dominio", e))?;
        }

        for objective in &fixture.objectives {
            tx.execute(
                "INSERT OR REPLACE INTO ogg (id, nombre, proposito, dominio_codigo) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![objective.id, objective.name, objective.purpose, objective.domain_code],
            )
            .map_err(|e| insert_failed("ogg", e))?;
        }

        for practice in &fixture.practices {
            tx.execute(
                "INSERT OR REPLACE INTO practica (practica_id, ogg_id, nombre) VALUES (?1, ?2, ?3)",
                params![practice.id, practice.objective_id, practice.name],
            )
            .map_err(|e| insert_failed("practica", e))?;
        }

        for tool in &fixture.tools {
            let use_cases = serde_json::to_string(&tool.use_cases)?;
            tx.execute(
                "INSERT OR REPLACE INTO herramienta \
                 (id, categoria, descripcion, casos_uso, tipo_herramienta) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![tool.id, tool.category, tool.description, use_cases, tool.tool_type],
            )
            .map_err(|e| insert_failed("herramienta", e))?;
        }

        for activity in &fixture.activities {
            tx.execute(
                "INSERT OR REPLACE INTO actividad \
                 (actividad_id, practica_id, descripcion, nivel_capacidad, herramienta_id, \
                  justificacion, observaciones, integracion) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    activity.id,
                    activity.practice_id,
                    activity.description,
                    activity.capability_level,
                    activity.tool_id,
                    activity.justification,
                    activity.observations,
                    activity.integration,
                ],
            )
            .map_err(|e| insert_failed("actividad", e))?;
        }

        tx.commit()
            .map_err(|e| CatalogError::Database(format!("Failed to commit import: {}", e)))?;

        Ok(ImportStats {
            domains: fixture.domains.len(),
            objectives: fixture.objectives.len(),
            practices: fixture.practices.len(),
            tools: fixture.tools.len(),
            activities: fixture.activities.len(),
        })
    })?;

    info!(
        domains = stats.domains,
        objectives = stats.objectives,
        practices = stats.practices,
        tools = stats.tools,
        activities = stats.activities,
        "Catalog fixture imported"
    );

    Ok(stats)
}

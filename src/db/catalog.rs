//! Catalog queries
//!
//! Reference lookups (full lists, by id) and execution of the filtered
//! projections produced by [`crate::query::builder`].

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::models::*;
use crate::query::{BuiltQuery, FilterSelection, Projection};
use crate::types::{CatalogError, Result};

fn query_failed(e: rusqlite::Error) -> CatalogError {
    CatalogError::Database(format!("Query failed: {}", e))
}

fn collect<T, F>(conn: &Connection, query: &BuiltQuery, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&query.sql).map_err(query_failed)?;
    let rows = stmt
        .query_map(params_from_iter(query.params.iter()), map)
        .map_err(query_failed)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_failed)?;
    Ok(rows)
}

// ============================================================================
// Row mapping
// ============================================================================

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<Domain> {
    Ok(Domain {
        code: row.get(0)?,
        name: row.get(1)?,
    })
}

fn objective_from_row(row: &Row<'_>) -> rusqlite::Result<Objective> {
    Ok(Objective {
        id: row.get(0)?,
        name: row.get(1)?,
        purpose: row.get(2)?,
        domain_code: row.get(3)?,
    })
}

fn tool_summary_from_row(row: &Row<'_>) -> rusqlite::Result<ToolSummary> {
    Ok(ToolSummary {
        id: row.get(0)?,
        category: row.get(1)?,
    })
}

fn tool_from_row(row: &Row<'_>) -> rusqlite::Result<Tool> {
    let use_cases_json: String = row.get(3)?;
    Ok(Tool {
        id: row.get(0)?,
        category: row.get(1)?,
        description: row.get(2)?,
        use_cases: parse_use_cases(&use_cases_json),
        tool_type: row.get(4)?,
    })
}

/// Use cases are stored as a JSON array; a plain string becomes one entry
fn parse_use_cases(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| vec![trimmed.to_string()])
}

fn graph_row_from_row(row: &Row<'_>) -> rusqlite::Result<GraphRow> {
    Ok(GraphRow {
        objective_id: row.get(0)?,
        objective_name: row.get(1)?,
        tool_id: row.get(2)?,
        tool_category: row.get(3)?,
        tool_description: row.get(4)?,
        tool_type: row.get(5)?,
        activity_count: row.get(6)?,
    })
}

fn table_row_from_row(row: &Row<'_>) -> rusqlite::Result<TableRow> {
    Ok(TableRow {
        objective_id: row.get(0)?,
        objective_name: row.get(1)?,
        practice_id: row.get(2)?,
        practice_name: row.get(3)?,
        activity_id: row.get(4)?,
        activity_description: row.get(5)?,
        capability_level: row.get(6)?,
        tool_id: row.get(7)?,
        tool_name: row.get(8)?,
        tool_category: row.get(9)?,
        justification: row.get(10)?,
        observations: row.get(11)?,
        integration: row.get(12)?,
    })
}

// ============================================================================
// Reference lookups
// ============================================================================

pub fn list_domains(conn: &Connection) -> Result<Vec<Domain>> {
    let query = BuiltQuery {
        sql: "SELECT codigo, nombre FROM dominio ORDER BY codigo".to_string(),
        params: Vec::new(),
    };
    collect(conn, &query, domain_from_row)
}

/// All objectives, or those of one domain code
pub fn list_objectives(conn: &Connection, domain_code: Option<&str>) -> Result<Vec<Objective>> {
    let base = "SELECT id, nombre, proposito, dominio_codigo FROM ogg";
    let query = match domain_code {
        Some(code) => BuiltQuery {
            sql: format!("{} WHERE dominio_codigo = ?1 ORDER BY id", base),
            params: vec![code.to_string().into()],
        },
        None => BuiltQuery {
            sql: format!("{} ORDER BY id", base),
            params: Vec::new(),
        },
    };
    collect(conn, &query, objective_from_row)
}

pub fn get_objective(conn: &Connection, id: &str) -> Result<Option<Objective>> {
    conn.query_row(
        "SELECT id, nombre, proposito, dominio_codigo FROM ogg WHERE id = ?1",
        params![id],
        objective_from_row,
    )
    .optional()
    .map_err(query_failed)
}

pub fn list_tools(conn: &Connection) -> Result<Vec<Tool>> {
    let query = BuiltQuery {
        sql: "SELECT id, categoria, descripcion, casos_uso, tipo_herramienta \
              FROM herramienta ORDER BY id"
            .to_string(),
        params: Vec::new(),
    };
    collect(conn, &query, tool_from_row)
}

pub fn get_tool(conn: &Connection, id: &str) -> Result<Option<Tool>> {
    conn.query_row(
        "SELECT id, categoria, descripcion, casos_uso, tipo_herramienta \
         FROM herramienta WHERE id = ?1",
        params![id],
        tool_from_row,
    )
    .optional()
    .map_err(query_failed)
}

pub fn tool_categories(conn: &Connection) -> Result<Vec<CategoryCount>> {
    let query = BuiltQuery {
        sql: "SELECT categoria, COUNT(*) FROM herramienta GROUP BY categoria ORDER BY categoria"
            .to_string(),
        params: Vec::new(),
    };
    collect(conn, &query, |row| {
        Ok(CategoryCount {
            category: row.get(0)?,
            count: row.get(1)?,
        })
    })
}

pub fn practices_for_objective(conn: &Connection, objective_id: &str) -> Result<Vec<Practice>> {
    let query = BuiltQuery {
        sql: "SELECT practica_id, ogg_id, nombre FROM practica WHERE ogg_id = ?1 ORDER BY practica_id"
            .to_string(),
        params: vec![objective_id.to_string().into()],
    };
    collect(conn, &query, |row| {
        Ok(Practice {
            id: row.get(0)?,
            objective_id: row.get(1)?,
            name: row.get(2)?,
        })
    })
}

pub fn activities_for_practice(conn: &Connection, practice_id: &str) -> Result<Vec<Activity>> {
    let query = BuiltQuery {
        sql: "SELECT actividad_id, practica_id, descripcion, nivel_capacidad, herramienta_id, \
                     justificacion, observaciones, integracion \
              FROM actividad WHERE practica_id = ?1 ORDER BY actividad_id"
            .to_string(),
        params: vec![practice_id.to_string().into()],
    };
    collect(conn, &query, |row| {
        Ok(Activity {
            id: row.get(0)?,
            practice_id: row.get(1)?,
            description: row.get(2)?,
            capability_level: row.get(3)?,
            tool_id: row.get(4)?,
            justification: row.get(5)?,
            observations: row.get(6)?,
            integration: row.get(7)?,
        })
    })
}

// ============================================================================
// Filtered projections
// ============================================================================

pub fn filtered_domains(conn: &Connection, selection: &FilterSelection) -> Result<Vec<Domain>> {
    collect(conn, &Projection::Domains.build(selection), domain_from_row)
}

pub fn filtered_objectives(conn: &Connection, selection: &FilterSelection) -> Result<Vec<Objective>> {
    collect(conn, &Projection::Objectives.build(selection), objective_from_row)
}

pub fn filtered_tools(conn: &Connection, selection: &FilterSelection) -> Result<Vec<ToolSummary>> {
    collect(conn, &Projection::Tools.build(selection), tool_summary_from_row)
}

pub fn graph_rows(conn: &Connection, selection: &FilterSelection) -> Result<Vec<GraphRow>> {
    collect(conn, &Projection::GraphRows.build(selection), graph_row_from_row)
}

pub fn table_rows(conn: &Connection, selection: &FilterSelection) -> Result<Vec<TableRow>> {
    collect(conn, &Projection::TableRows.build(selection), table_row_from_row)
}

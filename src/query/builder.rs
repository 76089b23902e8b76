//! Parameterized SQL for the catalog join
//!
//! Every projection shares one join skeleton:
//!
//! ```text
//! ogg o ─ practica p ─ actividad a ─ herramienta h
//! ```
//!
//! Predicates are collected as OR-groups (one per facet) that are ANDed
//! together. Placeholders are numbered by [`Params::bind`] as values are
//! pushed, so the SQL text and the parameter list cannot drift apart.

use rusqlite::types::Value;

use super::FilterSelection;

/// Positional parameters collected while rendering predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Vec<Value>,
}

impl Params {
    /// Push a value and return its `?N` placeholder
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("?{}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// WHERE clause made of AND-joined OR-groups
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    groups: Vec<String>,
    params: Params,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one OR-group with a term per item.
    ///
    /// An empty `items` slice adds nothing, leaving the group unconstrained.
    pub fn any_of<T, F>(&mut self, items: &[T], mut term: F) -> &mut Self
    where
        F: FnMut(&mut Params, &T) -> String,
    {
        if items.is_empty() {
            return self;
        }

        let terms: Vec<String> = items
            .iter()
            .map(|item| term(&mut self.params, item))
            .collect();
        self.groups.push(format!("({})", terms.join(" OR ")));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Render as `WHERE ...`, or an empty string when unconstrained
    pub fn to_sql(&self) -> String {
        if self.groups.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.groups.join(" AND "))
        }
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        let sql = self.to_sql();
        (sql, self.params.into_values())
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// The views of the catalog join that can be filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    /// Distinct `(codigo, nombre)` domains owning a matching objective
    Domains,
    /// Distinct objectives
    Objectives,
    /// Distinct `(id, categoria)` tools supporting a matching activity
    Tools,
    /// `(objective, tool, activity count)` pairs with at least one activity
    GraphRows,
    /// One row per activity, tool optional
    TableRows,
}

impl Projection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domains => "domains",
            Self::Objectives => "objectives",
            Self::Tools => "tools",
            Self::GraphRows => "graph",
            Self::TableRows => "table",
        }
    }

    /// Build the query for this projection under `selection`
    pub fn build(self, selection: &FilterSelection) -> BuiltQuery {
        let clause = filter_clause(selection);
        let activity_join = if needs_activity_join(selection) {
            ACTIVITY_JOIN
        } else {
            ""
        };
        let (where_sql, params) = clause.into_parts();

        let sql = match self {
            Self::Domains => format!(
                "SELECT DISTINCT d.codigo, d.nombre \
                 FROM dominio d \
                 JOIN ogg o ON substr(o.id, 1, 3) = d.codigo \
                 {activity_join} {where_sql} \
                 ORDER BY d.codigo"
            ),
            Self::Objectives => format!(
                "SELECT DISTINCT o.id, o.nombre, o.proposito, o.dominio_codigo \
                 FROM ogg o \
                 {activity_join} {where_sql} \
                 ORDER BY o.id"
            ),
            Self::Tools if selection.is_empty() => {
                "SELECT h.id, h.categoria FROM herramienta h ORDER BY h.id".to_string()
            }
            Self::Tools => format!(
                "SELECT DISTINCT h.id, h.categoria \
                 FROM ogg o {ACTIVITY_JOIN} \
                 JOIN herramienta h ON h.id = a.herramienta_id \
                 {where_sql} \
                 ORDER BY h.id"
            ),
            Self::GraphRows => format!(
                "SELECT o.id, o.nombre, h.id, h.categoria, h.descripcion, h.tipo_herramienta, \
                        COUNT(a.actividad_id) AS activity_count \
                 FROM ogg o {ACTIVITY_JOIN} \
                 JOIN herramienta h ON h.id = a.herramienta_id \
                 {where_sql} \
                 GROUP BY o.id, o.nombre, h.id, h.categoria, h.descripcion, h.tipo_herramienta \
                 HAVING COUNT(a.actividad_id) > 0 \
                 ORDER BY o.id, activity_count DESC, h.id"
            ),
            Self::TableRows => format!(
                "SELECT o.id, o.nombre, p.practica_id, p.nombre, a.actividad_id, a.descripcion, \
                        a.nivel_capacidad, a.herramienta_id, h.id, h.categoria, \
                        a.justificacion, a.observaciones, a.integracion \
                 FROM ogg o {ACTIVITY_JOIN} \
                 LEFT JOIN herramienta h ON h.id = a.herramienta_id \
                 {where_sql} \
                 ORDER BY o.id, p.practica_id, a.actividad_id"
            ),
        };

        BuiltQuery {
            sql: collapse_whitespace(&sql),
            params,
        }
    }
}

const ACTIVITY_JOIN: &str = "JOIN practica p ON p.ogg_id = o.id \
                             JOIN actividad a ON a.practica_id = p.practica_id";

/// Tool and capability predicates reference `actividad`
fn needs_activity_join(selection: &FilterSelection) -> bool {
    !selection.tools.is_empty() || !selection.selected_objectives.is_empty()
}

/// Build the facet predicates for `selection`.
///
/// Domain codes match as an id prefix, objectives and tools by exact id, and
/// each selected objective as `id = code AND level <= ceiling`. The plain
/// objective list and the selected objectives are separate groups, so when
/// both are present a row has to satisfy each of them.
pub fn filter_clause(selection: &FilterSelection) -> WhereClause {
    let mut clause = WhereClause::new();

    clause
        .any_of(&selection.domain_codes(), |params, code| {
            let code = params.bind(code.clone());
            format!("substr(o.id, 1, length({code})) = {code}")
        })
        .any_of(&selection.objectives, |params, id| {
            format!("o.id = {}", params.bind(id.clone()))
        })
        .any_of(&selection.tools, |params, id| {
            format!("a.herramienta_id = {}", params.bind(id.clone()))
        })
        .any_of(&selection.selected_objectives, |params, selected| {
            let id = params.bind(selected.code.clone());
            let level = params.bind(i64::from(selected.level));
            format!("(o.id = {} AND a.nivel_capacidad <= {})", id, level)
        });

    clause
}

fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

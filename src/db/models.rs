//! Catalog row types
//!
//! These are the shapes returned to HTTP clients, so field names are the
//! camelCase wire names.

use serde::{Deserialize, Serialize};

/// Top-level governance domain (e.g. `APO`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub code: String,
    pub name: String,
}

/// Governance or management objective (e.g. `APO01`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    pub name: String,
    pub purpose: String,
    pub domain_code: String,
}

/// Practice under an objective (e.g. `APO01-P01`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Practice {
    pub id: String,
    pub objective_id: String,
    pub name: String,
}

/// Activity under a practice, optionally supported by one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub practice_id: String,
    pub description: String,
    pub capability_level: u8,
    #[serde(default)]
    pub tool_id: Option<String>,
    #[serde(default)]
    pub justification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<String>,
}

/// IT tool with its full descriptive fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub tool_type: String,
}

impl Tool {
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            id: self.id.clone(),
            category: self.category.clone(),
        }
    }
}

/// Tool option as listed by the tool facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub id: String,
    pub category: String,
}

/// Number of tools per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// One pre-aggregated objective/tool pair from the graph projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRow {
    pub objective_id: String,
    pub objective_name: String,
    pub tool_id: String,
    pub tool_category: String,
    pub tool_description: String,
    pub tool_type: String,
    pub activity_count: i64,
}

/// One flattened objective/practice/activity(/tool) row from the table projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub objective_id: String,
    pub objective_name: String,
    pub practice_id: String,
    pub practice_name: String,
    pub activity_id: String,
    pub activity_description: String,
    pub capability_level: u8,
    pub tool_id: Option<String>,
    pub tool_name: Option<String>,
    pub tool_category: Option<String>,
    pub justification: Option<String>,
    pub observations: Option<String>,
    pub integration: Option<String>,
}

/// Body of `/tools-filtered`, which reports failure in-band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsEnvelope {
    pub success: bool,
    #[serde(default)]
    pub tools: Vec<ToolSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolsEnvelope {
    pub fn ok(tools: Vec<ToolSummary>) -> Self {
        Self {
            success: true,
            tools,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tools: Vec::new(),
            error: Some(error.into()),
        }
    }
}

//! Graph materialization
//!
//! Turns pre-aggregated `(objective, tool, activity count)` rows into a
//! deduplicated node list and one link per row. Nodes carry catalog data
//! only; render sizes and collision radii come from [`layout`].

pub mod layout;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::GraphRow;

pub use layout::{GraphLayout, LayoutConfig, NodeLayout};

/// Length of the domain prefix of an objective id
const DOMAIN_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Objective,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
}

/// Objective-to-tool edge weighted by the number of supporting activities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, kind: NodeKind, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.kind == kind && n.id == id)
    }

    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }
}

fn objective_domain(objective_id: &str) -> String {
    objective_id.chars().take(DOMAIN_PREFIX_LEN).collect()
}

/// Build the graph from rows in a single pass.
///
/// Each node is emitted the first time its `(kind, id)` is seen. Rows are
/// already grouped per objective/tool pair, so every row becomes one link.
pub fn materialize(rows: &[GraphRow]) -> GraphData {
    let mut seen: HashSet<(NodeKind, &str)> = HashSet::new();
    let mut graph = GraphData {
        nodes: Vec::new(),
        links: Vec::with_capacity(rows.len()),
    };

    for row in rows {
        if seen.insert((NodeKind::Objective, row.objective_id.as_str())) {
            graph.nodes.push(GraphNode {
                id: row.objective_id.clone(),
                name: row.objective_name.clone(),
                kind: NodeKind::Objective,
                domain: Some(objective_domain(&row.objective_id)),
                category: None,
                description: None,
                tool_type: None,
            });
        }

        if seen.insert((NodeKind::Tool, row.tool_id.as_str())) {
            graph.nodes.push(GraphNode {
                id: row.tool_id.clone(),
                name: row.tool_id.clone(),
                kind: NodeKind::Tool,
                domain: None,
                category: Some(row.tool_category.clone()),
                description: Some(row.tool_description.clone()),
                tool_type: Some(row.tool_type.clone()),
            });
        }

        graph.links.push(GraphLink {
            source: row.objective_id.clone(),
            target: row.tool_id.clone(),
            count: row.activity_count,
        });
    }

    graph
}

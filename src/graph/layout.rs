//! Layout inputs for the force-directed renderer
//!
//! Tool nodes are sized by connectivity between a base and a maximum size.
//! Objective nodes use one fixed size. Each node's collision radius is its
//! size plus a fixed padding. Positions and velocities belong to the
//! renderer and never appear here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{GraphData, NodeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub objective_size: f64,
    pub tool_base_size: f64,
    pub tool_max_size: f64,
    pub collision_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            objective_size: 20.0,
            tool_base_size: 20.0,
            tool_max_size: 35.0,
            collision_padding: 5.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tool_base_size <= 0.0 || self.objective_size <= 0.0 {
            return Err("node sizes must be positive".to_string());
        }
        if self.tool_max_size < self.tool_base_size {
            return Err("tool max size must not be below the base size".to_string());
        }
        if self.collision_padding < 0.0 {
            return Err("collision padding must not be negative".to_string());
        }
        Ok(())
    }

    /// Size of a tool with `connections` links when the busiest tool has
    /// `max_connections`.
    ///
    /// Linear in the ratio and clamped to `[tool_base_size, tool_max_size]`;
    /// a graph without connections maps everything to the base size.
    pub fn tool_size(&self, connections: usize, max_connections: usize) -> f64 {
        if max_connections == 0 {
            return self.tool_base_size;
        }
        let ratio = connections as f64 / max_connections as f64;
        let size = self.tool_base_size + (self.tool_max_size - self.tool_base_size) * ratio;
        size.clamp(self.tool_base_size, self.tool_max_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLayout {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub connections: usize,
    pub size: f64,
    pub radius: f64,
}

/// Per-node layout inputs, in the same order as `GraphData::nodes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphLayout {
    pub nodes: Vec<NodeLayout>,
}

impl GraphLayout {
    pub fn get(&self, kind: NodeKind, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|n| n.kind == kind && n.id == id)
    }
}

/// Number of links ending at each tool node
pub fn tool_connectivity(graph: &GraphData) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = graph
        .nodes_of(NodeKind::Tool)
        .map(|n| (n.id.as_str(), 0))
        .collect();

    for link in &graph.links {
        if let Some(count) = counts.get_mut(link.target.as_str()) {
            *count += 1;
        }
    }
    counts
}

pub fn compute(graph: &GraphData, config: &LayoutConfig) -> GraphLayout {
    let connectivity = tool_connectivity(graph);
    let max_connections = connectivity.values().copied().max().unwrap_or(0);

    let nodes = graph
        .nodes
        .iter()
        .map(|node| {
            let (connections, size) = match node.kind {
                NodeKind::Objective => (0, config.objective_size),
                NodeKind::Tool => {
                    let connections = connectivity.get(node.id.as_str()).copied().unwrap_or(0);
                    (connections, config.tool_size(connections, max_connections))
                }
            };
            NodeLayout {
                id: node.id.clone(),
                kind: node.kind,
                connections,
                size,
                radius: size + config.collision_padding,
            }
        })
        .collect();

    GraphLayout { nodes }
}

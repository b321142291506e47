// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::ScenarioConfig;

/// Newtype wrapper for a causal DAG, mapping every node to its children.
///
/// Nodes keep their declaration order; nodes that only ever appear as a child are
/// appended in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    nodes: Vec<String>,
    children: HashMap<String, Vec<String>>,
}

impl CausalGraph {
    /// Build the graph from a scenario configuration
    pub fn from_config(cfg: &ScenarioConfig) -> Self {
        let mut graph = Self::default();
        for decl in &cfg.dag {
            graph.touch(&decl.node);
            for child in &decl.children {
                graph.touch(child);
            }
            graph
                .children
                .entry(decl.node.clone())
                .or_default()
                .extend(decl.children.iter().cloned());
        }
        graph
    }

    fn touch(&mut self, node: &str) {
        if !self.children.contains_key(node) {
            self.nodes.push(node.to_string());
            self.children.insert(node.to_string(), Vec::new());
        }
    }

    /// All nodes in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.children.contains_key(node)
    }

    /// Children of a node, empty for unknown nodes
    pub fn children(&self, node: &str) -> &[String] {
        self.children.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build the reverse mapping (node -> parents)
    pub fn build_parents(&self) -> HashMap<String, Vec<String>> {
        let mut parents: HashMap<String, Vec<String>> =
            self.nodes.iter().map(|n| (n.clone(), Vec::new())).collect();
        for node in &self.nodes {
            for child in self.children(node) {
                parents.entry(child.clone()).or_default().push(node.clone());
            }
        }
        parents
    }

    /// Latent sources: roots with at least one child that are not named as parties.
    pub fn latent_sources(&self, order: &[String]) -> Vec<String> {
        let parents = self.build_parents();
        let named: HashSet<&String> = order.iter().collect();
        self.nodes
            .iter()
            .filter(|n| {
                !named.contains(n)
                    && !self.children(n).is_empty()
                    && parents.get(*n).map_or(true, Vec::is_empty)
            })
            .cloned()
            .collect()
    }

    /// Observed nodes ordered by topological level, alphabetically within a level.
    pub fn observed(&self, latent: &[String]) -> Vec<String> {
        let latent: HashSet<&String> = latent.iter().collect();
        self.topological_levels()
            .into_iter()
            .flat_map(|mut level| {
                level.sort();
                level
            })
            .filter(|n| !latent.contains(n))
            .collect()
    }

    /// Compute topological levels with Kahn's algorithm.
    ///
    /// Level 0 holds the roots, level N the nodes whose parents all sit in levels
    /// 0..N-1. Nodes on a cycle never reach in-degree zero and are left out; cycles
    /// are reported by validation before this is used.
    pub fn topological_levels(&self) -> Vec<Vec<String>> {
        let parents = self.build_parents();
        let mut in_degree: HashMap<&str, usize> = parents
            .iter()
            .map(|(node, ps)| (node.as_str(), ps.len()))
            .collect();

        let mut levels = Vec::new();
        let mut queue: VecDeque<String> = self
            .nodes
            .iter()
            .filter(|n| in_degree.get(n.as_str()).copied().unwrap_or(0) == 0)
            .cloned()
            .collect();

        while !queue.is_empty() {
            let current_level: Vec<String> = queue.drain(..).collect();
            let mut next_level = Vec::new();
            for node in &current_level {
                for child in self.children(node) {
                    if let Some(degree) = in_degree.get_mut(child.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next_level.push(child.clone());
                        }
                    }
                }
            }
            levels.push(current_level);
            queue.extend(next_level);
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DagNode;

    fn triangle() -> ScenarioConfig {
        ScenarioConfig {
            dag: vec![
                DagNode::new("rho_AB", &["A", "B"]),
                DagNode::new("rho_BC", &["B", "C"]),
                DagNode::new("rho_AC", &["A", "C"]),
            ],
            order: vec![],
            outcomes_per_party: vec![2, 2, 2],
            settings_per_party: vec![1, 1, 1],
            inflation_level_per_source: vec![],
        }
    }

    #[test]
    fn test_latent_sources_keep_declaration_order() {
        let graph = CausalGraph::from_config(&triangle());
        assert_eq!(graph.latent_sources(&[]), vec!["rho_AB", "rho_BC", "rho_AC"]);
    }

    #[test]
    fn test_observed_nodes_sorted_within_level() {
        let graph = CausalGraph::from_config(&triangle());
        let latent = graph.latent_sources(&[]);
        assert_eq!(graph.observed(&latent), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_topological_levels() {
        let graph = CausalGraph::from_config(&triangle());
        let levels = graph.topological_levels();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].len(), 3);
        assert_eq!(levels[1].len(), 3);
    }

    #[test]
    fn test_named_root_is_observed() {
        let mut cfg = triangle();
        cfg.dag.push(DagNode::new("X", &["A"]));
        cfg.order = vec!["X".into(), "A".into(), "B".into(), "C".into()];
        let graph = CausalGraph::from_config(&cfg);
        assert!(!graph.latent_sources(&cfg.order).contains(&"X".to_string()));
    }
}

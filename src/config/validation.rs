// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validation of causal scenarios.
//!
//! A scenario is only usable for inflation when its DAG is a *network*: latent sources
//! at the roots feeding observed parties, with no observed variable feeding another.
//! The checks run in a fixed order so that later checks can rely on a well-formed
//! graph:
//!
//! 1. **Uniqueness**: every DAG node is declared once, every party listed once in `order`
//! 2. **Reference Validation**: parties in `order` exist, and every observed node is ordered
//! 3. **Cycle Detection**: DFS with a recursion stack, reporting the cycle path
//! 4. **Network Structure**: no observed→observed edges
//! 5. **Cardinalities**: per-party and per-source vectors have the right length and no zeros
//!
//! Errors are accumulated so a user sees every problem at once. Cycle detection is
//! skipped when references are broken, and the structural check is skipped when a
//! cycle was found.
//!
//! # Example
//! ```rust
//! use inflation_sdp::config::{validate_scenario, DagNode, ScenarioConfig};
//! use inflation_sdp::errors::ValidationError;
//!
//! let scenario = ScenarioConfig {
//!     dag: vec![DagNode::new("rho", &["A", "B"])],
//!     order: vec![],
//!     outcomes_per_party: vec![2, 2, 2],
//!     settings_per_party: vec![2, 2],
//!     inflation_level_per_source: vec![],
//! };
//!
//! let errors = validate_scenario(&scenario).unwrap_err();
//! assert!(matches!(
//!     errors[0],
//!     ValidationError::CardinalityMismatch { expected: 2, found: 3, .. }
//! ));
//! ```

use std::collections::{HashMap, HashSet};

use crate::config::{CausalGraph, ScenarioConfig};
use crate::errors::ValidationError;
use crate::observability::messages::validation::{
    CyclicDependencyDetected, ObservedEdgeRejected,
};
use crate::observability::messages::StructuredLog;

/// Validates a scenario for use in an inflation relaxation.
///
/// # Returns
///
/// * `Ok(())` - the DAG is a valid network and every cardinality is consistent
/// * `Err(Vec<ValidationError>)` - every problem that was found
pub fn validate_scenario(scenario: &ScenarioConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let graph = CausalGraph::from_config(scenario);

    if let Err(duplicate_errors) = validate_unique_nodes(scenario) {
        errors.extend(duplicate_errors);
    }

    if let Err(reference_errors) = validate_party_references(scenario, &graph) {
        errors.extend(reference_errors);
    }

    if errors.is_empty() {
        if let Err(cycle_errors) = validate_acyclic_graph(&graph) {
            errors.extend(cycle_errors);
        } else if let Err(edge_errors) = validate_network_structure(scenario, &graph) {
            errors.extend(edge_errors);
        }
    }

    if errors.is_empty() {
        if let Err(cardinality_errors) = validate_cardinalities(scenario, &graph) {
            errors.extend(cardinality_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Resolve the latent sources and the ordered observed parties of a scenario
pub fn resolve_roles(scenario: &ScenarioConfig, graph: &CausalGraph) -> (Vec<String>, Vec<String>) {
    let latent = graph.latent_sources(&scenario.order);
    let observed = if scenario.order.is_empty() {
        graph.observed(&latent)
    } else {
        scenario.order.clone()
    };
    (latent, observed)
}

fn validate_unique_nodes(scenario: &ScenarioConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for decl in &scenario.dag {
        if !seen.insert(&decl.node) {
            errors.push(ValidationError::DuplicateNode {
                node: decl.node.clone(),
            });
        }
    }

    let mut seen_parties = HashSet::new();
    for party in &scenario.order {
        if !seen_parties.insert(party) {
            errors.push(ValidationError::DuplicateNode {
                node: party.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every party named in `order` must exist, and every observed node must be named.
fn validate_party_references(
    scenario: &ScenarioConfig,
    graph: &CausalGraph,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for party in &scenario.order {
        if !graph.contains(party) {
            errors.push(ValidationError::UnresolvedParty {
                party: party.clone(),
            });
        }
    }

    if !scenario.order.is_empty() {
        let latent: HashSet<String> = graph.latent_sources(&scenario.order).into_iter().collect();
        let ordered: HashSet<&String> = scenario.order.iter().collect();
        for node in graph.nodes() {
            if !latent.contains(node) && !ordered.contains(node) {
                errors.push(ValidationError::UnorderedParty {
                    party: node.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_acyclic_graph(graph: &CausalGraph) -> Result<(), Vec<ValidationError>> {
    let adjacency: HashMap<&str, Vec<&str>> = graph
        .nodes()
        .map(|n| {
            (
                n.as_str(),
                graph.children(n).iter().map(String::as_str).collect(),
            )
        })
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for node in graph.nodes() {
        if !visited.contains(node.as_str()) {
            if let Some(cycle) =
                dfs_cycle_detection(node, &adjacency, &mut visited, &mut rec_stack, &mut path)
            {
                let cycle_refs: Vec<&str> = cycle.iter().map(String::as_str).collect();
                CyclicDependencyDetected { cycle: &cycle_refs }.log();
                return Err(vec![ValidationError::CyclicDependency { cycle }]);
            }
        }
    }

    Ok(())
}

/// Depth-first search with an explicit recursion stack.
///
/// Nodes on the current path are "gray"; reaching a gray node closes a cycle, which
/// is returned as the path segment from that node plus the back edge.
fn dfs_cycle_detection<'g>(
    node: &'g str,
    graph: &HashMap<&'g str, Vec<&'g str>>,
    visited: &mut HashSet<&'g str>,
    rec_stack: &mut HashSet<&'g str>,
    path: &mut Vec<&'g str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let cycle_start = path.iter().position(|x| *x == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[cycle_start..].iter().map(|s| s.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

/// Only latent sources may have children.
fn validate_network_structure(
    scenario: &ScenarioConfig,
    graph: &CausalGraph,
) -> Result<(), Vec<ValidationError>> {
    let latent: HashSet<String> = graph.latent_sources(&scenario.order).into_iter().collect();
    let mut errors = Vec::new();

    for node in graph.nodes() {
        if latent.contains(node) {
            continue;
        }
        for child in graph.children(node) {
            ObservedEdgeRejected { from: node, to: child }.log();
            errors.push(ValidationError::ObservedEdge {
                from: node.clone(),
                to: child.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_cardinalities(
    scenario: &ScenarioConfig,
    graph: &CausalGraph,
) -> Result<(), Vec<ValidationError>> {
    let (latent, observed) = resolve_roles(scenario, graph);
    let mut errors = Vec::new();

    if observed.is_empty() {
        return Err(vec![ValidationError::EmptyScenario]);
    }

    let mut check = |field: &str, values: &[usize], expected: usize| {
        if values.len() != expected {
            errors.push(ValidationError::CardinalityMismatch {
                field: field.to_string(),
                expected,
                found: values.len(),
            });
        }
        for (index, value) in values.iter().enumerate() {
            if *value == 0 {
                errors.push(ValidationError::ZeroCardinality {
                    field: field.to_string(),
                    index,
                });
            }
        }
    };

    check("outcomes_per_party", &scenario.outcomes_per_party, observed.len());
    check("settings_per_party", &scenario.settings_per_party, observed.len());
    if !scenario.inflation_level_per_source.is_empty() {
        check(
            "inflation_level_per_source",
            &scenario.inflation_level_per_source,
            latent.len(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DagNode;

    fn create_test_scenario(dag: Vec<DagNode>, order: Vec<&str>, parties: usize) -> ScenarioConfig {
        ScenarioConfig {
            dag,
            order: order.into_iter().map(String::from).collect(),
            outcomes_per_party: vec![2; parties],
            settings_per_party: vec![1; parties],
            inflation_level_per_source: vec![],
        }
    }

    #[test]
    fn test_valid_bipartite_scenario() {
        let scenario = create_test_scenario(vec![DagNode::new("rho", &["A", "B"])], vec![], 2);
        assert!(validate_scenario(&scenario).is_ok());
    }

    #[test]
    fn test_valid_triangle_with_order() {
        let scenario = create_test_scenario(
            vec![
                DagNode::new("lambda", &["A", "B"]),
                DagNode::new("mu", &["B", "C"]),
                DagNode::new("sigma", &["A", "C"]),
            ],
            vec!["A", "B", "C"],
            3,
        );
        assert!(validate_scenario(&scenario).is_ok());
    }

    #[test]
    fn test_duplicate_nodes() {
        let scenario = create_test_scenario(
            vec![
                DagNode::new("rho", &["A"]),
                DagNode::new("rho", &["B"]),
            ],
            vec![],
            2,
        );
        let errors = validate_scenario(&scenario).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::DuplicateNode { .. }));
    }

    #[test]
    fn test_unresolved_party() {
        let scenario =
            create_test_scenario(vec![DagNode::new("rho", &["A", "B"])], vec!["A", "B", "Z"], 3);
        let errors = validate_scenario(&scenario).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnresolvedParty { party } if party == "Z")));
    }

    #[test]
    fn test_unordered_party() {
        let scenario = create_test_scenario(vec![DagNode::new("rho", &["A", "B"])], vec!["A"], 1);
        let errors = validate_scenario(&scenario).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::UnorderedParty { party } if party == "B"
        ));
    }

    #[test]
    fn test_simple_cycle() {
        let scenario = create_test_scenario(
            vec![DagNode::new("A", &["B"]), DagNode::new("B", &["A"])],
            vec!["A", "B"],
            2,
        );
        let errors = validate_scenario(&scenario).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ValidationError::CyclicDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_self_loop_cycle() {
        let scenario = create_test_scenario(vec![DagNode::new("A", &["A"])], vec!["A"], 1);
        let errors = validate_scenario(&scenario).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::CyclicDependency { cycle } if cycle == &vec!["A".to_string(), "A".to_string()]
        ));
    }

    #[test]
    fn test_observed_edge_rejected() {
        let scenario = create_test_scenario(
            vec![DagNode::new("rho", &["A", "B"]), DagNode::new("A", &["B"])],
            vec!["A", "B"],
            2,
        );
        let errors = validate_scenario(&scenario).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ObservedEdge {
                from: "A".into(),
                to: "B".into()
            }]
        );
    }

    #[test]
    fn test_cardinality_mismatch_and_zero() {
        let mut scenario =
            create_test_scenario(vec![DagNode::new("rho", &["A", "B"])], vec![], 2);
        scenario.settings_per_party = vec![1, 0];
        scenario.inflation_level_per_source = vec![2, 2];
        let errors = validate_scenario(&scenario).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::ZeroCardinality {
            field: "settings_per_party".into(),
            index: 1
        }));
        assert!(errors.contains(&ValidationError::CardinalityMismatch {
            field: "inflation_level_per_source".into(),
            expected: 1,
            found: 2
        }));
    }

    #[test]
    fn test_resolve_roles_without_order() {
        let scenario = create_test_scenario(
            vec![DagNode::new("h2", &["C", "B"]), DagNode::new("h1", &["A", "B"])],
            vec![],
            3,
        );
        let graph = CausalGraph::from_config(&scenario);
        let (latent, observed) = resolve_roles(&scenario, &graph);
        assert_eq!(latent, vec!["h2", "h1"]);
        assert_eq!(observed, vec!["A", "B", "C"]);
    }
}

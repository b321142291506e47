// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::fmt;

use crate::algebra::Operator;
use crate::config::{resolve_roles, validate_scenario, CausalGraph, DagNode, ScenarioConfig};
use crate::errors::{ConfigError, RelaxationError};

/// A validated causal network together with the inflation applied to it.
///
/// Parties are indexed in `names` order and sources in declaration order.
/// `hypergraph[s][p]` records whether source `s` feeds party `p`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InflationProblem {
    names: Vec<String>,
    sources: Vec<String>,
    hypergraph: Vec<Vec<bool>>,
    outcomes_per_party: Vec<usize>,
    settings_per_party: Vec<usize>,
    inflation_level_per_source: Vec<usize>,
}

/// Measurement operators indexed `[party][copy][setting][outcome]`
pub type Measurements = Vec<Vec<Vec<Vec<Operator>>>>;

impl InflationProblem {
    /// Validate a scenario configuration and resolve its parties and sources
    pub fn from_config(cfg: &ScenarioConfig) -> Result<Self, ConfigError> {
        validate_scenario(cfg).map_err(ConfigError::Validation)?;

        let graph = CausalGraph::from_config(cfg);
        let (sources, names) = resolve_roles(cfg, &graph);
        let hypergraph = sources
            .iter()
            .map(|source| {
                let children = graph.children(source);
                names.iter().map(|party| children.contains(party)).collect()
            })
            .collect();
        let inflation_level_per_source = if cfg.inflation_level_per_source.is_empty() {
            vec![1; sources.len()]
        } else {
            cfg.inflation_level_per_source.clone()
        };

        Ok(Self {
            names,
            sources,
            hypergraph,
            outcomes_per_party: cfg.outcomes_per_party.clone(),
            settings_per_party: cfg.settings_per_party.clone(),
            inflation_level_per_source,
        })
    }

    /// Convenience constructor from `(source, children)` pairs
    pub fn new(
        dag: &[(&str, &[&str])],
        order: &[&str],
        outcomes_per_party: &[usize],
        settings_per_party: &[usize],
        inflation_level_per_source: &[usize],
    ) -> Result<Self, ConfigError> {
        Self::from_config(&ScenarioConfig {
            dag: dag
                .iter()
                .map(|(node, children)| DagNode::new(node, children))
                .collect(),
            order: order.iter().map(|s| s.to_string()).collect(),
            outcomes_per_party: outcomes_per_party.to_vec(),
            settings_per_party: settings_per_party.to_vec(),
            inflation_level_per_source: inflation_level_per_source.to_vec(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn nr_parties(&self) -> usize {
        self.names.len()
    }

    pub fn nr_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn hypergraph(&self) -> &[Vec<bool>] {
        &self.hypergraph
    }

    pub fn outcomes_per_party(&self) -> &[usize] {
        &self.outcomes_per_party
    }

    pub fn settings_per_party(&self) -> &[usize] {
        &self.settings_per_party
    }

    pub fn inflation_level_per_source(&self) -> &[usize] {
        &self.inflation_level_per_source
    }

    /// Sources feeding a party, in source order
    pub fn sources_of_party(&self, party: usize) -> Vec<usize> {
        (0..self.nr_sources())
            .filter(|&s| self.hypergraph[s][party])
            .collect()
    }

    /// All copy-index vectors of a party; the last feeding source varies fastest.
    pub fn copy_indices(&self, party: usize) -> Vec<Vec<usize>> {
        let mut tuples = vec![vec![0; self.nr_sources()]];
        for source in self.sources_of_party(party) {
            let level = self.inflation_level_per_source[source];
            tuples = tuples
                .into_iter()
                .flat_map(|tuple| {
                    (1..=level).map(move |copy| {
                        let mut next = tuple.clone();
                        next[source] = copy;
                        next
                    })
                })
                .collect();
        }
        tuples
    }

    /// The measurement tensor `[party][copy][setting][outcome]` in Collins–Gisin form
    pub fn measurements(&self) -> Measurements {
        (0..self.nr_parties())
            .map(|party| {
                let outcomes = self.outcomes_per_party[party].saturating_sub(1);
                self.copy_indices(party)
                    .into_iter()
                    .map(|copies| {
                        (0..self.settings_per_party[party])
                            .map(|setting| {
                                (0..outcomes)
                                    .map(|outcome| {
                                        Operator::new(party, copies.clone(), setting, outcome)
                                    })
                                    .collect()
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }

    /// `<party>_<copy per source>_<setting>_<outcome>`, e.g. `A_1_0_2_0_0`
    pub fn operator_name(&self, op: &Operator) -> String {
        let mut parts = Vec::with_capacity(op.copies.len() + 3);
        parts.push(self.names[op.party].clone());
        parts.extend(op.copies.iter().map(|c| c.to_string()));
        parts.push(op.setting.to_string());
        parts.push(op.outcome.to_string());
        parts.join("_")
    }

    /// Parse an operator name produced by [`operator_name`](Self::operator_name)
    pub fn parse_operator(&self, name: &str) -> Result<Operator, RelaxationError> {
        let unknown = || RelaxationError::UnknownOperator(name.to_string());
        let parts: Vec<&str> = name.trim().split('_').collect();
        let numeric = self.nr_sources() + 2;
        if parts.len() <= numeric {
            return Err(unknown());
        }
        let split = parts.len() - numeric;
        let party_name = parts[..split].join("_");
        let party = self
            .names
            .iter()
            .position(|n| *n == party_name)
            .ok_or_else(unknown)?;
        let numbers = parts[split..]
            .iter()
            .map(|p| p.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| unknown())?;

        let copies = numbers[..self.nr_sources()].to_vec();
        let setting = numbers[self.nr_sources()];
        let outcome = numbers[self.nr_sources() + 1];

        for (source, copy) in copies.iter().enumerate() {
            let feeds = self.hypergraph[source][party];
            let level = self.inflation_level_per_source[source];
            let valid = if feeds {
                (1..=level).contains(copy)
            } else {
                *copy == 0
            };
            if !valid {
                return Err(unknown());
            }
        }
        if setting >= self.settings_per_party[party]
            || outcome + 1 >= self.outcomes_per_party[party]
        {
            return Err(unknown());
        }
        Ok(Operator::new(party, copies, setting, outcome))
    }

    /// Shape of a probability table: outcomes per party, then settings per party
    pub fn distribution_shape(&self) -> Vec<usize> {
        self.outcomes_per_party
            .iter()
            .chain(&self.settings_per_party)
            .copied()
            .collect()
    }
}

impl fmt::Display for InflationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "InflationProblem with {} parties and {} sources", self.nr_parties(), self.nr_sources())?;
        for (s, source) in self.sources.iter().enumerate() {
            let children: Vec<&str> = self
                .names
                .iter()
                .enumerate()
                .filter(|(p, _)| self.hypergraph[s][*p])
                .map(|(_, n)| n.as_str())
                .collect();
            writeln!(
                f,
                "  {} (inflation level {}) -> {}",
                source,
                self.inflation_level_per_source[s],
                children.join(", ")
            )?;
        }
        write!(
            f,
            "  outcomes per party: {:?}, settings per party: {:?}",
            self.outcomes_per_party, self.settings_per_party
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bilocal() -> InflationProblem {
        InflationProblem::new(
            &[("h1", &["v1", "v2"]), ("h2", &["v2", "v3"])],
            &["v1", "v2", "v3"],
            &[2, 2, 2],
            &[1, 1, 1],
            &[2, 2],
        )
        .unwrap()
    }

    #[test]
    fn test_hypergraph() {
        let problem = bilocal();
        assert_eq!(
            problem.hypergraph(),
            &[vec![true, true, false], vec![false, true, true]]
        );
        assert_eq!(problem.sources_of_party(1), vec![0, 1]);
    }

    #[test]
    fn test_copy_indices_last_source_fastest() {
        let problem = bilocal();
        assert_eq!(
            problem.copy_indices(1),
            vec![vec![1, 1], vec![1, 2], vec![2, 1], vec![2, 2]]
        );
        assert_eq!(problem.copy_indices(0), vec![vec![1, 0], vec![2, 0]]);
    }

    #[test]
    fn test_measurement_shape() {
        let problem = InflationProblem::new(&[("rho", &["A", "B"])], &[], &[3, 2], &[2, 2], &[])
            .unwrap();
        let meas = problem.measurements();
        assert_eq!(meas.len(), 2);
        assert_eq!(meas[0].len(), 1);
        assert_eq!(meas[0][0].len(), 2);
        assert_eq!(meas[0][0][0].len(), 2);
        assert_eq!(meas[1][0][1].len(), 1);
    }

    #[test]
    fn test_operator_name_round_trip() {
        let problem = bilocal();
        let op = Operator::new(1, vec![2, 1], 0, 0);
        let name = problem.operator_name(&op);
        assert_eq!(name, "v2_2_1_0_0");
        assert_eq!(problem.parse_operator(&name).unwrap(), op);
    }

    #[test]
    fn test_parse_operator_rejects_invalid_copies() {
        let problem = bilocal();
        assert!(problem.parse_operator("v1_1_1_0_0").is_err());
        assert!(problem.parse_operator("v1_3_0_0_0").is_err());
        assert!(problem.parse_operator("v1_1_0_0_1").is_err());
        assert!(problem.parse_operator("x_1_0_0_0").is_err());
    }

    #[test]
    fn test_invalid_scenario_is_rejected() {
        let result = InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2], &[1, 1], &[]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}

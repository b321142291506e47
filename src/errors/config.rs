// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

/// Errors that can occur while validating a causal scenario
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A directed cycle was found in the causal graph
    CyclicDependency {
        /// The cycle path, closed on its first node
        cycle: Vec<String>,
    },
    /// A party listed in `order` does not appear in the DAG
    UnresolvedParty {
        /// The party name taken from `order`
        party: String,
    },
    /// An observed node of the DAG is missing from an explicit `order`
    UnorderedParty {
        /// The observed node
        party: String,
    },
    /// A node is declared more than once
    DuplicateNode {
        /// The repeated node name
        node: String,
    },
    /// An observed variable feeds another observed variable
    ObservedEdge {
        /// The parent party
        from: String,
        /// The child party
        to: String,
    },
    /// A per-party or per-source vector has the wrong length
    CardinalityMismatch {
        /// The offending field
        field: String,
        /// Expected number of entries
        expected: usize,
        /// Number of entries found
        found: usize,
    },
    /// A cardinality or inflation level is zero
    ZeroCardinality {
        /// The offending field
        field: String,
        /// Position of the zero entry
        index: usize,
    },
    /// No observed party could be found
    EmptyScenario,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ValidationError::UnresolvedParty { party } => {
                write!(f, "Party '{}' is listed in order but does not exist in the DAG", party)
            }
            ValidationError::UnorderedParty { party } => {
                write!(f, "Observed node '{}' is missing from order", party)
            }
            ValidationError::DuplicateNode { node } => {
                write!(f, "Duplicate DAG node: '{}'", node)
            }
            ValidationError::ObservedEdge { from, to } => {
                write!(
                    f,
                    "Observed node '{}' feeds observed node '{}'; only network scenarios are supported",
                    from, to
                )
            }
            ValidationError::CardinalityMismatch {
                field,
                expected,
                found,
            } => {
                write!(
                    f,
                    "'{}' has {} entries, expected {}",
                    field, found, expected
                )
            }
            ValidationError::ZeroCardinality { field, index } => {
                write!(f, "'{}' entry {} must be at least 1", field, index)
            }
            ValidationError::EmptyScenario => write!(f, "Scenario has no observed parties"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a run configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported configuration format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_listed_one_per_line() {
        let err = ConfigError::Validation(vec![
            ValidationError::DuplicateNode {
                node: "lambda".to_string(),
            },
            ValidationError::EmptyScenario,
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("Configuration validation failed:\n"));
        assert!(msg.contains("Duplicate DAG node: 'lambda'\nScenario has no observed parties"));
    }
}

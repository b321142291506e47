// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use ndarray::{ArrayD, Dimension, IxDyn};

use crate::config::{DistributionFamily, TableValues};
use crate::errors::RelaxationError;
use crate::scenario::InflationProblem;

/// An observed probability table `p[a, b, c, ..., x, y, z]`.
///
/// The first `n` axes are the outcomes of the `n` parties, the last `n` their
/// settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    table: ArrayD<f64>,
    nr_parties: usize,
}

impl Distribution {
    /// Wrap a table, checking its shape against the scenario
    pub fn new(table: ArrayD<f64>, problem: &InflationProblem) -> Result<Self, RelaxationError> {
        let expected = problem.distribution_shape();
        if table.shape() != expected.as_slice() {
            return Err(RelaxationError::DistributionShape {
                expected,
                found: table.shape().to_vec(),
            });
        }
        Ok(Self {
            table,
            nr_parties: problem.nr_parties(),
        })
    }

    /// Build a table from values listed in row-major order
    pub fn from_values(values: Vec<f64>, problem: &InflationProblem) -> Result<Self, RelaxationError> {
        let expected = problem.distribution_shape();
        let found = vec![values.len()];
        let table = ArrayD::from_shape_vec(IxDyn(&expected), values)
            .map_err(|_| RelaxationError::DistributionShape {
                expected: expected.clone(),
                found,
            })?;
        Self::new(table, problem)
    }

    /// Build a table from a configured array.
    ///
    /// Nested arrays carry their own shape. A flat list is reshaped to `shape` when
    /// one is given and to the scenario's shape otherwise.
    pub fn from_table(
        values: &TableValues,
        shape: Option<&[usize]>,
        problem: &InflationProblem,
    ) -> Result<Self, RelaxationError> {
        let expected = problem.distribution_shape();
        let (found, entries) = values
            .to_shape_and_values()
            .ok_or(RelaxationError::RaggedDistribution)?;
        let target = match (found.len(), shape) {
            (1, Some(shape)) => shape.to_vec(),
            (1, None) => expected.clone(),
            (_, Some(shape)) if shape != found.as_slice() => {
                return Err(RelaxationError::DistributionShape {
                    expected: shape.to_vec(),
                    found,
                })
            }
            _ => found.clone(),
        };
        let table = ArrayD::from_shape_vec(IxDyn(&target), entries)
            .map_err(|_| RelaxationError::DistributionShape { expected, found })?;
        Self::new(table, problem)
    }

    /// Build a table from `f(outcomes, settings)`
    pub fn from_fn<F>(problem: &InflationProblem, f: F) -> Self
    where
        F: Fn(&[usize], &[usize]) -> f64,
    {
        let n = problem.nr_parties();
        let table = ArrayD::from_shape_fn(IxDyn(&problem.distribution_shape()), |idx| {
            let idx = idx.slice();
            f(&idx[..n], &idx[n..])
        });
        Self {
            table,
            nr_parties: n,
        }
    }

    /// Noisy GHZ correlations: `v/d` on all-equal outcomes plus white noise
    pub fn ghz(problem: &InflationProblem, visibility: f64) -> Self {
        let outcomes = problem.outcomes_per_party();
        let d = outcomes.iter().copied().min().unwrap_or(1) as f64;
        let noise = (1.0 - visibility) / outcomes.iter().product::<usize>() as f64;
        Self::from_fn(problem, |a, _| {
            let all_equal = a.windows(2).all(|w| w[0] == w[1]);
            if all_equal {
                visibility / d + noise
            } else {
                noise
            }
        })
    }

    /// Noisy W correlations for binary parties: `v/n` on each single-one event plus white noise
    pub fn w(problem: &InflationProblem, visibility: f64) -> Result<Self, RelaxationError> {
        if problem.outcomes_per_party().iter().any(|&o| o != 2) {
            return Err(RelaxationError::NonBinaryOutcomes);
        }
        let n = problem.nr_parties();
        let noise = (1.0 - visibility) / 2f64.powi(n as i32);
        Ok(Self::from_fn(problem, |a, _| {
            if a.iter().sum::<usize>() == 1 {
                visibility / n as f64 + noise
            } else {
                noise
            }
        }))
    }

    pub fn uniform(problem: &InflationProblem) -> Self {
        let total = problem.outcomes_per_party().iter().product::<usize>() as f64;
        Self::from_fn(problem, |_, _| 1.0 / total)
    }

    /// Instantiate a configured family for a scenario
    pub fn from_family(
        family: &DistributionFamily,
        problem: &InflationProblem,
    ) -> Result<Self, RelaxationError> {
        match family {
            DistributionFamily::Ghz { visibility } => Ok(Self::ghz(problem, *visibility)),
            DistributionFamily::W { visibility } => Self::w(problem, *visibility),
            DistributionFamily::Uniform => Ok(Self::uniform(problem)),
            DistributionFamily::Explicit { values, shape } => {
                Self::from_table(values, shape.as_deref(), problem)
            }
        }
    }

    pub fn table(&self) -> &ArrayD<f64> {
        &self.table
    }

    pub fn nr_parties(&self) -> usize {
        self.nr_parties
    }

    /// Marginal probability of `(party, outcome, setting)` events.
    ///
    /// Outcomes of the remaining parties are summed over and their settings fixed to 0.
    pub fn marginal(&self, events: &[(usize, usize, usize)]) -> f64 {
        let n = self.nr_parties;
        let mut wanted: Vec<Option<(usize, usize)>> = vec![None; n];
        for &(party, outcome, setting) in events {
            wanted[party] = Some((outcome, setting));
        }
        self.table
            .indexed_iter()
            .filter(|(idx, _)| {
                (0..n).all(|p| match wanted[p] {
                    Some((outcome, setting)) => idx[p] == outcome && idx[n + p] == setting,
                    None => idx[n + p] == 0,
                })
            })
            .map(|(_, v)| *v)
            .sum()
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use nalgebra::DMatrix;
use serde::Serialize;
use std::fmt;

/// Termination status reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Optimal,
    Infeasible,
    Unbounded,
    MaxIterations,
    NumericalError,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
            SolverStatus::MaxIterations => "max_iterations",
            SolverStatus::NumericalError => "numerical_error",
        };
        write!(f, "{}", text)
    }
}

/// Result of one SDP solve.
///
/// `primal_objective` is the value of `bᵀt + offset`; `dual_objective` the bound
/// `⟨F0, X⟩ + offset` certified by the dual matrix `X`.
#[derive(Debug, Clone, Serialize)]
pub struct SdpSolution {
    pub status: SolverStatus,
    pub primal_objective: f64,
    pub dual_objective: f64,
    pub t: Vec<f64>,
    #[serde(skip)]
    pub dual: Vec<DMatrix<f64>>,
    pub iterations: usize,
}

impl SdpSolution {
    /// A solution carrying no iterate
    pub fn with_status(status: SolverStatus) -> Self {
        Self {
            status,
            primal_objective: f64::NAN,
            dual_objective: f64::NAN,
            t: Vec::new(),
            dual: Vec::new(),
            iterations: 0,
        }
    }

    pub fn has_iterate(&self) -> bool {
        !self.dual.is_empty()
    }
}

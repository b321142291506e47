// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::SolverError;
use crate::sdp::{SdpProblem, SdpSolution, SolverStatus};
use crate::traits::SdpSolver;

/// A solver that reports a fixed status without looking at the problem
pub struct StubSolver {
    pub status: SolverStatus,
    pub objective: f64,
}

impl StubSolver {
    pub fn new(status: SolverStatus, objective: f64) -> Self {
        Self { status, objective }
    }
}

impl SdpSolver for StubSolver {
    fn solve(&self, problem: &SdpProblem) -> Result<SdpSolution, SolverError> {
        let mut solution = SdpSolution::with_status(self.status);
        solution.primal_objective = self.objective;
        solution.dual_objective = self.objective;
        solution.t = vec![0.0; problem.nr_variables()];
        Ok(solution)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// A solver that always fails, for error propagation tests
pub struct FailingSolver;

impl SdpSolver for FailingSolver {
    fn solve(&self, _problem: &SdpProblem) -> Result<SdpSolution, SolverError> {
        Err(SolverError::Numerical("Simulated solver failure".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

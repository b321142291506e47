// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::SolverError;
use crate::sdp::{SdpProblem, SdpSolution};

/// A semidefinite programming backend.
///
/// Backends receive a fully assembled [`SdpProblem`] and must report a status even
/// when they fail to converge; `Err` is reserved for failures that leave no usable
/// result, such as an external solver that cannot be started.
pub trait SdpSolver: Send + Sync {
    fn solve(&self, problem: &SdpProblem) -> Result<SdpSolution, SolverError>;

    fn name(&self) -> &'static str;
}

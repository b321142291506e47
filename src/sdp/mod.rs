// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Solver-facing semidefinite programs.
//!
//! An [`SdpProblem`] is the assembled relaxation with every known moment already
//! substituted; backends only see block-sparse symmetric matrices and return an
//! [`SdpSolution`].

mod problem;
mod solution;

pub use problem::{Block, SdpProblem, SparseBlockMatrix};
pub use solution::{SdpSolution, SolverStatus};

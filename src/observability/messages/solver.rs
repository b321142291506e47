// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for SDP backends.
//!
//! This module contains message types for logging events related to:
//! * Solve lifecycle (start, finish)
//! * Interior-point convergence
//! * External solver processes

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A backend received a problem.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::solver::SolveStarted;
///
/// let msg = SolveStarted {
///     solver: "interior_point",
///     variables: 12,
///     dimension: 9,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Solving SDP with interior_point: 12 variables, matrix dimension 9"
/// );
/// ```
pub struct SolveStarted<'a> {
    pub solver: &'a str,
    pub variables: usize,
    pub dimension: usize,
}

impl Display for SolveStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Solving SDP with {}: {} variables, matrix dimension {}",
            self.solver, self.variables, self.dimension
        )
    }
}

impl StructuredLog for SolveStarted<'_> {
    fn log(&self) {
        tracing::info!(
            solver = self.solver,
            variables = self.variables,
            dimension = self.dimension,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "solve",
            span_name = name,
            solver = self.solver,
            variables = self.variables,
            dimension = self.dimension,
        )
    }
}

/// One interior-point iteration.
///
/// # Log Level
/// `debug!` - Convergence trace
pub struct IterationCompleted {
    pub iteration: usize,
    pub primal_objective: f64,
    pub dual_objective: f64,
    pub relative_gap: f64,
    pub primal_infeasibility: f64,
    pub dual_infeasibility: f64,
}

impl Display for IterationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "iter {:>3}: pobj={:+.8e} dobj={:+.8e} gap={:.2e} pinf={:.2e} dinf={:.2e}",
            self.iteration,
            self.primal_objective,
            self.dual_objective,
            self.relative_gap,
            self.primal_infeasibility,
            self.dual_infeasibility
        )
    }
}

impl StructuredLog for IterationCompleted {
    fn log(&self) {
        tracing::debug!(
            iteration = self.iteration,
            primal_objective = self.primal_objective,
            dual_objective = self.dual_objective,
            relative_gap = self.relative_gap,
            primal_infeasibility = self.primal_infeasibility,
            dual_infeasibility = self.dual_infeasibility,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "iteration",
            span_name = name,
            iteration = self.iteration,
            relative_gap = self.relative_gap,
        )
    }
}

/// A factorisation failed before convergence.
///
/// # Log Level
/// `warn!` - Recoverable issue
pub struct NumericalBreakdown<'a> {
    pub iteration: usize,
    pub reason: &'a str,
}

impl Display for NumericalBreakdown<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Numerical breakdown at iteration {}: {}",
            self.iteration, self.reason
        )
    }
}

impl StructuredLog for NumericalBreakdown<'_> {
    fn log(&self) {
        tracing::warn!(iteration = self.iteration, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "numerical_breakdown",
            span_name = name,
            iteration = self.iteration,
            reason = self.reason,
        )
    }
}

/// A backend finished.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::solver::SolveFinished;
/// use std::time::Duration;
///
/// let msg = SolveFinished {
///     solver: "sdpa",
///     status: "optimal",
///     iterations: 17,
///     duration: Duration::from_millis(40),
/// };
///
/// assert!(msg.to_string().starts_with("sdpa finished with status optimal"));
/// ```
pub struct SolveFinished<'a> {
    pub solver: &'a str,
    pub status: &'a str,
    pub iterations: usize,
    pub duration: Duration,
}

impl Display for SolveFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} finished with status {} after {} iterations in {:?}",
            self.solver, self.status, self.iterations, self.duration
        )
    }
}

impl StructuredLog for SolveFinished<'_> {
    fn log(&self) {
        tracing::info!(
            solver = self.solver,
            status = self.status,
            iterations = self.iterations,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "solve_finished",
            span_name = name,
            solver = self.solver,
            status = self.status,
            iterations = self.iterations,
            duration = ?self.duration,
        )
    }
}

/// An external solver process is about to run.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExternalSolverLaunched<'a> {
    pub executable: &'a str,
    pub input: &'a str,
}

impl Display for ExternalSolverLaunched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Running {} on {}", self.executable, self.input)
    }
}

impl StructuredLog for ExternalSolverLaunched<'_> {
    fn log(&self) {
        tracing::info!(executable = self.executable, input = self.input, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "external_solver",
            span_name = name,
            executable = self.executable,
            input = self.input,
        )
    }
}

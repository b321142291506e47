// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for relaxation building and constraining.
//!
//! This module contains message types for logging events related to:
//! * Generating sets and moment matrices
//! * Inflation symmetries
//! * Values, objectives and the assembled SDP
//! * Exports

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A generating set was built.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::relaxation::ColumnsGenerated;
///
/// let msg = ColumnsGenerated {
///     specification: "npa2",
///     columns: 41,
/// };
///
/// assert_eq!(msg.to_string(), "Generated 41 columns for npa2");
/// ```
pub struct ColumnsGenerated<'a> {
    pub specification: &'a str,
    pub columns: usize,
}

impl Display for ColumnsGenerated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Generated {} columns for {}", self.columns, self.specification)
    }
}

impl StructuredLog for ColumnsGenerated<'_> {
    fn log(&self) {
        tracing::info!(
            specification = self.specification,
            columns = self.columns,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "columns_generated",
            span_name = name,
            specification = self.specification,
            columns = self.columns,
        )
    }
}

/// The moment matrix and its symmetry reduction are complete.
///
/// # Log Level
/// `info!` - Important operational event
pub struct MomentMatrixBuilt {
    pub size: usize,
    pub raw_variables: usize,
    pub variables: usize,
    pub symmetries: usize,
    pub duration: Duration,
}

impl Display for MomentMatrixBuilt {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Moment matrix of size {} has {} variables ({} before {} symmetries), built in {:?}",
            self.size, self.variables, self.raw_variables, self.symmetries, self.duration
        )
    }
}

impl StructuredLog for MomentMatrixBuilt {
    fn log(&self) {
        tracing::info!(
            size = self.size,
            raw_variables = self.raw_variables,
            variables = self.variables,
            symmetries = self.symmetries,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "moment_matrix",
            span_name = name,
            size = self.size,
            variables = self.variables,
        )
    }
}

/// A copy permutation does not map the generating set onto itself.
///
/// # Log Level
/// `warn!` - The relaxation stays valid but less reduced
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::relaxation::SymmetrySkipped;
///
/// let msg = SymmetrySkipped { source: "lambda", missing: "<A_2_1_0_0>" };
/// assert!(msg.to_string().contains("lambda"));
/// ```
pub struct SymmetrySkipped<'a> {
    pub source: &'a str,
    pub missing: &'a str,
}

impl Display for SymmetrySkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping a copy permutation of source '{}': column {} has no image in the generating set",
            self.source, self.missing
        )
    }
}

impl StructuredLog for SymmetrySkipped<'_> {
    fn log(&self) {
        tracing::warn!(source = self.source, missing = self.missing, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "symmetry_skipped",
            span_name = name,
            source = self.source,
            missing = self.missing,
        )
    }
}

/// Moments were fixed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ValuesSet {
    pub known: usize,
    pub semiknown: usize,
    pub use_lpi: bool,
}

impl Display for ValuesSet {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Fixed {} known and {} semiknown moments (LPI {})",
            self.known,
            self.semiknown,
            if self.use_lpi { "on" } else { "off" }
        )
    }
}

impl StructuredLog for ValuesSet {
    fn log(&self) {
        tracing::info!(
            known = self.known,
            semiknown = self.semiknown,
            use_lpi = self.use_lpi,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "values_set",
            span_name = name,
            known = self.known,
            semiknown = self.semiknown,
        )
    }
}

/// A setting combination that is accepted but probably unintended.
///
/// # Log Level
/// `warn!` - Potential misconfiguration
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::relaxation::ConfigurationWarning;
///
/// let msg = ConfigurationWarning {
///     reason: "an objective is set, feas_as_optim is ignored",
/// };
/// assert!(msg.to_string().starts_with("Configuration warning"));
/// ```
pub struct ConfigurationWarning<'a> {
    pub reason: &'a str,
}

impl Display for ConfigurationWarning<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Configuration warning: {}", self.reason)
    }
}

impl StructuredLog for ConfigurationWarning<'_> {
    fn log(&self) {
        tracing::warn!(reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("configuration_warning", span_name = name, reason = self.reason)
    }
}

/// A linear constraint reduced to a constant that it violates.
///
/// # Log Level
/// `warn!` - The constraint is dropped from the SDP
pub struct ConstantConstraintViolated<'a> {
    pub constraint: &'a str,
    pub value: f64,
}

impl Display for ConstantConstraintViolated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Constraint {} reduces to the constant {:.3e} < 0",
            self.constraint, self.value
        )
    }
}

impl StructuredLog for ConstantConstraintViolated<'_> {
    fn log(&self) {
        tracing::warn!(constraint = self.constraint, value = self.value, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "constant_constraint",
            span_name = name,
            constraint = self.constraint,
            value = self.value,
        )
    }
}

/// The SDP handed to a solver.
///
/// # Log Level
/// `debug!` - Problem size trace
pub struct SdpAssembled {
    pub free_variables: usize,
    pub eliminated: usize,
    pub linear_rows: usize,
    pub feasibility: bool,
}

impl Display for SdpAssembled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Assembled {} SDP: {} free variables, {} eliminated, {} linear rows",
            if self.feasibility { "feasibility" } else { "optimisation" },
            self.free_variables,
            self.eliminated,
            self.linear_rows
        )
    }
}

impl StructuredLog for SdpAssembled {
    fn log(&self) {
        tracing::debug!(
            free_variables = self.free_variables,
            eliminated = self.eliminated,
            linear_rows = self.linear_rows,
            feasibility = self.feasibility,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "sdp_assembled",
            span_name = name,
            free_variables = self.free_variables,
        )
    }
}

/// A relaxation was solved.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RelaxationSolved<'a> {
    pub status: &'a str,
    pub primal_objective: f64,
}

impl Display for RelaxationSolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Relaxation is {} (primal objective {:.8})",
            self.status, self.primal_objective
        )
    }
}

impl StructuredLog for RelaxationSolved<'_> {
    fn log(&self) {
        tracing::info!(
            status = self.status,
            primal_objective = self.primal_objective,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("relaxation_solved", span_name = name, status = self.status)
    }
}

/// A relaxation was written to disk.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RelaxationExported<'a> {
    pub path: &'a str,
    pub format: &'a str,
}

impl Display for RelaxationExported<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Wrote {} export to {}", self.format, self.path)
    }
}

impl StructuredLog for RelaxationExported<'_> {
    fn log(&self) {
        tracing::info!(path = self.path, format = self.format, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "relaxation_exported",
            span_name = name,
            path = self.path,
            format = self.format,
        )
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::{ExportError, SolverError};

/// Errors raised while building, constraining or solving a relaxation
#[derive(Error, Debug)]
pub enum RelaxationError {
    #[error("The relaxation has not been generated; call generate_relaxation first")]
    NotGenerated,

    #[error("The relaxation has not been solved; call solve first")]
    NotSolved,

    #[error("Invalid column specification: {0}")]
    InvalidColumnSpecification(String),

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Monomial '{0}' does not appear in the moment matrix")]
    UnknownMonomial(String),

    #[error("Cannot parse '{input}' at position {position}: {reason}")]
    Parse {
        input: String,
        position: usize,
        reason: String,
    },

    #[error("Monomial '{0}' is not atomic; set only_specified_values to assign compound moments")]
    NonAtomicValue(String),

    #[error("Monomial '{0}' is not knowable; disable only_knowable_moments to assign it")]
    UnknowableValue(String),

    #[error("Distribution has shape {found:?}, expected {expected:?}")]
    DistributionShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Distribution table is ragged: sub-arrays of one axis differ in length or depth")]
    RaggedDistribution,

    #[error("Correlator certificates require binary outcomes for every party")]
    NonBinaryOutcomes,

    #[error("Linear equality constraints are inconsistent")]
    InconsistentConstraints,

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type RelaxationResult<T> = Result<T, RelaxationError>;

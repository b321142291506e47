// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors surfaced by SDP solver backends
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Solver I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External solver '{executable}' exited with {status}: {stderr}")]
    ExternalFailed {
        executable: String,
        status: String,
        stderr: String,
    },

    #[error("Cannot parse solver output: {0}")]
    Parse(String),
}

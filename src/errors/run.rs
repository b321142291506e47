// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::{ConfigError, ExportError, RelaxationError};

/// Errors produced while executing one run configuration end to end
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Relaxation(#[from] RelaxationError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Run configuration '{0}' has no distribution family to scan")]
    NothingToScan(String),

    #[error("Task for '{name}' failed: {message}")]
    Task { name: String, message: String },
}

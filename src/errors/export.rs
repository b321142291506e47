// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported export extension '{0}'; use .dat-s, .csv or .json")]
    UnsupportedExtension(String),

    #[error("CSV serialisation failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! File writers for assembled relaxations.
//!
//! The format is chosen from the file extension: `.dat-s` (sparse SDPA, the
//! default when no extension is given), `.csv` (moment matrix with monomial
//! names) and `.json` (a serde snapshot of the relaxation).

use std::path::{Path, PathBuf};

use crate::errors::ExportError;

mod csv;
mod json;
mod sdpa;

pub use csv::write_csv;
pub use json::write_json;
pub use sdpa::{write_sdpa, write_sdpa_file};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Sdpa,
    Csv,
    Json,
}

/// Resolve the format of `path`, appending `.dat-s` when it has no extension
pub fn resolve_export_path(path: &Path) -> Result<(PathBuf, ExportFormat), ExportError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if name.ends_with(".dat-s") {
        return Ok((path.to_path_buf(), ExportFormat::Sdpa));
    }
    match path.extension().and_then(|e| e.to_str()) {
        None => {
            let mut with_extension = path.as_os_str().to_owned();
            with_extension.push(".dat-s");
            Ok((PathBuf::from(with_extension), ExportFormat::Sdpa))
        }
        Some(ext) => match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok((path.to_path_buf(), ExportFormat::Csv)),
            "json" => Ok((path.to_path_buf(), ExportFormat::Json)),
            other => Err(ExportError::UnsupportedExtension(other.to_string())),
        },
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution of run configurations: single runs, concurrent batches and
//! visibility scans.

mod batch;
mod runner;
mod scan;

#[cfg(test)]
mod integration_tests;

pub use batch::{default_concurrency, BatchRunner};
pub use runner::{build_relaxation, run_config, RunReport};
pub use scan::{scan_visibility, ScanReport, ScanStep};

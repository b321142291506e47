// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run execution events.
//!
//! This module contains message types for logging events related to:
//! * Single run completion and failure
//! * Batch lifecycle and concurrency
//! * Visibility scan steps and results

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Batch of run configurations started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::engine::BatchStarted;
///
/// let msg = BatchStarted {
///     configs: 3,
///     max_concurrency: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BatchStarted {
    pub configs: usize,
    pub max_concurrency: usize,
}

impl Display for BatchStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting batch of {} runs, max_concurrency={}",
            self.configs, self.max_concurrency
        )
    }
}

impl StructuredLog for BatchStarted {
    fn log(&self) {
        tracing::info!(
            configs = self.configs,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch",
            span_name = name,
            configs = self.configs,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Batch finished; every run either succeeded or failed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct BatchCompleted {
    pub succeeded: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for BatchCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Batch completed: {} succeeded, {} failed in {:?}",
            self.succeeded, self.failed, self.duration
        )
    }
}

impl StructuredLog for BatchCompleted {
    fn log(&self) {
        tracing::info!(
            succeeded = self.succeeded,
            failed = self.failed,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_completed",
            span_name = name,
            succeeded = self.succeeded,
            failed = self.failed,
            duration = ?self.duration,
        )
    }
}

/// One run configuration solved.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::engine::RunCompleted;
/// use std::time::Duration;
///
/// let msg = RunCompleted {
///     name: "triangle-ghz",
///     status: "infeasible",
///     duration: Duration::from_millis(120),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunCompleted<'a> {
    pub name: &'a str,
    pub status: &'a str,
    pub duration: Duration,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' finished with status {} in {:?}",
            self.name, self.status, self.duration
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            run = self.name,
            status = self.status,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_completed",
            span_name = name,
            run = self.name,
            status = self.status,
            duration = ?self.duration,
        )
    }
}

/// A run configuration could not be solved.
///
/// # Log Level
/// `error!` - The run produced no result
pub struct RunFailed<'a> {
    pub name: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run '{}' failed: {}", self.name, self.error)
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            run = self.name,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run_failed",
            span_name = name,
            run = self.name,
            error = %self.error,
        )
    }
}

/// One bisection step of a visibility scan.
///
/// # Log Level
/// `debug!` - Progress detail
pub struct ScanStepCompleted<'a> {
    pub visibility: f64,
    pub status: &'a str,
    pub lambda: f64,
}

impl Display for ScanStepCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Visibility {:.6}: {} (lambda={:.3e})",
            self.visibility, self.status, self.lambda
        )
    }
}

impl StructuredLog for ScanStepCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            visibility = self.visibility,
            status = self.status,
            lambda = self.lambda,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "scan_step",
            span_name = name,
            visibility = self.visibility,
            status = self.status,
            lambda = self.lambda,
        )
    }
}

/// Visibility scan finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ScanCompleted<'a> {
    pub name: &'a str,
    pub critical_visibility: f64,
    pub steps: usize,
    pub duration: Duration,
}

impl Display for ScanCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scan '{}' found critical visibility {:.6} after {} solves in {:?}",
            self.name, self.critical_visibility, self.steps, self.duration
        )
    }
}

impl StructuredLog for ScanCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            run = self.name,
            critical_visibility = self.critical_visibility,
            steps = self.steps,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "scan_completed",
            span_name = name,
            run = self.name,
            critical_visibility = self.critical_visibility,
            steps = self.steps,
            duration = ?self.duration,
        )
    }
}

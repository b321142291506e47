// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for scenario validation errors.
//!
//! This module contains message types for logging events related to:
//! * Cyclic causal structure
//! * Observed variables feeding other observed variables

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Cyclic dependency detected in a causal DAG.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use inflation_sdp::observability::messages::validation::CyclicDependencyDetected;
///
/// let cycle = vec!["A", "B", "A"];
/// let msg = CyclicDependencyDetected { cycle: &cycle };
///
/// assert_eq!(msg.to_string(), "Cyclic dependency detected: A -> B -> A");
/// ```
pub struct CyclicDependencyDetected<'a> {
    pub cycle: &'a [&'a str],
}

impl Display for CyclicDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cyclic dependency detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for CyclicDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
        )
    }
}

/// An observed node has an observed child, which inflation cannot express.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ObservedEdgeRejected<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for ObservedEdgeRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Observed node '{}' feeds observed node '{}'",
            self.from, self.to
        )
    }
}

impl StructuredLog for ObservedEdgeRejected<'_> {
    fn log(&self) {
        tracing::error!(from = self.from, to = self.to, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            from = self.from,
            to = self.to,
        )
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit the same event with typed fields.
//!
//! # Organization
//!
//! * `validation` - scenario validation errors
//! * `relaxation` - relaxation generation, constraint and export events
//! * `solver` - SDP backend lifecycle and convergence events
//! * `engine` - batch runs and visibility scans
//!
//! # Usage Pattern
//!
//! ```rust
//! use inflation_sdp::observability::messages::relaxation::ColumnsGenerated;
//! use inflation_sdp::observability::messages::StructuredLog;
//!
//! let msg = ColumnsGenerated {
//!     specification: "npa2",
//!     columns: 41,
//! };
//!
//! msg.log();
//! ```

use std::fmt::Display;
use tracing::Span;

pub mod engine;
pub mod relaxation;
pub mod solver;
pub mod validation;

/// A message that knows how to emit itself as a structured `tracing` event.
pub trait StructuredLog: Display {
    /// Emit the message at its designated level with structured fields
    fn log(&self);

    /// Open a span carrying the message fields
    fn span(&self, name: &str) -> Span;
}

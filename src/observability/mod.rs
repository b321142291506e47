// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Diagnostic and operational events are emitted through message structs rather
//! than format strings at the call site. Each message implements `Display` for the
//! human-readable line and `StructuredLog` for the typed `tracing` fields.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::validation` - scenario validation errors
//! * `messages::relaxation` - moment matrix, values, assembly and export events
//! * `messages::solver` - SDP backend iterations and outcomes
//! * `messages::engine` - batch runs and visibility scans
//!
//! # Usage
//!
//! ```rust
//! use inflation_sdp::observability::messages::relaxation::SymmetrySkipped;
//!
//! let msg = SymmetrySkipped {
//!     source: "lambda",
//!     missing: "A_2_1_0_0 B_1_2_0_0",
//! };
//!
//! tracing::warn!("{}", msg);
//! ```

pub mod messages;

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod algebra;       // operators, canonical words, monomials
pub mod backends;      // SDP solver backends
pub mod config;        // run configs + scenario validation
pub mod engine;        // batch runs and visibility scans
pub mod errors;        // error handling
pub mod export;        // SDPA, CSV and JSON writers
pub mod observability;
pub mod relaxation;    // moment-matrix relaxations
pub mod scenario;      // inflated causal scenarios and distributions
pub mod sdp;           // solver-facing problem and solution types
pub mod traits;        // unified abstractions

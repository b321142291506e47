// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! SDP solver backends.
//!
//! Every backend implements the `SdpSolver` trait and is created from configuration
//! through `SolverFactory`.
//!
//! # Available Backends
//!
//! ## Interior Point
//! Built-in dense primal-dual solver on `nalgebra`:
//! - **Method**: HKM direction with Mehrotra predictor-corrector, infeasible start
//! - **Use Case**: small and medium relaxations, no external tooling
//!
//! ## SDPA
//! Runs an installed `sdpa` binary on a sparse `.dat-s` file:
//! - **Method**: whatever the installed SDPA build provides
//! - **Use Case**: larger relaxations
//!
//! ## Stub Backend (Test-Only)
//! - **StubSolver**: reports a fixed status and objective
//! - **FailingSolver**: always returns an error
//!
//! # Examples
//!
//! ```rust
//! use inflation_sdp::backends::SolverFactory;
//! use inflation_sdp::config::SolverConfig;
//!
//! let solver = SolverFactory::from_config(&SolverConfig::default());
//! assert_eq!(solver.name(), "interior_point");
//! ```

mod factory;
mod interior_point;
mod sdpa;
#[cfg(test)]
pub mod stub;

pub use factory::SolverFactory;
pub use interior_point::InteriorPointSolver;
pub use sdpa::{parse_output, phase_status, SdpaSolver};

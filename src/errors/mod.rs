// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod export;
mod relaxation;
mod run;
mod solver;

pub use config::{ConfigError, ValidationError};
pub use export::ExportError;
pub use relaxation::{RelaxationError, RelaxationResult};
pub use run::RunError;
pub use solver::SolverError;

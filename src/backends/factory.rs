// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::backends::{InteriorPointSolver, SdpaSolver};
use crate::config::{SolverBackend, SolverConfig};
use crate::traits::SdpSolver;

/// Factory for creating solver backends from configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create the backend selected by `config.backend`.
    ///
    /// - `interior_point` -> InteriorPointSolver with the configured tolerance and iteration cap
    /// - `sdpa` -> SdpaSolver running the configured executable
    pub fn from_config(config: &SolverConfig) -> Box<dyn SdpSolver> {
        match config.backend {
            SolverBackend::InteriorPoint => Box::new(InteriorPointSolver::new(
                config.get_tolerance(),
                config.get_max_iterations(),
            )),
            SolverBackend::Sdpa => Box::new(SdpaSolver::new(config.get_sdpa_executable())),
        }
    }

    /// List all available backend names
    pub fn list_available_backends() -> Vec<&'static str> {
        vec!["interior_point", "sdpa"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_is_interior_point() {
        let solver = SolverFactory::from_config(&SolverConfig::default());
        assert_eq!(solver.name(), "interior_point");
    }

    #[test]
    fn test_sdpa_backend() {
        let config = SolverConfig {
            backend: SolverBackend::Sdpa,
            sdpa_executable: Some("/opt/sdpa/bin/sdpa".to_string()),
            ..SolverConfig::default()
        };
        let solver = SolverFactory::from_config(&config);
        assert_eq!(solver.name(), "sdpa");
        assert!(SolverFactory::list_available_backends().contains(&solver.name()));
    }
}

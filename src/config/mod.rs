// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod causal_graph;
mod loader;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use causal_graph::CausalGraph;
pub use loader::{
    load_and_validate_config, load_config, BoundsConfig, CertificateConfig, DagNode,
    DistributionConfig, DistributionFamily, RelaxationConfig, RunConfig, ScanConfig,
    ScenarioConfig, SolverBackend, SolverConfig, TableValues,
};
pub use validation::{resolve_roles, validate_scenario};

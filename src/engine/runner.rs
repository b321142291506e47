// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::backends::SolverFactory;
use crate::config::RunConfig;
use crate::errors::RunError;
use crate::observability::messages::engine::RunCompleted;
use crate::observability::messages::relaxation::ConfigurationWarning;
use crate::observability::messages::StructuredLog;
use crate::relaxation::{BoundKind, InflationSdp, RelaxationStatus, SolveOptions};
use crate::scenario::{Distribution, InflationProblem};

/// Outcome of one run configuration
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub name: String,
    pub status: RelaxationStatus,
    pub solver: String,
    pub primal_objective: f64,
    pub dual_objective: f64,
    pub objective_value: Option<f64>,
    /// Cleaned according to the run's certificate options
    pub certificate: BTreeMap<String, f64>,
    pub certificate_inequality: Option<String>,
    pub export: Option<PathBuf>,
    pub duration: Duration,
}

/// Generate a relaxation and apply the configured values, bounds and objective.
///
/// A configured distribution takes precedence over explicit `values`.
pub fn build_relaxation(cfg: &RunConfig) -> Result<InflationSdp, RunError> {
    let problem = InflationProblem::from_config(&cfg.scenario)?;
    let mut sdp = InflationSdp::new(&problem, cfg.relaxation.commuting);
    sdp.generate_relaxation(&cfg.relaxation.columns, cfg.relaxation.max_monomial_length)?;

    match &cfg.distribution {
        Some(dist) => {
            if !cfg.values.is_empty() {
                ConfigurationWarning {
                    reason: "both a distribution and explicit values are configured; the values are ignored",
                }
                .log();
            }
            let distribution = Distribution::from_family(&dist.family, &problem)?;
            sdp.set_distribution(&distribution, dist.use_lpi_constraints, dist.shared_randomness)?;
        }
        None if !cfg.values.is_empty() => {
            sdp.set_values(&cfg.values, false, false, false)?;
        }
        None => {}
    }

    if !cfg.bounds.lower.is_empty() {
        sdp.set_bounds(&cfg.bounds.lower, BoundKind::Lower)?;
    }
    if !cfg.bounds.upper.is_empty() {
        sdp.set_bounds(&cfg.bounds.upper, BoundKind::Upper)?;
    }
    if let Some(objective) = &cfg.objective {
        sdp.set_objective_str(objective, cfg.direction)?;
    }
    Ok(sdp)
}

/// Build, solve and optionally export one run configuration
pub fn run_config(cfg: &RunConfig) -> Result<RunReport, RunError> {
    let started = Instant::now();
    let mut sdp = build_relaxation(cfg)?;
    let solver = SolverFactory::from_config(&cfg.solver);
    sdp.solve(solver.as_ref(), &SolveOptions::from(&cfg.solver))?;

    let clean = cfg.certificate.clean;
    let chop_tol = cfg.certificate.get_chop_tol();
    let round_decimals = cfg.certificate.get_round_decimals();
    let certificate = sdp.certificate_as_dict(clean, chop_tol, round_decimals)?;
    let certificate_inequality = if certificate.is_empty() {
        None
    } else {
        Some(sdp.certificate_as_string(clean, chop_tol, round_decimals)?)
    };

    let export = match &cfg.export {
        Some(path) => Some(sdp.write_to_file(path)?),
        None => None,
    };

    let solution = sdp.solution()?;
    let report = RunReport {
        name: cfg.display_name().to_string(),
        status: solution.status,
        solver: solution.solver.clone(),
        primal_objective: solution.primal_objective,
        dual_objective: solution.dual_objective,
        objective_value: solution.objective_value,
        certificate,
        certificate_inequality,
        export,
        duration: started.elapsed(),
    };
    RunCompleted {
        name: &report.name,
        status: &report.status.to_string(),
        duration: report.duration,
    }
    .log();
    Ok(report)
}

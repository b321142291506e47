// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::time::Instant;

use crate::backends::SolverFactory;
use crate::config::{DistributionConfig, RunConfig, ScanConfig};
use crate::engine::runner::build_relaxation;
use crate::errors::RunError;
use crate::observability::messages::engine::{ScanCompleted, ScanStepCompleted};
use crate::observability::messages::StructuredLog;
use crate::relaxation::{InflationSdp, RelaxationStatus, SolveOptions};
use crate::scenario::Distribution;
use crate::traits::SdpSolver;

/// One solve of a visibility scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanStep {
    pub visibility: f64,
    pub status: RelaxationStatus,
    /// Largest λ with `Γ − λI ⪰ 0`
    pub lambda: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub name: String,
    /// Largest visibility found compatible, within the scan precision
    pub critical_visibility: f64,
    pub steps: Vec<ScanStep>,
}

/// Bisect the visibility of the configured distribution family.
///
/// Visibilities at or below the result are compatible with the relaxation and
/// those above are not. If `high` is already compatible the result is `high`;
/// if `low` is not, it is `low`. Any objective in the config is ignored.
pub fn scan_visibility(cfg: &RunConfig, window: &ScanConfig) -> Result<ScanReport, RunError> {
    let started = Instant::now();
    let name = cfg.display_name().to_string();
    let dist = cfg
        .distribution
        .clone()
        .ok_or_else(|| RunError::NothingToScan(name.clone()))?;
    if dist.family.with_visibility(window.low).is_none() {
        return Err(RunError::NothingToScan(name));
    }

    let mut base = cfg.clone();
    base.distribution = None;
    base.objective = None;
    let mut sdp = build_relaxation(&base)?;
    let solver = SolverFactory::from_config(&cfg.solver);
    let options = SolveOptions {
        feas_as_optim: false,
        ..SolveOptions::from(&cfg.solver)
    };

    let mut steps = Vec::new();
    let mut probe = |visibility: f64| -> Result<bool, RunError> {
        let step = solve_at(&mut sdp, solver.as_ref(), &options, &dist, visibility)?;
        ScanStepCompleted {
            visibility,
            status: &step.status.to_string(),
            lambda: step.lambda,
        }
        .log();
        steps.push(step);
        Ok(step.status == RelaxationStatus::Feasible)
    };

    let (mut low, mut high) = (window.low.min(window.high), window.low.max(window.high));
    let critical = if probe(high)? {
        high
    } else if !probe(low)? {
        low
    } else {
        while high - low > window.get_precision() {
            let middle = 0.5 * (low + high);
            if probe(middle)? {
                low = middle;
            } else {
                high = middle;
            }
        }
        low
    };

    ScanCompleted {
        name: &name,
        critical_visibility: critical,
        steps: steps.len(),
        duration: started.elapsed(),
    }
    .log();
    Ok(ScanReport {
        name,
        critical_visibility: critical,
        steps,
    })
}

fn solve_at(
    sdp: &mut InflationSdp,
    solver: &dyn SdpSolver,
    options: &SolveOptions,
    dist: &DistributionConfig,
    visibility: f64,
) -> Result<ScanStep, RunError> {
    let family = dist
        .family
        .with_visibility(visibility)
        .ok_or_else(|| RunError::NothingToScan(format!("{:?}", dist.family)))?;
    let distribution = Distribution::from_family(&family, sdp.problem())?;
    sdp.set_distribution(&distribution, dist.use_lpi_constraints, dist.shared_randomness)?;
    let solution = sdp.solve(solver, options)?;
    Ok(ScanStep {
        visibility,
        status: solution.status,
        lambda: solution.primal_objective,
    })
}

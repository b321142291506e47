// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Moment-matrix relaxations of inflated causal scenarios.
//!
//! [`InflationSdp`] is a small state machine: generate a relaxation from a column
//! specification, fix moments from observed data, optionally set bounds, extra
//! constraints and an objective, then solve with any [`SdpSolver`] and read the
//! status and dual certificate back.
//!
//! # Example
//!
//! ```rust
//! use inflation_sdp::backends::InteriorPointSolver;
//! use inflation_sdp::relaxation::{Direction, InflationSdp, RelaxationStatus, SolveOptions};
//! use inflation_sdp::scenario::InflationProblem;
//!
//! let problem = InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2, 2], &[2, 2], &[1])?;
//! let mut sdp = InflationSdp::new(&problem, false);
//! sdp.generate_relaxation(&"npa1".parse()?, 0)?;
//! sdp.set_objective_str("A_1_0_0*B_1_0_0", Direction::Max)?;
//! let solution = sdp.solve(&InteriorPointSolver::default(), &SolveOptions::default())?;
//! assert_eq!(solution.status, RelaxationStatus::Optimal);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod assembly;
mod certificate;
mod columns;
mod moment_matrix;
mod objective;
mod snapshot;
mod values;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::algebra::{Knowability, MonomialId, MonomialStore, OperatorAlgebra, ONE};
use crate::config::consts::DEFAULT_FEASIBILITY_TOLERANCE;
use crate::config::SolverConfig;
use crate::errors::{RelaxationError, RelaxationResult};
use crate::observability::messages::relaxation::{
    ColumnsGenerated, ConfigurationWarning, RelaxationSolved,
};
use crate::observability::messages::StructuredLog;
use crate::scenario::{InflationProblem, Measurements};
use crate::sdp::{SdpSolution, SolverStatus};
use crate::traits::SdpSolver;

pub use certificate::clean_coefficients;
pub use columns::{build_columns, ColumnSpec, Columns, PhysicalLengths};
pub use moment_matrix::{MomentMatrix, ONE_INDEX, ZERO_INDEX};
pub use snapshot::{MonomialEntry, RelaxationSnapshot};

/// Optimisation direction of an objective
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Max,
    Min,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Max => 1.0,
            Direction::Min => -1.0,
        }
    }
}

/// Which kind of per-monomial bound `set_bounds` replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Lower,
    Upper,
}

/// Parts of the relaxation state that `reset` clears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    Values,
    Bounds,
    Objective,
    Solution,
    Constraints,
    All,
}

impl FromStr for ResetTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "values" => Ok(ResetTarget::Values),
            "bounds" => Ok(ResetTarget::Bounds),
            "objective" => Ok(ResetTarget::Objective),
            "solution" => Ok(ResetTarget::Solution),
            "constraints" => Ok(ResetTarget::Constraints),
            "all" => Ok(ResetTarget::All),
            other => Err(format!("Unknown reset target '{}'", other)),
        }
    }
}

/// Outcome of solving a relaxation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxationStatus {
    /// Feasibility problem with a non-negative minimum eigenvalue
    Feasible,
    Infeasible,
    Optimal,
    Unbounded,
    MaxIterations,
    NumericalError,
}

impl fmt::Display for RelaxationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RelaxationStatus::Feasible => "feasible",
            RelaxationStatus::Infeasible => "infeasible",
            RelaxationStatus::Optimal => "optimal",
            RelaxationStatus::Unbounded => "unbounded",
            RelaxationStatus::MaxIterations => "max_iterations",
            RelaxationStatus::NumericalError => "numerical_error",
        };
        write!(f, "{}", text)
    }
}

/// Result of [`InflationSdp::solve`].
///
/// For feasibility problems `primal_objective` is the largest λ with `Γ − λI ⪰ 0`.
/// The certificate maps every known moment (and the identity) to its coefficient;
/// evaluated on the known values it reproduces `dual_objective`.
#[derive(Debug, Clone, Serialize)]
pub struct RelaxationSolution {
    pub status: RelaxationStatus,
    pub solver: String,
    pub primal_objective: f64,
    pub dual_objective: f64,
    pub objective_value: Option<f64>,
    pub iterations: usize,
    #[serde(skip)]
    pub certificate: BTreeMap<MonomialId, f64>,
    #[serde(skip)]
    pub moments: BTreeMap<MonomialId, f64>,
}

impl RelaxationSolution {
    fn inconsistent(solver: &str) -> Self {
        Self {
            status: RelaxationStatus::Infeasible,
            solver: solver.to_string(),
            primal_objective: f64::NAN,
            dual_objective: f64::NAN,
            objective_value: None,
            iterations: 0,
            certificate: BTreeMap::new(),
            moments: BTreeMap::new(),
        }
    }
}

/// Options for [`InflationSdp::solve`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOptions {
    /// Report λ itself instead of a feasible/infeasible verdict
    pub feas_as_optim: bool,
    pub feasibility_tolerance: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            feas_as_optim: false,
            feasibility_tolerance: DEFAULT_FEASIBILITY_TOLERANCE,
        }
    }
}

impl From<&SolverConfig> for SolveOptions {
    fn from(config: &SolverConfig) -> Self {
        Self {
            feas_as_optim: config.feas_as_optim,
            feasibility_tolerance: config.get_feasibility_tolerance(),
        }
    }
}

#[derive(Debug, Clone)]
struct Objective {
    /// Signed so that the solver always maximises
    terms: BTreeMap<MonomialId, f64>,
    direction: Direction,
}

/// NPA-style relaxation of an inflated scenario
#[derive(Debug, Clone)]
pub struct InflationSdp {
    problem: InflationProblem,
    algebra: OperatorAlgebra,
    measurements: Measurements,
    store: MonomialStore,
    moment_matrix: Option<MomentMatrix>,
    known: BTreeMap<MonomialId, f64>,
    semiknown: BTreeMap<MonomialId, (f64, MonomialId)>,
    use_lpi: bool,
    lower_bounds: BTreeMap<MonomialId, f64>,
    upper_bounds: BTreeMap<MonomialId, f64>,
    extra_equalities: Vec<BTreeMap<MonomialId, f64>>,
    extra_inequalities: Vec<BTreeMap<MonomialId, f64>>,
    objective: Option<Objective>,
    solution: Option<RelaxationSolution>,
}

impl InflationSdp {
    pub fn new(problem: &InflationProblem, commuting: bool) -> Self {
        let algebra = OperatorAlgebra::new(problem, commuting);
        Self {
            problem: problem.clone(),
            measurements: problem.measurements(),
            algebra,
            store: MonomialStore::new(),
            moment_matrix: None,
            known: [(ONE, 1.0)].into(),
            semiknown: BTreeMap::new(),
            use_lpi: false,
            lower_bounds: BTreeMap::new(),
            upper_bounds: BTreeMap::new(),
            extra_equalities: Vec::new(),
            extra_inequalities: Vec::new(),
            objective: None,
            solution: None,
        }
    }

    /// Build the generating set and moment matrix, clearing all previous state
    pub fn generate_relaxation(
        &mut self,
        spec: &ColumnSpec,
        max_monomial_length: usize,
    ) -> RelaxationResult<()> {
        let columns = build_columns(&self.algebra, spec, max_monomial_length)?;
        if columns.words.is_empty() {
            return Err(RelaxationError::InvalidColumnSpecification(format!(
                "{} produces no columns",
                spec
            )));
        }
        ColumnsGenerated {
            specification: &spec.to_string(),
            columns: columns.words.len(),
        }
        .log();

        let gamma = MomentMatrix::build(&self.algebra, &mut self.store, columns.words);
        self.moment_matrix = Some(gamma);
        self.reset(ResetTarget::All);
        Ok(())
    }

    /// Clear part of the state; `Values` also drops the LPI relations
    pub fn reset(&mut self, which: ResetTarget) {
        let all = which == ResetTarget::All;
        if all || which == ResetTarget::Values {
            self.known = [(ONE, 1.0)].into();
            self.semiknown.clear();
            self.use_lpi = false;
        }
        if all || which == ResetTarget::Bounds {
            self.lower_bounds = self.default_lower_bounds();
            self.upper_bounds.clear();
        }
        if all || which == ResetTarget::Objective {
            self.objective = None;
        }
        if all || which == ResetTarget::Constraints {
            self.extra_equalities.clear();
            self.extra_inequalities.clear();
        }
        self.solution = None;
    }

    /// Assemble and solve the SDP.
    ///
    /// Without an objective, or with `feas_as_optim`, this maximises λ subject to
    /// `Γ − λI ⪰ 0`. Inconsistent linear equalities give an `Infeasible` solution
    /// without calling the solver.
    pub fn solve(
        &mut self,
        solver: &dyn SdpSolver,
        options: &SolveOptions,
    ) -> RelaxationResult<&RelaxationSolution> {
        if self.objective.is_some() && options.feas_as_optim {
            ConfigurationWarning {
                reason: "an objective is set, feas_as_optim is ignored",
            }
            .log();
        }
        let feasibility = self.objective.is_none();

        let assembly = match self.assemble(feasibility) {
            Ok(assembly) => assembly,
            Err(RelaxationError::InconsistentConstraints) => {
                let solution = RelaxationSolution::inconsistent(solver.name());
                self.log_solution(&solution);
                return Ok(&*self.solution.insert(solution));
            }
            Err(e) => return Err(e),
        };

        let raw = solver.solve(&assembly.problem)?;
        let solution = self.interpret(&assembly, raw, solver.name(), options, feasibility)?;
        self.log_solution(&solution);
        Ok(&*self.solution.insert(solution))
    }

    fn log_solution(&self, solution: &RelaxationSolution) {
        RelaxationSolved {
            status: &solution.status.to_string(),
            primal_objective: solution.primal_objective,
        }
        .log();
    }

    fn interpret(
        &self,
        assembly: &assembly::Assembly,
        raw: SdpSolution,
        solver: &str,
        options: &SolveOptions,
        feasibility: bool,
    ) -> RelaxationResult<RelaxationSolution> {
        let certificate = if raw.has_iterate() {
            assembly.certificate(&raw.dual)
        } else {
            BTreeMap::new()
        };
        let moments = if raw.t.len() == assembly.problem.nr_variables() {
            assembly.moments(self.gamma()?, &raw.t)
        } else {
            BTreeMap::new()
        };

        let (status, primal_objective, dual_objective, objective_value) = if feasibility {
            let status = match raw.status {
                SolverStatus::Optimal if options.feas_as_optim => RelaxationStatus::Feasible,
                SolverStatus::Optimal if raw.primal_objective >= -options.feasibility_tolerance => {
                    RelaxationStatus::Feasible
                }
                SolverStatus::Optimal | SolverStatus::Infeasible => RelaxationStatus::Infeasible,
                SolverStatus::Unbounded => RelaxationStatus::Feasible,
                SolverStatus::MaxIterations => RelaxationStatus::MaxIterations,
                SolverStatus::NumericalError => RelaxationStatus::NumericalError,
            };
            (status, raw.primal_objective, raw.dual_objective, None)
        } else {
            let sign = self
                .objective
                .as_ref()
                .map_or(1.0, |objective| objective.direction.sign());
            let status = match raw.status {
                SolverStatus::Optimal => RelaxationStatus::Optimal,
                SolverStatus::Infeasible => RelaxationStatus::Infeasible,
                SolverStatus::Unbounded => RelaxationStatus::Unbounded,
                SolverStatus::MaxIterations => RelaxationStatus::MaxIterations,
                SolverStatus::NumericalError => RelaxationStatus::NumericalError,
            };
            let primal = sign * raw.primal_objective;
            let value = (status == RelaxationStatus::Optimal).then_some(primal);
            (status, primal, sign * raw.dual_objective, value)
        };

        Ok(RelaxationSolution {
            status,
            solver: solver.to_string(),
            primal_objective,
            dual_objective,
            objective_value,
            iterations: raw.iterations,
            certificate,
            moments,
        })
    }

    fn gamma(&self) -> RelaxationResult<&MomentMatrix> {
        self.moment_matrix.as_ref().ok_or(RelaxationError::NotGenerated)
    }

    pub fn problem(&self) -> &InflationProblem {
        &self.problem
    }

    pub fn algebra(&self) -> &OperatorAlgebra {
        &self.algebra
    }

    pub fn store(&self) -> &MonomialStore {
        &self.store
    }

    /// Measurement operators `[party][copy][setting][outcome]`
    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    pub fn is_commuting(&self) -> bool {
        self.algebra.is_commuting()
    }

    pub fn moment_matrix(&self) -> RelaxationResult<&MomentMatrix> {
        self.gamma()
    }

    /// Column names, `1` for the identity
    pub fn generating_monomials(&self) -> RelaxationResult<Vec<String>> {
        Ok(self
            .gamma()?
            .columns()
            .iter()
            .map(|column| self.algebra.word_name(column))
            .collect())
    }

    /// Every moment of the matrix except zero, by compact index
    pub fn monomials(&self) -> RelaxationResult<Vec<MonomialEntry>> {
        let gamma = self.gamma()?;
        Ok(gamma
            .monomials()
            .iter()
            .enumerate()
            .skip(ONE_INDEX)
            .map(|(index, &id)| MonomialEntry::new(index, self.store.compound(id)))
            .collect())
    }

    fn count_knowability(&self, knowability: Knowability) -> RelaxationResult<usize> {
        let gamma = self.gamma()?;
        Ok(gamma.monomials()[ONE_INDEX..]
            .iter()
            .filter(|&&id| self.store.compound(id).knowability == knowability)
            .count())
    }

    pub fn n_knowable(&self) -> RelaxationResult<usize> {
        self.count_knowability(Knowability::Yes)
    }

    pub fn n_semiknowable(&self) -> RelaxationResult<usize> {
        self.count_knowability(Knowability::Semi)
    }

    pub fn n_unknowable(&self) -> RelaxationResult<usize> {
        self.count_knowability(Knowability::No)
    }

    /// Column permutations applied while building the moment matrix
    pub fn inflation_symmetries(&self) -> RelaxationResult<&[Vec<usize>]> {
        Ok(self.gamma()?.symmetries())
    }

    pub fn lexicographic_order(&self) -> Vec<(String, usize)> {
        self.algebra.lexicographic_order()
    }

    pub fn commutation_relationships(&self) -> Vec<(String, String)> {
        self.algebra.commutation_relationships()
    }

    pub fn solution(&self) -> RelaxationResult<&RelaxationSolution> {
        self.solution.as_ref().ok_or(RelaxationError::NotSolved)
    }

    fn names_of(&self, values: &BTreeMap<MonomialId, f64>) -> BTreeMap<String, f64> {
        values
            .iter()
            .map(|(&id, &v)| (self.store.compound(id).name.clone(), v))
            .collect()
    }

    /// Known moments by name, the identity included
    pub fn known_values(&self) -> BTreeMap<String, f64> {
        self.names_of(&self.known)
    }

    /// Semiknown moments by name as `(factor, unknown part)`
    pub fn semiknown_values(&self) -> BTreeMap<String, (f64, String)> {
        self.semiknown
            .iter()
            .map(|(&id, &(factor, unknown))| {
                (
                    self.store.compound(id).name.clone(),
                    (factor, self.store.compound(unknown).name.clone()),
                )
            })
            .collect()
    }

    pub fn lower_bounds(&self) -> BTreeMap<String, f64> {
        self.names_of(&self.lower_bounds)
    }

    pub fn upper_bounds(&self) -> BTreeMap<String, f64> {
        self.names_of(&self.upper_bounds)
    }
}

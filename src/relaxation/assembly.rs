// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Affine elimination of fixed moments and assembly of the block SDP.
//!
//! Every moment is written as `Σ aⱼ·tⱼ + Σ gₚ·vₚ`, where `t` are the free SDP
//! variables and `v` the parameters: the identity followed by every known moment.
//! Keeping the parameters symbolic until the end lets the dual matrix be turned
//! into a certificate that is linear in the known values.

use nalgebra::DMatrix;
use std::collections::{BTreeMap, HashMap};

use super::moment_matrix::{MomentMatrix, ONE_INDEX, ZERO_INDEX};
use super::InflationSdp;
use crate::algebra::{MonomialId, ONE, ZERO};
use crate::errors::{RelaxationError, RelaxationResult};
use crate::observability::messages::relaxation::{ConstantConstraintViolated, SdpAssembled};
use crate::observability::messages::StructuredLog;
use crate::sdp::{Block, SdpProblem, SparseBlockMatrix};

/// Pivots smaller than this are treated as zero during elimination
const PIVOT_TOLERANCE: f64 = 1e-10;
/// Residual of a reduced equation above which the equations contradict each other
const CONSISTENCY_TOLERANCE: f64 = 1e-8;

const MOMENT_BLOCK: usize = 0;
const LINEAR_BLOCK: usize = 1;

/// `linear · t + constant · v`
#[derive(Debug, Clone, PartialEq)]
struct Affine {
    linear: Vec<f64>,
    constant: Vec<f64>,
}

impl Affine {
    fn zero(nr_free: usize, nr_parameters: usize) -> Self {
        Self {
            linear: vec![0.0; nr_free],
            constant: vec![0.0; nr_parameters],
        }
    }

    fn add_scaled(&mut self, other: &Affine, scale: f64) {
        for (a, b) in self.linear.iter_mut().zip(&other.linear) {
            *a += scale * b;
        }
        for (a, b) in self.constant.iter_mut().zip(&other.constant) {
            *a += scale * b;
        }
    }

    fn is_constant(&self) -> bool {
        self.linear.iter().all(|a| a.abs() <= PIVOT_TOLERANCE)
    }

    fn evaluate_constant(&self, parameters: &[f64]) -> f64 {
        self.constant.iter().zip(parameters).map(|(g, v)| g * v).sum()
    }

    fn evaluate(&self, t: &[f64], parameters: &[f64]) -> f64 {
        self.linear.iter().zip(t).map(|(a, t)| a * t).sum::<f64>() + self.evaluate_constant(parameters)
    }
}

/// An assembled SDP together with what is needed to read its solution back
#[derive(Debug, Clone)]
pub(super) struct Assembly {
    pub problem: SdpProblem,
    /// Moment of every parameter; the identity comes first
    parameters: Vec<MonomialId>,
    values: Vec<f64>,
    /// Expression of every compact index of the moment matrix
    expressions: Vec<Affine>,
    /// `F0 = Σ vₚ · parameter_matrices[p]`
    parameter_matrices: Vec<SparseBlockMatrix>,
    /// Objective offset per parameter
    objective_parameters: Vec<f64>,
    nr_free: usize,
}

/// Linear system over `[unknown moments | parameters]`
struct Elimination {
    nr_unknown: usize,
    rows: Vec<Vec<f64>>,
}

impl Elimination {
    /// Reduced row echelon form; returns the pivot column of every leading row
    fn reduce(&mut self, parameter_values: &[f64]) -> RelaxationResult<Vec<usize>> {
        let mut pivots = Vec::new();
        let mut rank = 0;
        for col in 0..self.nr_unknown {
            if rank == self.rows.len() {
                break;
            }
            let (best, magnitude) = (rank..self.rows.len())
                .map(|r| (r, self.rows[r][col].abs()))
                .fold((rank, 0.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
            if magnitude <= PIVOT_TOLERANCE {
                continue;
            }
            self.rows.swap(rank, best);
            let pivot = self.rows[rank][col];
            for value in self.rows[rank].iter_mut() {
                *value /= pivot;
            }
            for r in 0..self.rows.len() {
                if r == rank {
                    continue;
                }
                let factor = self.rows[r][col];
                if factor.abs() <= f64::EPSILON {
                    continue;
                }
                for c in 0..self.rows[r].len() {
                    self.rows[r][c] -= factor * self.rows[rank][c];
                }
            }
            pivots.push(col);
            rank += 1;
        }

        for row in &self.rows[rank..] {
            let residual: f64 = row[self.nr_unknown..]
                .iter()
                .zip(parameter_values)
                .map(|(g, v)| g * v)
                .sum();
            if residual.abs() > CONSISTENCY_TOLERANCE {
                return Err(RelaxationError::InconsistentConstraints);
            }
        }
        Ok(pivots)
    }
}

impl InflationSdp {
    /// The SDP `solve` would hand to a solver
    pub fn sdp_problem(&self) -> RelaxationResult<SdpProblem> {
        Ok(self.assemble(self.objective.is_none())?.problem)
    }

    pub(super) fn assemble(&self, feasibility: bool) -> RelaxationResult<Assembly> {
        let gamma = self.gamma()?;

        let mut parameters = vec![ONE];
        let mut values = vec![1.0];
        for (&monomial, &value) in &self.known {
            if monomial != ONE && monomial != ZERO {
                parameters.push(monomial);
                values.push(value);
            }
        }
        let parameter_of: HashMap<MonomialId, usize> =
            parameters.iter().enumerate().map(|(p, &m)| (m, p)).collect();
        let nr_parameters = parameters.len();

        // Unknown moments of the matrix, by compact index
        let mut unknown_of: HashMap<MonomialId, usize> = HashMap::new();
        let mut unknown_index = Vec::new();
        for (index, &monomial) in gamma.monomials().iter().enumerate().skip(2) {
            if !parameter_of.contains_key(&monomial) {
                unknown_of.insert(monomial, unknown_index.len());
                unknown_index.push(index);
            }
        }
        let nr_unknown = unknown_index.len();

        // Row over [unknowns | parameters] for one moment
        let row_of = |monomial: MonomialId| -> RelaxationResult<Vec<f64>> {
            let mut row = vec![0.0; nr_unknown + nr_parameters];
            if monomial == ZERO {
                return Ok(row);
            }
            if let Some(&p) = parameter_of.get(&monomial) {
                row[nr_unknown + p] = 1.0;
            } else if let Some(&u) = unknown_of.get(&monomial) {
                row[u] = 1.0;
            } else {
                return Err(RelaxationError::UnknownMonomial(
                    self.store.compound(monomial).name.clone(),
                ));
            }
            Ok(row)
        };
        let combine = |terms: &BTreeMap<MonomialId, f64>| -> RelaxationResult<Vec<f64>> {
            let mut row = vec![0.0; nr_unknown + nr_parameters];
            for (&monomial, &coefficient) in terms {
                for (r, v) in row.iter_mut().zip(row_of(monomial)?) {
                    *r += coefficient * v;
                }
            }
            Ok(row)
        };

        let mut equations = Vec::new();
        for (&monomial, &(factor, unknown)) in &self.semiknown {
            if unknown_of.contains_key(&monomial) {
                let terms: BTreeMap<MonomialId, f64> = if monomial == unknown {
                    [(monomial, 1.0 - factor)].into()
                } else {
                    [(monomial, 1.0), (unknown, -factor)].into()
                };
                equations.push(combine(&terms)?);
            }
        }
        for equality in &self.extra_equalities {
            equations.push(combine(equality)?);
        }

        let mut elimination = Elimination {
            nr_unknown,
            rows: equations,
        };
        let pivots = elimination.reduce(&values)?;
        let pivot_row: HashMap<usize, usize> =
            pivots.iter().enumerate().map(|(r, &c)| (c, r)).collect();
        let free: Vec<usize> = (0..nr_unknown).filter(|c| !pivot_row.contains_key(c)).collect();
        let free_position: HashMap<usize, usize> =
            free.iter().enumerate().map(|(j, &c)| (c, j)).collect();
        let nr_free = free.len();

        // Expression of every unknown moment in terms of the free ones
        let unknown_expression = |u: usize| -> Affine {
            let mut expr = Affine::zero(nr_free, nr_parameters);
            if let Some(&j) = free_position.get(&u) {
                expr.linear[j] = 1.0;
                return expr;
            }
            let row = &elimination.rows[pivot_row[&u]];
            for (&c, &j) in &free_position {
                expr.linear[j] = -row[c];
            }
            for p in 0..nr_parameters {
                expr.constant[p] = -row[nr_unknown + p];
            }
            expr
        };

        let mut expressions = vec![Affine::zero(nr_free, nr_parameters); gamma.monomials().len()];
        expressions[ONE_INDEX].constant[0] = 1.0;
        for (index, &monomial) in gamma.monomials().iter().enumerate().skip(2) {
            expressions[index] = match parameter_of.get(&monomial) {
                Some(&p) => {
                    let mut expr = Affine::zero(nr_free, nr_parameters);
                    expr.constant[p] = 1.0;
                    expr
                }
                None => unknown_expression(unknown_of[&monomial]),
            };
        }
        let expression_of = |monomial: MonomialId| -> RelaxationResult<Affine> {
            if monomial == ZERO {
                return Ok(Affine::zero(nr_free, nr_parameters));
            }
            if let Some(index) = gamma.index_of(monomial) {
                return Ok(expressions[index].clone());
            }
            match parameter_of.get(&monomial) {
                Some(&p) => {
                    let mut expr = Affine::zero(nr_free, nr_parameters);
                    expr.constant[p] = 1.0;
                    Ok(expr)
                }
                None => Err(RelaxationError::UnknownMonomial(
                    self.store.compound(monomial).name.clone(),
                )),
            }
        };
        let expression_of_terms = |terms: &BTreeMap<MonomialId, f64>| -> RelaxationResult<Affine> {
            let mut expr = Affine::zero(nr_free, nr_parameters);
            for (&monomial, &coefficient) in terms {
                expr.add_scaled(&expression_of(monomial)?, coefficient);
            }
            Ok(expr)
        };

        let mut linear_rows: Vec<(String, Affine)> = Vec::new();
        for (&monomial, &bound) in &self.lower_bounds {
            let mut expr = expression_of(monomial)?;
            expr.constant[0] -= bound;
            linear_rows.push((format!("{} >= {}", self.store.compound(monomial).name, bound), expr));
        }
        for (&monomial, &bound) in &self.upper_bounds {
            let mut expr = Affine::zero(nr_free, nr_parameters);
            expr.add_scaled(&expression_of(monomial)?, -1.0);
            expr.constant[0] += bound;
            linear_rows.push((format!("{} <= {}", self.store.compound(monomial).name, bound), expr));
        }
        for (k, inequality) in self.extra_inequalities.iter().enumerate() {
            linear_rows.push((format!("extra inequality {}", k), expression_of_terms(inequality)?));
        }
        let linear_rows: Vec<Affine> = linear_rows
            .into_iter()
            .filter_map(|(label, expr)| {
                if !expr.is_constant() {
                    return Some(expr);
                }
                let value = expr.evaluate_constant(&values);
                if value < -CONSISTENCY_TOLERANCE {
                    ConstantConstraintViolated {
                        constraint: &label,
                        value,
                    }
                    .log();
                }
                None
            })
            .collect();

        let size = gamma.size();
        let mut blocks = vec![Block::Psd(size)];
        if !linear_rows.is_empty() {
            blocks.push(Block::Diagonal(linear_rows.len()));
        }
        let nr_variables = nr_free + usize::from(feasibility);
        let mut matrices = vec![SparseBlockMatrix::new(); nr_variables];
        let mut parameter_matrices = vec![SparseBlockMatrix::new(); nr_parameters];

        let mut place = |block: usize, i: usize, j: usize, expr: &Affine| {
            for (j_free, &a) in expr.linear.iter().enumerate() {
                if a.abs() > PIVOT_TOLERANCE {
                    matrices[j_free].add(block, i, j, a);
                }
            }
            for (p, &g) in expr.constant.iter().enumerate() {
                if g != 0.0 {
                    parameter_matrices[p].add(block, i, j, g);
                }
            }
        };
        let matrix = gamma.matrix();
        for i in 0..size {
            for j in i..size {
                let index = matrix[[i, j]];
                if index != ZERO_INDEX {
                    place(MOMENT_BLOCK, i, j, &expressions[index]);
                }
            }
        }
        for (r, expr) in linear_rows.iter().enumerate() {
            place(LINEAR_BLOCK, r, r, expr);
        }

        let mut variable_names: Vec<String> = free
            .iter()
            .map(|&u| self.store.compound(gamma.monomials()[unknown_index[u]]).name.clone())
            .collect();

        let (objective, offset, objective_parameters) = if feasibility {
            let lambda = nr_free;
            for i in 0..size {
                matrices[lambda].add(MOMENT_BLOCK, i, i, -1.0);
            }
            variable_names.push("lambda".to_string());
            let mut b = vec![0.0; nr_variables];
            b[lambda] = 1.0;
            (b, 0.0, vec![0.0; nr_parameters])
        } else {
            let terms = self
                .objective
                .as_ref()
                .map(|objective| objective.terms.clone())
                .unwrap_or_default();
            let expr = expression_of_terms(&terms)?;
            let offset = expr.evaluate_constant(&values);
            (expr.linear, offset, expr.constant)
        };

        let mut constant = SparseBlockMatrix::new();
        for (matrix, &value) in parameter_matrices.iter().zip(&values) {
            for (b, i, j, g) in matrix.iter() {
                constant.add(b, i, j, g * value);
            }
        }

        SdpAssembled {
            free_variables: nr_free,
            eliminated: pivots.len(),
            linear_rows: linear_rows.len(),
            feasibility,
        }
        .log();

        Ok(Assembly {
            problem: SdpProblem {
                blocks,
                constant,
                matrices,
                objective,
                offset,
                variable_names,
            },
            parameters,
            values,
            expressions,
            parameter_matrices,
            objective_parameters,
            nr_free,
        })
    }
}

impl Assembly {
    /// Coefficient of every parameter in the dual bound `⟨F0, X⟩ + offset`
    pub fn certificate(&self, dual: &[DMatrix<f64>]) -> BTreeMap<MonomialId, f64> {
        self.parameters
            .iter()
            .zip(self.parameter_matrices.iter().zip(&self.objective_parameters))
            .map(|(&monomial, (matrix, &objective))| (monomial, matrix.inner(dual) + objective))
            .collect()
    }

    /// Value of every moment of the matrix at a primal point
    pub fn moments(&self, gamma: &MomentMatrix, t: &[f64]) -> BTreeMap<MonomialId, f64> {
        let free = &t[..self.nr_free.min(t.len())];
        gamma
            .monomials()
            .iter()
            .zip(&self.expressions)
            .skip(ONE_INDEX)
            .map(|(&monomial, expr)| (monomial, expr.evaluate(free, &self.values)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relaxation::{BoundKind, ColumnSpec, Direction};
    use crate::scenario::{Distribution, InflationProblem};

    fn chsh() -> InflationSdp {
        let problem =
            InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2, 2], &[2, 2], &[1]).unwrap();
        let mut sdp = InflationSdp::new(&problem, false);
        sdp.generate_relaxation(&ColumnSpec::Npa(1), 0).unwrap();
        sdp
    }

    #[test]
    fn test_feasibility_problem_shape() {
        let sdp = chsh();
        let problem = sdp.sdp_problem().unwrap();
        // 10 moments besides the identity, plus lambda
        assert_eq!(problem.nr_variables(), 11);
        assert_eq!(problem.blocks[0], Block::Psd(5));
        assert_eq!(problem.variable_names.last().unwrap(), "lambda");
        assert_eq!(problem.objective.iter().sum::<f64>(), 1.0);
        // identity corner is a constant
        let f0 = problem.constant.to_dense(&problem.blocks);
        assert_eq!(f0[0][(0, 0)], 1.0);
    }

    #[test]
    fn test_known_values_are_eliminated() {
        let mut sdp = chsh();
        let dist = Distribution::uniform(sdp.problem());
        sdp.set_distribution(&dist, false, false).unwrap();
        let problem = sdp.sdp_problem().unwrap();
        // only the two unknowable moments and lambda stay free
        assert_eq!(problem.nr_variables(), 3);
        // all lower bounds are on known moments and disappear
        assert_eq!(problem.blocks.len(), 1);
    }

    #[test]
    fn test_equalities_remove_variables() {
        let mut sdp = chsh();
        let mut equality = BTreeMap::new();
        equality.insert("A_1_0_0".to_string(), 1.0);
        equality.insert("B_1_0_0".to_string(), -1.0);
        sdp.set_extra_equalities(&[equality]).unwrap();
        assert_eq!(sdp.sdp_problem().unwrap().nr_variables(), 10);
    }

    #[test]
    fn test_inconsistent_equalities() {
        let mut sdp = chsh();
        let mut values = BTreeMap::new();
        values.insert("A_1_0_0".to_string(), 0.5);
        sdp.set_values(&values, false, false, true).unwrap();
        let mut equality = BTreeMap::new();
        equality.insert("A_1_0_0".to_string(), 1.0);
        equality.insert("1".to_string(), -0.25);
        sdp.set_extra_equalities(&[equality]).unwrap();
        assert!(matches!(
            sdp.sdp_problem(),
            Err(RelaxationError::InconsistentConstraints)
        ));
    }

    #[test]
    fn test_bounds_become_linear_rows() {
        let mut sdp = chsh();
        let mut upper = BTreeMap::new();
        upper.insert("A_1_0_0".to_string(), 0.75);
        sdp.set_bounds(&upper, BoundKind::Upper).unwrap();
        let problem = sdp.sdp_problem().unwrap();
        let physical = sdp.lower_bounds().len();
        assert_eq!(problem.blocks[1], Block::Diagonal(physical + 1));
    }

    #[test]
    fn test_objective_offset_uses_known_values() {
        let mut sdp = chsh();
        let dist = Distribution::uniform(sdp.problem());
        sdp.set_distribution(&dist, false, false).unwrap();
        sdp.set_objective_str("1 + A_1_0_0 + A_1_0_0*A_1_1_0", Direction::Max)
            .unwrap();
        let problem = sdp.sdp_problem().unwrap();
        assert_eq!(problem.nr_variables(), 2);
        assert!((problem.offset - 1.5).abs() < 1e-12);
        assert_eq!(problem.objective.iter().filter(|&&b| b == 1.0).count(), 1);
    }
}

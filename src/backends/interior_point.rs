// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dense primal-dual interior-point method.
//!
//! The problem `max bᵀt s.t. F0 + Σ tⱼFⱼ ⪰ 0` is treated as the dual of the
//! standard-form pair
//!
//! ```text
//! (P) min ⟨C, X⟩  s.t. ⟨Aⱼ, X⟩ = bⱼ, X ⪰ 0
//! (D) max bᵀy     s.t. Z = C − Σ yⱼAⱼ ⪰ 0
//! ```
//!
//! with `C = F0` and `Aⱼ = −Fⱼ`. Iterates follow the HKM search direction with a
//! Mehrotra predictor-corrector and may start infeasible.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn, SymmetricEigen, LU};
use std::time::Instant;

use crate::config::consts::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use crate::errors::SolverError;
use crate::observability::messages::solver::{
    IterationCompleted, NumericalBreakdown, SolveFinished, SolveStarted,
};
use crate::observability::messages::StructuredLog;
use crate::sdp::{Block, SdpProblem, SdpSolution, SolverStatus, SparseBlockMatrix};
use crate::traits::SdpSolver;

const STEP_FACTOR: f64 = 0.95;
const DIVERGENCE_THRESHOLD: f64 = 1e8;
const FALLBACK_ACCURACY: f64 = 1e-6;

type Blocks = Vec<DMatrix<f64>>;

pub struct InteriorPointSolver {
    tolerance: f64,
    max_iterations: usize,
}

impl Default for InteriorPointSolver {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_MAX_ITERATIONS)
    }
}

impl InteriorPointSolver {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

enum SchurFactor {
    Cholesky(Cholesky<f64, Dyn>),
    Lu(LU<f64, Dyn, Dyn>),
}

impl SchurFactor {
    fn new(matrix: DMatrix<f64>) -> Self {
        match Cholesky::new(matrix.clone()) {
            Some(chol) => SchurFactor::Cholesky(chol),
            None => SchurFactor::Lu(matrix.lu()),
        }
    }

    fn solve(&self, rhs: &DVector<f64>) -> Option<DVector<f64>> {
        match self {
            SchurFactor::Cholesky(chol) => Some(chol.solve(rhs)),
            SchurFactor::Lu(lu) => lu.solve(rhs),
        }
    }
}

struct Residuals {
    rp: DVector<f64>,
    rd: Blocks,
    primal_objective: f64,
    dual_objective: f64,
    relative_gap: f64,
    primal_infeasibility: f64,
    dual_infeasibility: f64,
}

impl Residuals {
    fn worst(&self) -> f64 {
        self.relative_gap
            .max(self.primal_infeasibility)
            .max(self.dual_infeasibility)
    }
}

struct Direction {
    dx: Blocks,
    dy: DVector<f64>,
    dz: Blocks,
}

/// Standard-form data shared by every iteration
struct StandardForm<'a> {
    structure: &'a [Block],
    c_sparse: &'a SparseBlockMatrix,
    c: Blocks,
    a: Vec<SparseBlockMatrix>,
    b: DVector<f64>,
    norm_b: f64,
    norm_c: f64,
    dimension: f64,
}

impl<'a> StandardForm<'a> {
    fn new(problem: &'a SdpProblem) -> Self {
        let a: Vec<SparseBlockMatrix> = problem
            .matrices
            .iter()
            .map(|f| {
                let mut negated = SparseBlockMatrix::new();
                for (blk, i, j, v) in f.iter() {
                    negated.add(blk, i, j, -v);
                }
                negated
            })
            .collect();
        let b = DVector::from_column_slice(&problem.objective);
        Self {
            structure: &problem.blocks,
            c_sparse: &problem.constant,
            c: problem.constant.to_dense(&problem.blocks),
            norm_b: b.norm(),
            norm_c: problem.constant.frobenius_norm(),
            a,
            b,
            dimension: problem.dimension() as f64,
        }
    }

    fn m(&self) -> usize {
        self.a.len()
    }

    /// `Σ yⱼAⱼ` as dense blocks
    fn combine(&self, y: &DVector<f64>) -> Blocks {
        let mut out = zeros_like(&self.c);
        for (aj, &yj) in self.a.iter().zip(y.iter()) {
            for (blk, i, j, v) in aj.iter() {
                out[blk][(i, j)] += yj * v;
                if i != j {
                    out[blk][(j, i)] += yj * v;
                }
            }
        }
        out
    }

    fn residuals(&self, x: &Blocks, y: &DVector<f64>, z: &Blocks) -> Residuals {
        let rp = DVector::from_iterator(
            self.m(),
            self.a.iter().zip(self.b.iter()).map(|(aj, bj)| bj - aj.inner(x)),
        );
        let ay = self.combine(y);
        let rd: Blocks = self
            .c
            .iter()
            .zip(&ay)
            .zip(z)
            .map(|((c, ay), z)| c - ay - z)
            .collect();
        let primal_objective = self.c_sparse.inner(x);
        let dual_objective = self.b.dot(y);
        Residuals {
            primal_infeasibility: rp.norm() / (1.0 + self.norm_b),
            dual_infeasibility: frobenius(&rd) / (1.0 + self.norm_c),
            relative_gap: (primal_objective - dual_objective).abs()
                / (1.0 + primal_objective.abs() + dual_objective.abs()),
            rp,
            rd,
            primal_objective,
            dual_objective,
        }
    }

    /// `Mᵢⱼ = ⟨Aᵢ, X Aⱼ Z⁻¹⟩`
    fn schur(&self, x: &Blocks, zinv: &Blocks) -> DMatrix<f64> {
        let m = self.m();
        let mut schur = DMatrix::zeros(m, m);
        for (j, aj) in self.a.iter().enumerate() {
            let mut g = zeros_like(x);
            for (blk, p, q, v) in aj.iter() {
                g[blk].ger(v, &x[blk].column(p), &zinv[blk].column(q), 1.0);
                if p != q {
                    g[blk].ger(v, &x[blk].column(q), &zinv[blk].column(p), 1.0);
                }
            }
            for (i, ai) in self.a.iter().enumerate() {
                schur[(i, j)] = ai.inner(&g);
            }
        }
        (&schur + schur.transpose()) * 0.5
    }

    /// Solve the HKM Newton system for the target `X + ΔX ≈ K`
    fn direction(
        &self,
        factor: &SchurFactor,
        res: &Residuals,
        x: &Blocks,
        zinv: &Blocks,
        k: &Blocks,
    ) -> Option<Direction> {
        let w: Blocks = k
            .iter()
            .zip(x)
            .zip(&res.rd)
            .zip(zinv)
            .map(|(((k, x), rd), zinv)| k - x * rd * zinv)
            .collect();
        let rhs = DVector::from_iterator(
            self.m(),
            self.a.iter().zip(res.rp.iter()).map(|(ai, rp)| rp - ai.inner(&w)),
        );
        let dy = factor.solve(&rhs)?;
        let ady = self.combine(&dy);
        let dz: Blocks = res.rd.iter().zip(&ady).map(|(rd, ady)| rd - ady).collect();
        let dx: Blocks = k
            .iter()
            .zip(x)
            .zip(&dz)
            .zip(zinv)
            .map(|(((k, x), dz), zinv)| symmetrize(&(k - x * dz * zinv)))
            .collect();
        Some(Direction { dx, dy, dz })
    }
}

fn zeros_like(blocks: &Blocks) -> Blocks {
    blocks
        .iter()
        .map(|b| DMatrix::zeros(b.nrows(), b.ncols()))
        .collect()
}

fn identity(structure: &[Block], scale: f64) -> Blocks {
    structure
        .iter()
        .map(|b| DMatrix::identity(b.size(), b.size()) * scale)
        .collect()
}

fn frobenius(blocks: &Blocks) -> f64 {
    blocks.iter().map(|b| b.norm_squared()).sum::<f64>().sqrt()
}

fn inner(a: &Blocks, b: &Blocks) -> f64 {
    a.iter().zip(b).map(|(a, b)| a.dot(b)).sum()
}

fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

fn step(current: &Blocks, delta: &Blocks, alpha: f64) -> Blocks {
    current.iter().zip(delta).map(|(c, d)| c + d * alpha).collect()
}

fn factorize(blocks: &Blocks) -> Option<Vec<Cholesky<f64, Dyn>>> {
    blocks.iter().map(|b| Cholesky::new(b.clone())).collect()
}

/// Largest step keeping `M + α ΔM` positive definite, damped and capped at 1
fn step_length(factors: &[Cholesky<f64, Dyn>], delta: &Blocks) -> Option<f64> {
    let mut alpha = f64::INFINITY;
    for (chol, d) in factors.iter().zip(delta) {
        if d.nrows() == 0 {
            continue;
        }
        let l = chol.l();
        let half = l.solve_lower_triangular(d)?;
        let scaled = l.solve_lower_triangular(&half.transpose())?;
        let lambda = SymmetricEigen::new(symmetrize(&scaled)).eigenvalues.min();
        if lambda < 0.0 {
            alpha = alpha.min(-1.0 / lambda);
        }
    }
    Some((STEP_FACTOR * alpha).min(1.0))
}

impl InteriorPointSolver {
    /// A problem without free variables is feasible iff `F0 ⪰ 0`
    fn solve_constant(&self, problem: &SdpProblem) -> SdpSolution {
        let dense = problem.constant.to_dense(&problem.blocks);
        let min_eigenvalue = dense
            .iter()
            .filter(|b| b.nrows() > 0)
            .map(|b| SymmetricEigen::new(b.clone()).eigenvalues.min())
            .fold(f64::INFINITY, f64::min);
        let mut solution = if min_eigenvalue >= -self.tolerance {
            SdpSolution::with_status(SolverStatus::Optimal)
        } else {
            SdpSolution::with_status(SolverStatus::Infeasible)
        };
        solution.primal_objective = problem.offset;
        solution.dual_objective = problem.offset;
        solution
    }

    fn finish(
        &self,
        status: SolverStatus,
        problem: &SdpProblem,
        res: &Residuals,
        x: Blocks,
        y: &DVector<f64>,
        iterations: usize,
    ) -> SdpSolution {
        SdpSolution {
            status,
            primal_objective: res.dual_objective + problem.offset,
            dual_objective: res.primal_objective + problem.offset,
            t: y.iter().copied().collect(),
            dual: x,
            iterations,
        }
    }

    fn iterate(&self, problem: &SdpProblem) -> SdpSolution {
        let form = StandardForm::new(problem);
        let n = form.dimension.max(1.0);

        let norm_a = form
            .a
            .iter()
            .map(SparseBlockMatrix::frobenius_norm)
            .fold(0.0, f64::max);
        let xi = form
            .a
            .iter()
            .zip(form.b.iter())
            .map(|(aj, bj)| (1.0 + bj.abs()) / (1.0 + aj.frobenius_norm()))
            .fold(10f64.max(n.sqrt()), f64::max);
        let eta = 10f64.max(n.sqrt()).max(form.norm_c).max(norm_a);

        let mut x = identity(form.structure, xi);
        let mut z = identity(form.structure, eta);
        let mut y = DVector::zeros(form.m());

        let mut res = form.residuals(&x, &y, &z);
        for iteration in 0..self.max_iterations {
            IterationCompleted {
                iteration,
                primal_objective: res.primal_objective,
                dual_objective: res.dual_objective,
                relative_gap: res.relative_gap,
                primal_infeasibility: res.primal_infeasibility,
                dual_infeasibility: res.dual_infeasibility,
            }
            .log();

            if res.worst() < self.tolerance {
                return self.finish(SolverStatus::Optimal, problem, &res, x, &y, iteration);
            }
            if res.dual_objective > DIVERGENCE_THRESHOLD {
                return self.finish(SolverStatus::Unbounded, problem, &res, x, &y, iteration);
            }
            if res.primal_objective < -DIVERGENCE_THRESHOLD {
                return self.finish(SolverStatus::Infeasible, problem, &res, x, &y, iteration);
            }

            let breakdown = |reason: &str, x: Blocks, res: &Residuals| {
                NumericalBreakdown { iteration, reason }.log();
                let status = if res.worst() < FALLBACK_ACCURACY {
                    SolverStatus::Optimal
                } else {
                    SolverStatus::NumericalError
                };
                self.finish(status, problem, res, x, &y, iteration)
            };

            let (Some(chol_x), Some(chol_z)) = (factorize(&x), factorize(&z)) else {
                return breakdown("iterate lost positive definiteness", x, &res);
            };
            let zinv: Blocks = chol_z.iter().map(|c| c.inverse()).collect();
            let mu = inner(&x, &z) / n;

            let factor = SchurFactor::new(form.schur(&x, &zinv));

            let predictor_target: Blocks = x.iter().map(|x| -x).collect();
            let Some(affine) = form.direction(&factor, &res, &x, &zinv, &predictor_target) else {
                return breakdown("singular Schur complement", x, &res);
            };
            let (Some(ap), Some(ad)) = (
                step_length(&chol_x, &affine.dx),
                step_length(&chol_z, &affine.dz),
            ) else {
                return breakdown("step length computation failed", x, &res);
            };
            let mu_affine = inner(&step(&x, &affine.dx, ap), &step(&z, &affine.dz, ad)) / n;
            let sigma = (mu_affine / mu).powi(3).clamp(0.0, 1.0);

            let corrector_target: Blocks = x
                .iter()
                .zip(&zinv)
                .zip(affine.dx.iter().zip(&affine.dz))
                .map(|((x, zinv), (dx, dz))| zinv * (sigma * mu) - x - dx * dz * zinv)
                .collect();
            let Some(dir) = form.direction(&factor, &res, &x, &zinv, &corrector_target) else {
                return breakdown("singular Schur complement", x, &res);
            };
            let (Some(ap), Some(ad)) = (
                step_length(&chol_x, &dir.dx),
                step_length(&chol_z, &dir.dz),
            ) else {
                return breakdown("step length computation failed", x, &res);
            };

            x = step(&x, &dir.dx, ap);
            z = step(&z, &dir.dz, ad);
            y += &dir.dy * ad;
            res = form.residuals(&x, &y, &z);
        }

        let status = if res.worst() < self.tolerance {
            SolverStatus::Optimal
        } else {
            SolverStatus::MaxIterations
        };
        self.finish(status, problem, &res, x, &y, self.max_iterations)
    }
}

impl SdpSolver for InteriorPointSolver {
    fn solve(&self, problem: &SdpProblem) -> Result<SdpSolution, SolverError> {
        SolveStarted {
            solver: self.name(),
            variables: problem.nr_variables(),
            dimension: problem.dimension(),
        }
        .log();
        let started = Instant::now();

        let solution = if problem.nr_variables() == 0 {
            self.solve_constant(problem)
        } else {
            self.iterate(problem)
        };

        SolveFinished {
            solver: self.name(),
            status: &solution.status.to_string(),
            iterations: solution.iterations,
            duration: started.elapsed(),
        }
        .log();
        Ok(solution)
    }

    fn name(&self) -> &'static str {
        "interior_point"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(blocks: Vec<Block>, constant: &[(usize, usize, usize, f64)], matrices: &[&[(usize, usize, usize, f64)]], objective: Vec<f64>) -> SdpProblem {
        let build = |entries: &[(usize, usize, usize, f64)]| {
            let mut m = SparseBlockMatrix::new();
            for &(b, i, j, v) in entries {
                m.add(b, i, j, v);
            }
            m
        };
        SdpProblem {
            blocks,
            constant: build(constant),
            matrices: matrices.iter().map(|m| build(m)).collect(),
            variable_names: (0..objective.len()).map(|j| format!("t{}", j)).collect(),
            objective,
            offset: 0.0,
        }
    }

    #[test]
    fn test_off_diagonal_bound() {
        // max t s.t. [[1, t], [t, 1]] ⪰ 0
        let p = problem(
            vec![Block::Psd(2)],
            &[(0, 0, 0, 1.0), (0, 1, 1, 1.0)],
            &[&[(0, 0, 1, 1.0)]],
            vec![1.0],
        );
        let solution = InteriorPointSolver::default().solve(&p).unwrap();
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert!((solution.primal_objective - 1.0).abs() < 1e-6);
        assert!((solution.dual_objective - 1.0).abs() < 1e-6);
        assert!((solution.t[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_linear_block() {
        // max t s.t. 2 - t >= 0, t >= 0
        let p = problem(
            vec![Block::Diagonal(2)],
            &[(0, 0, 0, 2.0)],
            &[&[(0, 0, 0, -1.0), (0, 1, 1, 1.0)]],
            vec![1.0],
        );
        let solution = InteriorPointSolver::default().solve(&p).unwrap();
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert!((solution.primal_objective - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_blocks_with_minimum_eigenvalue() {
        // max λ s.t. [[1, 0.5], [0.5, 1]] - λI ⪰ 0 and 3 - λ >= 0
        let p = problem(
            vec![Block::Psd(2), Block::Diagonal(1)],
            &[(0, 0, 0, 1.0), (0, 1, 1, 1.0), (0, 0, 1, 0.5), (1, 0, 0, 3.0)],
            &[&[(0, 0, 0, -1.0), (0, 1, 1, -1.0), (1, 0, 0, -1.0)]],
            vec![1.0],
        );
        let solution = InteriorPointSolver::default().solve(&p).unwrap();
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert!((solution.primal_objective - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_constant_problem_uses_eigenvalues() {
        let feasible = problem(vec![Block::Psd(1)], &[(0, 0, 0, 1.0)], &[], vec![]);
        let infeasible = problem(vec![Block::Psd(1)], &[(0, 0, 0, -1.0)], &[], vec![]);
        let solver = InteriorPointSolver::default();
        assert_eq!(solver.solve(&feasible).unwrap().status, SolverStatus::Optimal);
        assert_eq!(solver.solve(&infeasible).unwrap().status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_contradictory_constraints_are_not_optimal() {
        // t - 1 >= 0 and -t >= 0
        let p = problem(
            vec![Block::Diagonal(2)],
            &[(0, 0, 0, -1.0)],
            &[&[(0, 0, 0, 1.0), (0, 1, 1, -1.0)]],
            vec![0.0],
        );
        let solution = InteriorPointSolver::default().solve(&p).unwrap();
        assert_ne!(solution.status, SolverStatus::Optimal);
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use nalgebra::DMatrix;
use serde::Serialize;
use std::collections::BTreeMap;

/// Shape of one diagonal block of the constraint matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    /// Dense symmetric block constrained to be positive semidefinite
    Psd(usize),
    /// Diagonal block, one linear inequality per entry
    Diagonal(usize),
}

impl Block {
    pub fn size(&self) -> usize {
        match self {
            Block::Psd(n) | Block::Diagonal(n) => *n,
        }
    }
}

/// Symmetric block-diagonal matrix holding only its upper-triangle entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SparseBlockMatrix {
    entries: BTreeMap<(usize, usize, usize), f64>,
}

impl SparseBlockMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `value` at `(i, j)` and, implicitly, `(j, i)` of `block`
    pub fn add(&mut self, block: usize, i: usize, j: usize, value: f64) {
        if value == 0.0 {
            return;
        }
        let key = (block, i.min(j), i.max(j));
        let entry = self.entries.entry(key).or_insert(0.0);
        *entry += value;
        if *entry == 0.0 {
            self.entries.remove(&key);
        }
    }

    /// `(block, i, j, value)` with `i <= j`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize, f64)> + '_ {
        self.entries.iter().map(|(&(b, i, j), &v)| (b, i, j, v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Frobenius inner product with dense blocks
    pub fn inner(&self, blocks: &[DMatrix<f64>]) -> f64 {
        self.iter()
            .map(|(b, i, j, v)| {
                if i == j {
                    v * blocks[b][(i, i)]
                } else {
                    v * (blocks[b][(i, j)] + blocks[b][(j, i)])
                }
            })
            .sum()
    }

    /// Dense copy of every block
    pub fn to_dense(&self, structure: &[Block]) -> Vec<DMatrix<f64>> {
        let mut dense: Vec<DMatrix<f64>> = structure
            .iter()
            .map(|b| DMatrix::zeros(b.size(), b.size()))
            .collect();
        for (b, i, j, v) in self.iter() {
            dense[b][(i, j)] += v;
            if i != j {
                dense[b][(j, i)] += v;
            }
        }
        dense
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.iter()
            .map(|(_, i, j, v)| if i == j { v * v } else { 2.0 * v * v })
            .sum::<f64>()
            .sqrt()
    }
}

/// `maximize bᵀt + offset  subject to  F0 + Σ tⱼ Fⱼ ⪰ 0`
#[derive(Debug, Clone, Serialize)]
pub struct SdpProblem {
    pub blocks: Vec<Block>,
    pub constant: SparseBlockMatrix,
    pub matrices: Vec<SparseBlockMatrix>,
    pub objective: Vec<f64>,
    pub offset: f64,
    pub variable_names: Vec<String>,
}

impl SdpProblem {
    pub fn nr_variables(&self) -> usize {
        self.matrices.len()
    }

    /// Sum of the block sizes
    pub fn dimension(&self) -> usize {
        self.blocks.iter().map(Block::size).sum()
    }

    /// Evaluate `F0 + Σ tⱼ Fⱼ` densely
    pub fn slack(&self, t: &[f64]) -> Vec<DMatrix<f64>> {
        let mut dense = self.constant.to_dense(&self.blocks);
        for (matrix, &value) in self.matrices.iter().zip(t) {
            for (b, i, j, v) in matrix.iter() {
                dense[b][(i, j)] += value * v;
                if i != j {
                    dense[b][(j, i)] += value * v;
                }
            }
        }
        dense
    }

    pub fn objective_value(&self, t: &[f64]) -> f64 {
        self.objective.iter().zip(t).map(|(b, t)| b * t).sum::<f64>() + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_upper_triangle() {
        let mut m = SparseBlockMatrix::new();
        m.add(0, 2, 1, 1.5);
        m.add(0, 1, 2, 0.5);
        m.add(1, 0, 0, -1.0);
        let entries: Vec<_> = m.iter().collect();
        assert_eq!(entries, vec![(0, 1, 2, 2.0), (1, 0, 0, -1.0)]);

        m.add(1, 0, 0, 1.0);
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn test_inner_product_counts_both_triangles() {
        let mut m = SparseBlockMatrix::new();
        m.add(0, 0, 1, 1.0);
        m.add(0, 0, 0, 2.0);
        let x = vec![DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 3.0, 4.0])];
        assert_eq!(m.inner(&x), 2.0 + 6.0);
        assert!((m.frobenius_norm() - 6f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_slack_and_objective() {
        let mut f0 = SparseBlockMatrix::new();
        f0.add(0, 0, 0, 1.0);
        let mut f1 = SparseBlockMatrix::new();
        f1.add(0, 0, 1, 1.0);
        let problem = SdpProblem {
            blocks: vec![Block::Psd(2)],
            constant: f0,
            matrices: vec![f1],
            objective: vec![2.0],
            offset: 0.5,
            variable_names: vec!["t".into()],
        };
        let slack = problem.slack(&[3.0]);
        assert_eq!(slack[0][(1, 0)], 3.0);
        assert_eq!(problem.objective_value(&[3.0]), 6.5);
        assert_eq!(problem.dimension(), 2);
    }
}

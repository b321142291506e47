// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Operator algebra of an inflated scenario.
//!
//! Every operator is a projector identified by its rank in lexorder, so a monomial
//! is simply a word of ranks (`Word`). The algebra knows which operators commute,
//! which multiply to zero, and how the inflation symmetry group relabels source
//! copies; the submodules build canonical forms, factorisations, monomial
//! bookkeeping and polynomials on top of that.

use std::collections::HashMap;

use crate::errors::RelaxationError;
use crate::scenario::InflationProblem;

mod canonical;
mod factorize;
mod monomial;
mod operator;
mod parser;
mod polynomial;

pub use monomial::{
    AtomId, AtomicMonomial, CompoundMonomial, Knowability, MonomialId, MonomialStore, ONE, ZERO,
};
pub use operator::Operator;
pub use parser::{parse_operator_product, parse_polynomial};
pub use polynomial::Polynomial;

/// Rank of an operator in lexorder
pub type OpId = usize;
/// A product of operators, left to right
pub type Word = Vec<OpId>;

/// Operators of an inflated scenario with their commutation structure and symmetries.
#[derive(Debug, Clone)]
pub struct OperatorAlgebra {
    problem: InflationProblem,
    operators: Vec<Operator>,
    index: HashMap<Operator, OpId>,
    commutes: Vec<Vec<bool>>,
    commuting: bool,
    /// Every product of per-source copy permutations, as operator maps
    group: Vec<Vec<OpId>>,
    /// Single-source copy permutations other than the identity
    source_swaps: Vec<(usize, Vec<OpId>)>,
}

impl OperatorAlgebra {
    pub fn new(problem: &InflationProblem, commuting: bool) -> Self {
        let mut operators: Vec<Operator> = problem
            .measurements()
            .into_iter()
            .flatten()
            .flatten()
            .flatten()
            .collect();
        operators.sort();

        let index: HashMap<Operator, OpId> = operators
            .iter()
            .enumerate()
            .map(|(i, op)| (op.clone(), i))
            .collect();

        let sourceless: Vec<bool> = (0..problem.nr_parties())
            .map(|p| problem.sources_of_party(p).is_empty())
            .collect();
        let commutes = operators
            .iter()
            .map(|a| {
                operators
                    .iter()
                    .map(|b| operators_commute(a, b, commuting, &sourceless))
                    .collect()
            })
            .collect();

        let per_source: Vec<Vec<Vec<usize>>> = problem
            .inflation_level_per_source()
            .iter()
            .map(|&level| permutations(level))
            .collect();

        let relabel = |perms: &[&Vec<usize>]| -> Vec<OpId> {
            operators
                .iter()
                .enumerate()
                .map(|(i, op)| {
                    let mut image = op.clone();
                    for (copy, perm) in image.copies.iter_mut().zip(perms) {
                        if *copy > 0 {
                            *copy = perm[*copy - 1] + 1;
                        }
                    }
                    index.get(&image).copied().unwrap_or(i)
                })
                .collect()
        };

        let mut choices: Vec<Vec<&Vec<usize>>> = vec![Vec::new()];
        for perms in &per_source {
            choices = choices
                .into_iter()
                .flat_map(|choice| {
                    perms.iter().map(move |perm| {
                        let mut next = choice.clone();
                        next.push(perm);
                        next
                    })
                })
                .collect();
        }
        let group: Vec<Vec<OpId>> = choices.iter().map(|choice| relabel(choice)).collect();

        let identities: Vec<&Vec<usize>> = per_source.iter().map(|perms| &perms[0]).collect();
        let mut source_swaps = Vec::new();
        for (source, perms) in per_source.iter().enumerate() {
            for perm in perms.iter().skip(1) {
                let mut choice = identities.clone();
                choice[source] = perm;
                source_swaps.push((source, relabel(&choice)));
            }
        }

        Self {
            problem: problem.clone(),
            operators,
            index,
            commutes,
            commuting,
            group,
            source_swaps,
        }
    }

    pub fn problem(&self) -> &InflationProblem {
        &self.problem
    }

    pub fn is_commuting(&self) -> bool {
        self.commuting
    }

    /// Operators in lexorder
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn operator(&self, id: OpId) -> &Operator {
        &self.operators[id]
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn id_of(&self, op: &Operator) -> Option<OpId> {
        self.index.get(op).copied()
    }

    pub fn name(&self, id: OpId) -> String {
        self.problem.operator_name(&self.operators[id])
    }

    /// Space separated operator names, `1` for the empty word
    pub fn word_name(&self, word: &[OpId]) -> String {
        if word.is_empty() {
            return "1".to_string();
        }
        word.iter()
            .map(|&id| self.name(id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn word_from_operators(&self, ops: &[Operator]) -> Result<Word, RelaxationError> {
        ops.iter()
            .map(|op| {
                self.id_of(op).ok_or_else(|| {
                    RelaxationError::UnknownOperator(self.problem.operator_name(op))
                })
            })
            .collect()
    }

    pub fn commute(&self, a: OpId, b: OpId) -> bool {
        self.commutes[a][b]
    }

    /// Distinct outcomes of the same measurement multiply to zero
    pub fn orthogonal(&self, a: OpId, b: OpId) -> bool {
        a != b && self.operators[a].same_measurement(&self.operators[b])
    }

    /// All inflation symmetries as operator relabellings, identity first
    pub fn group(&self) -> &[Vec<OpId>] {
        &self.group
    }

    /// Non-trivial permutations of the copies of a single source
    pub fn source_swaps(&self) -> &[(usize, Vec<OpId>)] {
        &self.source_swaps
    }

    /// Lexorder as `(operator name, rank)` pairs
    pub fn lexicographic_order(&self) -> Vec<(String, usize)> {
        (0..self.len()).map(|id| (self.name(id), id)).collect()
    }

    /// Pairs of distinct operators that do not commute
    pub fn commutation_relationships(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for a in 0..self.len() {
            for b in (a + 1)..self.len() {
                if !self.commute(a, b) {
                    pairs.push((self.name(a), self.name(b)));
                }
            }
        }
        pairs
    }
}

fn operators_commute(a: &Operator, b: &Operator, commuting: bool, sourceless: &[bool]) -> bool {
    if a == b {
        return false;
    }
    if commuting || a.party != b.party {
        return true;
    }
    if sourceless[a.party] {
        return false;
    }
    !a.shares_source_copy(b)
}

/// Permutations of `0..n` in lexicographic order, identity first
fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(n: usize, current: &mut Vec<usize>, used: &mut [bool], out: &mut Vec<Vec<usize>>) {
        if current.len() == n {
            out.push(current.clone());
            return;
        }
        for i in 0..n {
            if !used[i] {
                used[i] = true;
                current.push(i);
                extend(n, current, used, out);
                current.pop();
                used[i] = false;
            }
        }
    }

    let mut out = Vec::new();
    extend(n, &mut Vec::with_capacity(n), &mut vec![false; n], &mut out);
    out
}

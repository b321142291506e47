// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Moment matrix construction and inflation-symmetry reduction.

use ndarray::Array2;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::algebra::{MonomialId, MonomialStore, OperatorAlgebra, Word, ONE, ZERO};
use crate::observability::messages::relaxation::{MomentMatrixBuilt, SymmetrySkipped};
use crate::observability::messages::StructuredLog;

/// Index of the zero entry
pub const ZERO_INDEX: usize = 0;
/// Index of the identity entry
pub const ONE_INDEX: usize = 1;

/// Moment matrix `Γ[i, j] = ⟨cᵢ† cⱼ⟩` over a generating set, reduced by inflation symmetry.
///
/// Entries are compact indices: 0 is zero, 1 is the identity, and every other index
/// names one compound monomial.
#[derive(Debug, Clone)]
pub struct MomentMatrix {
    columns: Vec<Word>,
    matrix: Array2<usize>,
    monomials: Vec<MonomialId>,
    index: HashMap<MonomialId, usize>,
    symmetries: Vec<Vec<usize>>,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// The smaller root always wins
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (low, high) = (ra.min(rb), ra.max(rb));
            self.parent[high] = low;
        }
    }
}

impl MomentMatrix {
    pub fn build(algebra: &OperatorAlgebra, store: &mut MonomialStore, columns: Vec<Word>) -> Self {
        let started = Instant::now();
        let n = columns.len();

        let (raw, words) = raw_matrix(algebra, &columns);
        let raw_variables = words.len().saturating_sub(2);

        let symmetries = column_symmetries(algebra, &columns);
        let mut orbits = UnionFind::new(words.len());
        for perm in &symmetries {
            for i in 0..n {
                for j in i..n {
                    orbits.union(raw[[i, j]], raw[[perm[i], perm[j]]]);
                }
            }
        }

        // One compound per orbit; orbits with the same compound share an index
        let mut monomials = vec![ZERO, ONE];
        let mut index: HashMap<MonomialId, usize> = [(ZERO, ZERO_INDEX), (ONE, ONE_INDEX)].into();
        let mut compact = vec![ZERO_INDEX; words.len()];
        compact[ONE_INDEX] = ONE_INDEX;
        for raw_index in 2..words.len() {
            let root = orbits.find(raw_index);
            if root != raw_index {
                compact[raw_index] = compact[root];
                continue;
            }
            let compound = store.from_word(algebra, &words[raw_index]);
            compact[raw_index] = *index.entry(compound).or_insert_with(|| {
                monomials.push(compound);
                monomials.len() - 1
            });
        }

        let matrix = raw.mapv(|r| compact[r]);

        MomentMatrixBuilt {
            size: n,
            raw_variables,
            variables: monomials.len() - 2,
            symmetries: symmetries.len(),
            duration: started.elapsed(),
        }
        .log();

        Self {
            columns,
            matrix,
            monomials,
            index,
            symmetries,
        }
    }

    pub fn columns(&self) -> &[Word] {
        &self.columns
    }

    pub fn size(&self) -> usize {
        self.columns.len()
    }

    /// Compact indices of every entry
    pub fn matrix(&self) -> &Array2<usize> {
        &self.matrix
    }

    /// Compound monomial of every compact index
    pub fn monomials(&self) -> &[MonomialId] {
        &self.monomials
    }

    /// Number of distinct moments other than zero and the identity
    pub fn nr_variables(&self) -> usize {
        self.monomials.len() - 2
    }

    /// Column permutations the matrix is invariant under
    pub fn symmetries(&self) -> &[Vec<usize>] {
        &self.symmetries
    }

    pub fn index_of(&self, monomial: MonomialId) -> Option<usize> {
        self.index.get(&monomial).copied()
    }

    pub fn contains(&self, monomial: MonomialId) -> bool {
        self.index.contains_key(&monomial)
    }

    /// Compound monomials of the matrix other than zero and the identity
    pub fn variables(&self) -> impl Iterator<Item = MonomialId> + '_ {
        self.monomials.iter().skip(2).copied()
    }

    /// Upper-triangle positions of every compact index
    pub fn positions(&self) -> BTreeMap<usize, Vec<(usize, usize)>> {
        let mut positions: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        for i in 0..self.size() {
            for j in i..self.size() {
                positions.entry(self.matrix[[i, j]]).or_default().push((i, j));
            }
        }
        positions
    }

    /// Entries rendered as monomial names
    pub fn names(&self, store: &MonomialStore) -> Vec<Vec<String>> {
        self.matrix
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|&idx| store.compound(self.monomials[idx]).name.clone())
                    .collect()
            })
            .collect()
    }
}

/// Raw entries numbered by first appearance in the upper triangle, with their words
fn raw_matrix(algebra: &OperatorAlgebra, columns: &[Word]) -> (Array2<usize>, Vec<Word>) {
    let n = columns.len();
    let mut matrix = Array2::zeros((n, n));
    let mut words: Vec<Word> = vec![Vec::new(), Vec::new()];
    let mut seen: HashMap<Word, usize> = HashMap::new();
    seen.insert(Vec::new(), ONE_INDEX);

    for i in 0..n {
        for j in i..n {
            let idx = match algebra.canonical_product(&columns[i], &columns[j]) {
                None => ZERO_INDEX,
                Some(word) => {
                    let key = algebra.conjugate_representative(&word);
                    *seen.entry(key.clone()).or_insert_with(|| {
                        words.push(key);
                        words.len() - 1
                    })
                }
            };
            matrix[[i, j]] = idx;
            matrix[[j, i]] = idx;
        }
    }
    (matrix, words)
}

/// Column permutations induced by single-source copy swaps
fn column_symmetries(algebra: &OperatorAlgebra, columns: &[Word]) -> Vec<Vec<usize>> {
    let position: HashMap<&Word, usize> = columns.iter().enumerate().map(|(i, c)| (c, i)).collect();
    let sources = algebra.problem().sources();

    let mut symmetries = Vec::new();
    'swaps: for (source, relabel) in algebra.source_swaps() {
        let mut perm = Vec::with_capacity(columns.len());
        for column in columns {
            let image: Word = column.iter().map(|&letter| relabel[letter]).collect();
            let found = algebra
                .canonical(&image)
                .and_then(|canonical| position.get(&canonical).copied());
            match found {
                Some(target) => perm.push(target),
                None => {
                    SymmetrySkipped {
                        source: &sources[*source],
                        missing: &algebra.word_name(&image),
                    }
                    .log();
                    continue 'swaps;
                }
            }
        }
        symmetries.push(perm);
    }
    symmetries
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{OpId, OperatorAlgebra, Word};

impl OperatorAlgebra {
    fn linked(&self, a: OpId, b: OpId) -> bool {
        let (a, b) = (self.operator(a), self.operator(b));
        if a.shares_source_copy(b) {
            return true;
        }
        a.party == b.party && a.copies.iter().all(|&c| c == 0)
    }

    /// Split a word into statistically independent factors.
    ///
    /// Letters are connected when they depend on a common source copy; each factor
    /// keeps its letters in their original order and factors are listed by first
    /// appearance.
    pub fn factorize(&self, word: &[OpId]) -> Vec<Word> {
        let n = word.len();
        let mut component: Vec<usize> = (0..n).collect();

        fn root(component: &mut [usize], mut i: usize) -> usize {
            while component[i] != i {
                component[i] = component[component[i]];
                i = component[i];
            }
            i
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if self.linked(word[i], word[j]) {
                    let (ri, rj) = (root(&mut component, i), root(&mut component, j));
                    if ri != rj {
                        component[ri.max(rj)] = ri.min(rj);
                    }
                }
            }
        }

        let mut roots: Vec<usize> = Vec::new();
        let mut factors: Vec<Word> = Vec::new();
        for (i, &letter) in word.iter().enumerate() {
            let r = root(&mut component, i);
            match roots.iter().position(|&x| x == r) {
                Some(k) => factors[k].push(letter),
                None => {
                    roots.push(r);
                    factors.push(vec![letter]);
                }
            }
        }
        factors
    }

    /// A factor is knowable when it involves each party at most once and uses a
    /// single copy of every source, so it maps onto a marginal of the original
    /// scenario.
    pub fn is_knowable(&self, word: &[OpId]) -> bool {
        let mut parties = Vec::with_capacity(word.len());
        let mut copy_of_source = vec![0; self.problem().nr_sources()];
        for &letter in word {
            let op = self.operator(letter);
            if parties.contains(&op.party) {
                return false;
            }
            parties.push(op.party);
            for (seen, &copy) in copy_of_source.iter_mut().zip(&op.copies) {
                if copy == 0 {
                    continue;
                }
                if *seen != 0 && *seen != copy {
                    return false;
                }
                *seen = copy;
            }
        }
        true
    }

    /// Every pair of letters commutes
    pub fn is_physical(&self, word: &[OpId]) -> bool {
        word.iter().enumerate().all(|(i, &a)| {
            word[i + 1..]
                .iter()
                .all(|&b| a == b || self.commute(a, b))
        })
    }

    /// Canonical representative of a word's orbit under the inflation symmetries
    pub fn representative(&self, word: &[OpId]) -> Word {
        self.group()
            .iter()
            .filter_map(|map| {
                let image: Word = word.iter().map(|&letter| map[letter]).collect();
                self.canonical(&image)
            })
            .map(|image| self.conjugate_representative(&image))
            .min()
            .unwrap_or_else(|| word.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::bilocal;

    #[test]
    fn test_factorize_by_shared_sources() {
        let algebra = bilocal(false);
        assert_eq!(algebra.factorize(&[0, 7]), vec![vec![0], vec![7]]);
        assert_eq!(algebra.factorize(&[0, 2, 7]), vec![vec![0, 2], vec![7]]);
        assert_eq!(algebra.factorize(&[0, 5, 2]), vec![vec![0, 2], vec![5]]);
        assert_eq!(algebra.factorize(&[0, 2, 5, 6]).len(), 2);
        assert!(algebra.factorize(&[]).is_empty());
    }

    #[test]
    fn test_knowability() {
        let algebra = bilocal(false);
        assert!(algebra.is_knowable(&[0, 2, 6]));
        assert!(algebra.is_knowable(&[1, 4]));
        assert!(!algebra.is_knowable(&[0, 5]));
        assert!(!algebra.is_knowable(&[2, 5]));
    }

    #[test]
    fn test_physicality() {
        let algebra = bilocal(false);
        assert!(algebra.is_physical(&[2, 5]));
        assert!(!algebra.is_physical(&[2, 3]));
        assert!(bilocal(true).is_physical(&[2, 3]));
    }

    #[test]
    fn test_representative_relabels_copies() {
        let algebra = bilocal(false);
        assert_eq!(algebra.representative(&[1]), vec![0]);
        assert_eq!(algebra.representative(&[1, 5, 7]), vec![0, 2, 6]);
        assert_eq!(algebra.representative(&[5, 3]), algebra.representative(&[2, 4]));
    }
}

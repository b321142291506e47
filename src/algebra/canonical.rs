// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{OpId, OperatorAlgebra, Word};

enum Reduction {
    /// Drop the letter at this position, it repeats an earlier one
    Drop(usize),
    /// Two orthogonal projectors meet
    Zero,
}

impl OperatorAlgebra {
    /// Smallest word, in lexorder, reachable by swapping adjacent commuting letters
    pub fn lex_normal_form(&self, word: &[OpId]) -> Word {
        let mut rest = word.to_vec();
        let mut out = Vec::with_capacity(word.len());
        while !rest.is_empty() {
            let mut best = 0;
            for i in 1..rest.len() {
                if rest[i] < rest[best] && rest[..i].iter().all(|&x| self.commute(x, rest[i])) {
                    best = i;
                }
            }
            out.push(rest.remove(best));
        }
        out
    }

    /// Canonical representative of a product, or `None` when it vanishes.
    ///
    /// Projectors are idempotent and distinct outcomes of one measurement are
    /// orthogonal, so a letter that can be commuted next to a copy of itself is
    /// dropped and one that meets an orthogonal partner zeroes the word.
    pub fn canonical(&self, word: &[OpId]) -> Option<Word> {
        if self.is_commuting() {
            let mut sorted = word.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted.windows(2).any(|pair| self.orthogonal(pair[0], pair[1])) {
                return None;
            }
            return Some(sorted);
        }

        let mut current = self.lex_normal_form(word);
        loop {
            match self.find_reduction(&current) {
                None => return Some(current),
                Some(Reduction::Zero) => return None,
                Some(Reduction::Drop(j)) => {
                    current.remove(j);
                    current = self.lex_normal_form(&current);
                }
            }
        }
    }

    fn find_reduction(&self, word: &[OpId]) -> Option<Reduction> {
        for i in 0..word.len() {
            for j in (i + 1)..word.len() {
                if word[j] == word[i] {
                    return Some(Reduction::Drop(j));
                }
                if self.orthogonal(word[i], word[j]) {
                    return Some(Reduction::Zero);
                }
                if !self.commute(word[i], word[j]) {
                    break;
                }
            }
        }
        None
    }

    /// Canonical form of `left† · right`, the entry of a moment matrix
    pub fn canonical_product(&self, left: &[OpId], right: &[OpId]) -> Option<Word> {
        let word: Word = left.iter().rev().chain(right).copied().collect();
        self.canonical(&word)
    }

    /// Adjoint of a word of hermitian projectors
    pub fn dagger(&self, word: &[OpId]) -> Word {
        word.iter().rev().copied().collect()
    }

    /// The smaller of a canonical word and its canonical adjoint
    pub fn conjugate_representative(&self, word: &[OpId]) -> Word {
        if self.is_commuting() {
            return word.to_vec();
        }
        match self.canonical(&self.dagger(word)) {
            Some(adjoint) if adjoint < word.to_vec() => adjoint,
            _ => word.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::bilocal;
    use super::*;
    use crate::scenario::InflationProblem;
    use proptest::prelude::*;

    // bilocal ids: v1 0..2, v2 copies (1,1)=2 (1,2)=3 (2,1)=4 (2,2)=5, v3 6..8

    #[test]
    fn test_lex_normal_form_moves_commuting_letters() {
        let algebra = bilocal(false);
        assert_eq!(algebra.lex_normal_form(&[5, 2]), vec![2, 5]);
        assert_eq!(algebra.lex_normal_form(&[3, 2]), vec![3, 2]);
        assert_eq!(algebra.lex_normal_form(&[6, 3, 0]), vec![0, 3, 6]);
    }

    #[test]
    fn test_idempotent_letters_collapse() {
        let algebra = bilocal(false);
        assert_eq!(algebra.canonical(&[2, 5, 2]), Some(vec![2, 5]));
        assert_eq!(algebra.canonical(&[0, 6, 0]), Some(vec![0, 6]));
        assert_eq!(algebra.canonical(&[2, 3, 2]), Some(vec![2, 3, 2]));
        assert_eq!(algebra.canonical(&[]), Some(vec![]));
    }

    #[test]
    fn test_orthogonal_outcomes_vanish() {
        let problem = InflationProblem::new(&[("rho", &["A"])], &[], &[3], &[1], &[1]).unwrap();
        for commuting in [false, true] {
            let algebra = OperatorAlgebra::new(&problem, commuting);
            assert_eq!(algebra.canonical(&[0, 1]), None);
            assert_eq!(algebra.canonical(&[1, 1]), Some(vec![1]));
        }
    }

    #[test]
    fn test_commuting_mode_sorts() {
        let algebra = bilocal(true);
        assert_eq!(algebra.canonical(&[3, 2, 3, 0]), Some(vec![0, 2, 3]));
    }

    #[test]
    fn test_conjugate_representative() {
        let algebra = bilocal(false);
        assert_eq!(algebra.conjugate_representative(&[3, 2]), vec![2, 3]);
        assert_eq!(algebra.conjugate_representative(&[2, 3]), vec![2, 3]);
        assert_eq!(algebra.canonical_product(&[2], &[3]), Some(vec![2, 3]));
    }

    proptest! {
        #[test]
        fn canonical_form_is_stable(word in proptest::collection::vec(0usize..8, 0..7)) {
            let algebra = bilocal(false);
            if let Some(canonical) = algebra.canonical(&word) {
                prop_assert_eq!(algebra.canonical(&canonical), Some(canonical.clone()));
                prop_assert_eq!(algebra.lex_normal_form(&canonical), canonical.clone());
                prop_assert!(canonical.len() <= word.len());
            }
        }

        #[test]
        fn adjoint_vanishes_with_word(word in proptest::collection::vec(0usize..8, 0..7)) {
            let algebra = bilocal(false);
            let forward = algebra.canonical(&word);
            let backward = algebra.canonical(&algebra.dagger(&word));
            prop_assert_eq!(forward.is_none(), backward.is_none());
            if let (Some(f), Some(b)) = (forward, backward) {
                prop_assert_eq!(f.len(), b.len());
            }
        }
    }
}

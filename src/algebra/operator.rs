// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// A projector of the inflated scenario.
///
/// `copies[s]` is the copy of source `s` the operator depends on, starting at 1, or
/// 0 when the source does not feed the party. Outcomes follow Collins–Gisin
/// notation: the last outcome of every measurement has no operator of its own.
///
/// The derived ordering, `(party, copies, setting, outcome)`, is the lexorder used
/// for canonical forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Operator {
    pub party: usize,
    pub copies: Vec<usize>,
    pub setting: usize,
    pub outcome: usize,
}

impl Operator {
    pub fn new(party: usize, copies: Vec<usize>, setting: usize, outcome: usize) -> Self {
        Self {
            party,
            copies,
            setting,
            outcome,
        }
    }

    /// Two operators belong to the same measurement device and setting
    pub fn same_measurement(&self, other: &Operator) -> bool {
        self.party == other.party && self.copies == other.copies && self.setting == other.setting
    }

    /// True when both operators use the same copy of at least one source
    pub fn shares_source_copy(&self, other: &Operator) -> bool {
        self.copies
            .iter()
            .zip(&other.copies)
            .any(|(a, b)| *a != 0 && a == b)
    }
}

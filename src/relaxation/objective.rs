// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use super::{Direction, InflationSdp, Objective};
use crate::algebra::{parse_polynomial, MonomialId, Polynomial, ONE, ZERO};
use crate::errors::{RelaxationError, RelaxationResult};
use crate::observability::messages::relaxation::ConfigurationWarning;
use crate::observability::messages::StructuredLog;

impl InflationSdp {
    /// Set or clear the objective.
    ///
    /// Terms are reduced to moments under the inflation symmetry; terms that
    /// vanish are dropped. Every remaining moment must appear in the matrix or
    /// have a known value.
    pub fn set_objective(
        &mut self,
        objective: Option<&Polynomial>,
        direction: Direction,
    ) -> RelaxationResult<()> {
        self.gamma()?;
        self.solution = None;
        let Some(polynomial) = objective else {
            self.objective = None;
            return Ok(());
        };

        let mut terms: BTreeMap<MonomialId, f64> = BTreeMap::new();
        for (ops, coefficient) in polynomial.terms() {
            let word = self.algebra.word_from_operators(ops)?;
            let monomial = self.store.from_word(&self.algebra, &word);
            if monomial == ZERO {
                continue;
            }
            let in_matrix = self.gamma()?.contains(monomial);
            if !in_matrix && !self.known.contains_key(&monomial) {
                return Err(RelaxationError::UnknownMonomial(
                    self.store.compound(monomial).name.clone(),
                ));
            }
            *terms.entry(monomial).or_insert(0.0) += direction.sign() * coefficient;
        }
        terms.retain(|_, c| *c != 0.0);

        if self.use_lpi {
            ConfigurationWarning {
                reason: "LPI constraints are active; the objective may not be a valid bound",
            }
            .log();
        }
        self.objective = Some(Objective { terms, direction });
        Ok(())
    }

    /// Parse and set an objective such as `A_1_0_0*B_1_0_0 - 2*A_1_1_0`
    pub fn set_objective_str(&mut self, expression: &str, direction: Direction) -> RelaxationResult<()> {
        let polynomial = parse_polynomial(&self.problem, expression)?;
        self.set_objective(Some(&polynomial), direction)
    }

    pub fn direction(&self) -> Option<Direction> {
        self.objective.as_ref().map(|objective| objective.direction)
    }

    /// Objective as maximised by the solver.
    ///
    /// Known moments are folded into the identity and semiknown moments pass
    /// their scaled coefficient to their unknown part.
    pub fn objective(&self) -> BTreeMap<MonomialId, f64> {
        let Some(objective) = &self.objective else {
            return BTreeMap::new();
        };
        let mut folded: BTreeMap<MonomialId, f64> = BTreeMap::new();
        for (&monomial, &coefficient) in &objective.terms {
            if let Some(&value) = self.known.get(&monomial) {
                *folded.entry(ONE).or_insert(0.0) += coefficient * value;
            } else if let Some(&(factor, unknown)) = self.semiknown.get(&monomial) {
                *folded.entry(unknown).or_insert(0.0) += coefficient * factor;
            } else {
                *folded.entry(monomial).or_insert(0.0) += coefficient;
            }
        }
        folded.retain(|_, c| *c != 0.0);
        folded
    }

    /// Folded objective keyed by monomial name
    pub fn objective_by_name(&self) -> BTreeMap<String, f64> {
        self.objective()
            .into_iter()
            .map(|(id, c)| (self.store.compound(id).name.clone(), c))
            .collect()
    }
}

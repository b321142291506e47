// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{BoundKind, InflationSdp};
use crate::algebra::{AtomId, Knowability, MonomialId, ONE, ZERO};
use crate::errors::{RelaxationError, RelaxationResult};
use crate::observability::messages::relaxation::ValuesSet;
use crate::observability::messages::StructuredLog;
use crate::scenario::Distribution;

/// Known products below this magnitude make an LPI relation degenerate
const LPI_ZERO_TOLERANCE: f64 = 1e-12;

impl InflationSdp {
    /// Fix every knowable moment of the matrix from an observed distribution.
    ///
    /// With `shared_randomness` only the atoms themselves are fixed; products of
    /// independent atoms are left free.
    pub fn set_distribution(
        &mut self,
        distribution: &Distribution,
        use_lpi_constraints: bool,
        shared_randomness: bool,
    ) -> RelaxationResult<()> {
        let gamma = self.gamma()?;
        let expected = self.problem.distribution_shape();
        let found = distribution.table().shape().to_vec();
        if expected != found {
            return Err(RelaxationError::DistributionShape { expected, found });
        }

        let atoms: BTreeSet<AtomId> = gamma
            .variables()
            .flat_map(|m| self.store.compound(m).atoms.iter().copied())
            .filter(|&atom| self.store.atom(atom).knowable)
            .collect();
        let mut values = BTreeMap::new();
        for atom in atoms {
            let events = self.store.atom_events(&self.algebra, atom);
            let id = self.store.from_atoms(vec![atom]);
            values.insert(id, distribution.marginal(&events));
        }

        self.set_values_by_id(
            &values,
            use_lpi_constraints,
            shared_randomness,
            !use_lpi_constraints,
        )
    }

    /// Fix moments by name, probability symbol or operator product.
    ///
    /// Previous values are discarded. Unless `only_specified_values` is set, every
    /// key must be atomic and the values propagate to all products of known atoms
    /// (and, with `use_lpi`, to partially known products).
    pub fn set_values(
        &mut self,
        values: &BTreeMap<String, f64>,
        use_lpi: bool,
        only_specified_values: bool,
        only_knowable_moments: bool,
    ) -> RelaxationResult<()> {
        self.gamma()?;
        let mut by_id = BTreeMap::new();
        for (key, &value) in values {
            let id = self.store.resolve(&self.algebra, key)?;
            by_id.insert(id, value);
        }
        self.set_values_by_id(&by_id, use_lpi, only_specified_values, only_knowable_moments)
    }

    pub fn set_values_by_id(
        &mut self,
        values: &BTreeMap<MonomialId, f64>,
        use_lpi: bool,
        only_specified_values: bool,
        only_knowable_moments: bool,
    ) -> RelaxationResult<()> {
        self.gamma()?;
        for &id in values.keys() {
            let compound = self.store.compound(id);
            if !only_specified_values && compound.atoms.len() > 1 {
                return Err(RelaxationError::NonAtomicValue(compound.name.clone()));
            }
            if only_knowable_moments && compound.knowability != Knowability::Yes {
                return Err(RelaxationError::UnknowableValue(compound.name.clone()));
            }
        }

        self.known = [(ONE, 1.0)].into();
        self.semiknown.clear();
        self.use_lpi = use_lpi;
        self.solution = None;
        for (&id, &value) in values {
            if value.is_nan() || id == ZERO {
                continue;
            }
            self.known.insert(id, value);
        }
        if !only_specified_values {
            self.propagate_known_atoms(use_lpi);
        }

        ValuesSet {
            known: self.known.len(),
            semiknown: self.semiknown.len(),
            use_lpi,
        }
        .log();
        Ok(())
    }

    fn propagate_known_atoms(&mut self, use_lpi: bool) {
        let Some(gamma) = self.moment_matrix.as_ref() else {
            return;
        };
        let atom_values: HashMap<AtomId, f64> = self
            .known
            .iter()
            .filter_map(|(&id, &value)| match self.store.compound(id).atoms.as_slice() {
                [atom] => Some((*atom, value)),
                _ => None,
            })
            .collect();

        let targets: Vec<MonomialId> = gamma
            .variables()
            .filter(|m| !self.known.contains_key(m))
            .collect();
        for monomial in targets {
            let atoms = self.store.compound(monomial).atoms.clone();
            let (known_atoms, unknown_atoms): (Vec<AtomId>, Vec<AtomId>) =
                atoms.into_iter().partition(|a| atom_values.contains_key(a));
            if known_atoms.is_empty() {
                continue;
            }
            let product: f64 = known_atoms.iter().map(|a| atom_values[a]).product();
            if unknown_atoms.is_empty() {
                self.known.insert(monomial, product);
            } else if use_lpi {
                if product.abs() < LPI_ZERO_TOLERANCE {
                    self.known.insert(monomial, 0.0);
                    continue;
                }
                let unknown = self.store.from_atoms(unknown_atoms);
                if gamma.contains(unknown) {
                    self.semiknown.insert(monomial, (product, unknown));
                }
            }
        }
    }

    /// Physical moments of the matrix are non-negative
    pub(super) fn default_lower_bounds(&self) -> BTreeMap<MonomialId, f64> {
        let Some(gamma) = self.moment_matrix.as_ref() else {
            return BTreeMap::new();
        };
        gamma
            .variables()
            .filter(|&m| self.store.compound(m).physical)
            .map(|m| (m, 0.0))
            .collect()
    }

    /// Resolve a key that must be a moment of the matrix
    fn resolve_matrix_monomial(&mut self, key: &str) -> RelaxationResult<MonomialId> {
        let id = self.store.resolve(&self.algebra, key)?;
        let in_matrix = self.gamma()?.contains(id);
        if !in_matrix && !self.known.contains_key(&id) && id != ZERO {
            return Err(RelaxationError::UnknownMonomial(key.to_string()));
        }
        Ok(id)
    }

    /// Replace the lower or upper bounds. Lower bounds start from the physical defaults.
    pub fn set_bounds(&mut self, bounds: &BTreeMap<String, f64>, kind: BoundKind) -> RelaxationResult<()> {
        self.gamma()?;
        let mut resolved = match kind {
            BoundKind::Lower => self.default_lower_bounds(),
            BoundKind::Upper => BTreeMap::new(),
        };
        for (key, &value) in bounds {
            let id = self.resolve_matrix_monomial(key)?;
            resolved.insert(id, value);
        }
        match kind {
            BoundKind::Lower => self.lower_bounds = resolved,
            BoundKind::Upper => self.upper_bounds = resolved,
        }
        self.solution = None;
        Ok(())
    }

    fn resolve_constraints(
        &mut self,
        constraints: &[BTreeMap<String, f64>],
    ) -> RelaxationResult<Vec<BTreeMap<MonomialId, f64>>> {
        self.gamma()?;
        constraints
            .iter()
            .map(|constraint| {
                let mut resolved = BTreeMap::new();
                for (key, &coefficient) in constraint {
                    let id = self.resolve_matrix_monomial(key)?;
                    *resolved.entry(id).or_insert(0.0) += coefficient;
                }
                Ok(resolved)
            })
            .collect()
    }

    /// Linear constraints `Σ cₘ·m = 0`, replacing previous ones
    pub fn set_extra_equalities(&mut self, equalities: &[BTreeMap<String, f64>]) -> RelaxationResult<()> {
        self.extra_equalities = self.resolve_constraints(equalities)?;
        self.solution = None;
        Ok(())
    }

    /// Linear constraints `Σ cₘ·m ≥ 0`, replacing previous ones
    pub fn set_extra_inequalities(
        &mut self,
        inequalities: &[BTreeMap<String, f64>],
    ) -> RelaxationResult<()> {
        self.extra_inequalities = self.resolve_constraints(inequalities)?;
        self.solution = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relaxation::ColumnSpec;
    use crate::scenario::InflationProblem;

    fn bilocal() -> InflationSdp {
        let problem = InflationProblem::new(
            &[("h1", &["v1", "v2"]), ("h2", &["v2", "v3"])],
            &["v1", "v2", "v3"],
            &[2, 2, 2],
            &[1, 1, 1],
            &[2, 2],
        )
        .unwrap();
        let mut sdp = InflationSdp::new(&problem, false);
        sdp.generate_relaxation(&ColumnSpec::Npa(2), 0).unwrap();
        sdp
    }

    fn chsh() -> InflationSdp {
        let problem =
            InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2, 2], &[2, 2], &[1]).unwrap();
        let mut sdp = InflationSdp::new(&problem, false);
        sdp.generate_relaxation(&ColumnSpec::Npa(1), 0).unwrap();
        sdp
    }

    #[test]
    fn test_distribution_shape_is_checked() {
        let mut sdp = chsh();
        let other =
            InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2, 2], &[1, 1], &[1]).unwrap();
        let dist = Distribution::uniform(&other);
        assert!(matches!(
            sdp.set_distribution(&dist, false, false),
            Err(RelaxationError::DistributionShape { .. })
        ));
    }

    #[test]
    fn test_distribution_fixes_every_knowable_moment() {
        let mut sdp = chsh();
        let dist = Distribution::uniform(sdp.problem());
        sdp.set_distribution(&dist, false, false).unwrap();
        let known = sdp.known_values();
        assert_eq!(known.len(), sdp.n_knowable().unwrap());
        assert_eq!(known["1"], 1.0);
        assert_eq!(known["<A_1_0_0>"], 0.5);
        assert_eq!(known["<A_1_0_0 B_1_0_0>"], 0.25);
    }

    #[test]
    fn test_products_of_known_atoms_propagate() {
        let mut sdp = bilocal();
        let mut values = BTreeMap::new();
        values.insert("pv1(0|0)".to_string(), 0.5);
        values.insert("pv3(0|0)".to_string(), 0.25);
        sdp.set_values(&values, false, false, true).unwrap();
        let known = sdp.known_values();
        assert_eq!(known["<v1_1_0_0_0><v3_0_1_0_0>"], 0.125);
        assert!(sdp.semiknown_values().is_empty());
    }

    #[test]
    fn test_lpi_relations() {
        let mut sdp = bilocal();
        let dist = Distribution::uniform(sdp.problem());
        sdp.set_distribution(&dist, true, false).unwrap();
        let semiknown = sdp.semiknown_values();
        assert!(!semiknown.is_empty());
        for (factor, _) in semiknown.values() {
            assert!(*factor <= 1.0 && *factor > 0.0);
        }
    }

    #[test]
    fn test_non_atomic_and_unknowable_keys_are_rejected() {
        let mut sdp = bilocal();
        let mut compound = BTreeMap::new();
        compound.insert("<v1_1_0_0_0><v3_0_1_0_0>".to_string(), 0.1);
        assert!(matches!(
            sdp.set_values(&compound, false, false, false),
            Err(RelaxationError::NonAtomicValue(_))
        ));
        sdp.set_values(&compound, false, true, false).unwrap();
        assert_eq!(sdp.known_values().len(), 2);

        let mut unknowable = BTreeMap::new();
        unknowable.insert("v2_1_1_0_0*v2_2_1_0_0".to_string(), 0.1);
        assert!(matches!(
            sdp.set_values(&unknowable, false, true, true),
            Err(RelaxationError::UnknowableValue(_))
        ));
    }

    #[test]
    fn test_nan_values_are_skipped() {
        let mut sdp = chsh();
        let mut values = BTreeMap::new();
        values.insert("A_1_0_0".to_string(), f64::NAN);
        values.insert("B_1_0_0".to_string(), 0.5);
        sdp.set_values(&values, false, false, true).unwrap();
        let known = sdp.known_values();
        assert!(!known.contains_key("<A_1_0_0>"));
        assert_eq!(known["<B_1_0_0>"], 0.5);
    }

    #[test]
    fn test_bounds_replace_previous_ones() {
        let mut sdp = chsh();
        let defaults = sdp.lower_bounds();
        assert!(defaults.contains_key("<A_1_0_0>"));
        assert!(!defaults.contains_key("<A_1_0_0 A_1_1_0>"));

        let mut upper = BTreeMap::new();
        upper.insert("A_1_0_0".to_string(), 0.75);
        sdp.set_bounds(&upper, BoundKind::Upper).unwrap();
        assert_eq!(sdp.upper_bounds()["<A_1_0_0>"], 0.75);

        let mut lower = BTreeMap::new();
        lower.insert("B_1_0_0".to_string(), 0.1);
        sdp.set_bounds(&lower, BoundKind::Lower).unwrap();
        assert_eq!(sdp.lower_bounds()["<B_1_0_0>"], 0.1);
        assert_eq!(sdp.lower_bounds()["<A_1_0_0>"], 0.0);

        let mut missing = BTreeMap::new();
        missing.insert("A_1_0_0*A_1_1_0*A_1_0_0".to_string(), 0.0);
        assert!(matches!(
            sdp.set_bounds(&missing, BoundKind::Upper),
            Err(RelaxationError::UnknownMonomial(_))
        ));
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{OpId, OperatorAlgebra, Word};
use crate::errors::RelaxationError;

pub type AtomId = usize;
pub type MonomialId = usize;

/// The zero moment
pub const ZERO: MonomialId = 0;
/// The identity moment
pub const ONE: MonomialId = 1;

/// How much of a moment follows from the observed distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Knowability {
    Yes,
    Semi,
    No,
}

/// A factor that cannot be split into independent parts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomicMonomial {
    pub word: Word,
    pub name: String,
    pub knowable: bool,
    pub physical: bool,
    /// `p<parties>(<outcomes>|<settings>)` for knowable atoms
    pub symbol: Option<String>,
}

/// A product of independent atoms, the unit the relaxation assigns values to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundMonomial {
    pub atoms: Vec<AtomId>,
    pub name: String,
    pub knowability: Knowability,
    pub physical: bool,
}

/// Interns atoms and compound monomials so every moment has a stable id.
///
/// Ids `ZERO` and `ONE` are reserved at construction.
#[derive(Debug, Clone)]
pub struct MonomialStore {
    atoms: Vec<AtomicMonomial>,
    atom_index: HashMap<Word, AtomId>,
    compounds: Vec<CompoundMonomial>,
    compound_index: HashMap<Vec<AtomId>, MonomialId>,
    name_index: HashMap<String, MonomialId>,
}

impl Default for MonomialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MonomialStore {
    pub fn new() -> Self {
        let zero = CompoundMonomial {
            atoms: Vec::new(),
            name: "0".to_string(),
            knowability: Knowability::Yes,
            physical: true,
        };
        let one = CompoundMonomial {
            atoms: Vec::new(),
            name: "1".to_string(),
            knowability: Knowability::Yes,
            physical: true,
        };
        let mut compound_index = HashMap::new();
        compound_index.insert(Vec::new(), ONE);
        let name_index = [("0".to_string(), ZERO), ("1".to_string(), ONE)]
            .into_iter()
            .collect();
        Self {
            atoms: Vec::new(),
            atom_index: HashMap::new(),
            compounds: vec![zero, one],
            compound_index,
            name_index,
        }
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn compound(&self, id: MonomialId) -> &CompoundMonomial {
        &self.compounds[id]
    }

    pub fn atom(&self, id: AtomId) -> &AtomicMonomial {
        &self.atoms[id]
    }

    pub fn atoms(&self) -> &[AtomicMonomial] {
        &self.atoms
    }

    pub fn lookup(&self, name: &str) -> Option<MonomialId> {
        self.name_index.get(name.trim()).copied()
    }

    /// Intern the moment of an arbitrary word
    pub fn from_word(&mut self, algebra: &OperatorAlgebra, word: &[OpId]) -> MonomialId {
        let Some(canonical) = algebra.canonical(word) else {
            return ZERO;
        };
        let atoms = algebra
            .factorize(&canonical)
            .iter()
            .map(|factor| self.intern_atom(algebra, factor))
            .collect();
        self.from_atoms(atoms)
    }

    /// Intern the product of already interned atoms
    pub fn from_atoms(&mut self, mut atoms: Vec<AtomId>) -> MonomialId {
        atoms.sort_by(|a, b| self.atoms[*a].word.cmp(&self.atoms[*b].word));
        if let Some(&id) = self.compound_index.get(&atoms) {
            return id;
        }

        let known = atoms.iter().filter(|&&a| self.atoms[a].knowable).count();
        let knowability = if known == atoms.len() {
            Knowability::Yes
        } else if known > 0 {
            Knowability::Semi
        } else {
            Knowability::No
        };
        let compound = CompoundMonomial {
            name: atoms.iter().map(|&a| self.atoms[a].name.as_str()).collect(),
            physical: atoms.iter().all(|&a| self.atoms[a].physical),
            atoms: atoms.clone(),
            knowability,
        };

        let id = self.compounds.len();
        self.name_index.insert(compound.name.clone(), id);
        if let [single] = atoms.as_slice() {
            if let Some(symbol) = &self.atoms[*single].symbol {
                self.name_index.insert(symbol.clone(), id);
            }
        }
        self.compound_index.insert(atoms, id);
        self.compounds.push(compound);
        id
    }

    fn intern_atom(&mut self, algebra: &OperatorAlgebra, factor: &[OpId]) -> AtomId {
        let word = algebra.representative(factor);
        if let Some(&id) = self.atom_index.get(&word) {
            return id;
        }
        let knowable = algebra.is_knowable(&word);
        let atom = AtomicMonomial {
            name: format!("<{}>", algebra.word_name(&word)),
            physical: algebra.is_physical(&word),
            symbol: knowable.then(|| probability_symbol(algebra, &word)),
            knowable,
            word: word.clone(),
        };
        let id = self.atoms.len();
        self.atom_index.insert(word, id);
        self.atoms.push(atom);
        id
    }

    /// `(party, outcome, setting)` events of a knowable atom
    pub fn atom_events(&self, algebra: &OperatorAlgebra, atom: AtomId) -> Vec<(usize, usize, usize)> {
        self.atoms[atom]
            .word
            .iter()
            .map(|&letter| {
                let op = algebra.operator(letter);
                (op.party, op.outcome, op.setting)
            })
            .collect()
    }

    /// Resolve a name, probability symbol or operator product to a moment
    pub fn resolve(&mut self, algebra: &OperatorAlgebra, key: &str) -> Result<MonomialId, RelaxationError> {
        if let Some(id) = self.lookup(key) {
            return Ok(id);
        }
        let ops = super::parse_operator_product(algebra.problem(), &key.replace(['<', '>'], " "))?;
        let word = algebra.word_from_operators(&ops)?;
        Ok(self.from_word(algebra, &word))
    }
}

fn probability_symbol(algebra: &OperatorAlgebra, word: &[OpId]) -> String {
    let names = algebra.problem().names();
    let mut parties = String::new();
    let mut outcomes = String::new();
    let mut settings = String::new();
    for &letter in word {
        let op = algebra.operator(letter);
        parties.push_str(&names[op.party]);
        outcomes.push_str(&op.outcome.to_string());
        settings.push_str(&op.setting.to_string());
    }
    format!("p{}({}|{})", parties, outcomes, settings)
}

#[cfg(test)]
mod tests {
    use super::super::tests::bilocal;
    use super::*;

    #[test]
    fn test_reserved_ids() {
        let store = MonomialStore::new();
        assert_eq!(store.compound(ZERO).name, "0");
        assert_eq!(store.compound(ONE).name, "1");
        assert_eq!(store.lookup("1"), Some(ONE));
    }

    #[test]
    fn test_from_word_interns_by_representative() {
        let algebra = bilocal(false);
        let mut store = MonomialStore::new();
        assert_eq!(store.from_word(&algebra, &[]), ONE);

        let a1 = store.from_word(&algebra, &[0]);
        let a2 = store.from_word(&algebra, &[1]);
        assert_eq!(a1, a2);
        assert_eq!(store.compound(a1).name, "<v1_1_0_0_0>");
        assert_eq!(store.lookup("pv1(0|0)"), Some(a1));

        let product = store.from_word(&algebra, &[0, 7]);
        let compound = store.compound(product);
        assert_eq!(compound.atoms.len(), 2);
        assert_eq!(compound.knowability, Knowability::Yes);
        assert_eq!(compound.name, "<v1_1_0_0_0><v3_0_1_0_0>");
    }

    #[test]
    fn test_knowability_of_compounds() {
        let algebra = bilocal(false);
        let mut store = MonomialStore::new();

        // A1 and B22 share no source copy
        let split = store.from_word(&algebra, &[0, 5]);
        assert_eq!(store.compound(split).atoms.len(), 2);
        assert_eq!(store.compound(split).knowability, Knowability::Yes);

        let unknowable = store.from_word(&algebra, &[0, 2, 3]);
        assert_eq!(store.compound(unknowable).atoms.len(), 1);
        assert_eq!(store.compound(unknowable).knowability, Knowability::No);

        // A1 B11 B12 and the independent A2
        let semi = store.from_word(&algebra, &[0, 2, 3, 1]);
        let compound = store.compound(semi).clone();
        assert!(!compound.physical);
        assert_eq!(compound.atoms.len(), 2);
        assert_eq!(compound.knowability, Knowability::Semi);

        let connected = store.from_word(&algebra, &[2, 3, 7]);
        assert_eq!(store.compound(connected).knowability, Knowability::No);
        let independent = store.from_word(&algebra, &[0, 5, 6]);
        assert_eq!(store.compound(independent).atoms.len(), 3);
        assert_eq!(store.compound(independent).knowability, Knowability::Yes);
    }

    #[test]
    fn test_resolve_names_and_products() {
        let algebra = bilocal(false);
        let mut store = MonomialStore::new();
        let by_product = store.resolve(&algebra, "v1_2_0_0_0*v2_2_1_0_0").unwrap();
        let by_name = store.resolve(&algebra, "<v1_1_0_0_0 v2_1_1_0_0>").unwrap();
        assert_eq!(by_product, by_name);
        assert_eq!(store.resolve(&algebra, "pv1v2(00|00)").unwrap(), by_name);
        assert!(store.resolve(&algebra, "nobody_1_0_0").is_err());
    }

    #[test]
    fn test_zero_product() {
        let problem = crate::scenario::InflationProblem::new(&[("rho", &["A"])], &[], &[3], &[1], &[1]).unwrap();
        let algebra = OperatorAlgebra::new(&problem, false);
        let mut store = MonomialStore::new();
        assert_eq!(store.from_word(&algebra, &[0, 1]), ZERO);
    }
}

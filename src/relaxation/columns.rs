// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::algebra::{parse_operator_product, OpId, OperatorAlgebra, Word};
use crate::errors::RelaxationError;

/// Generating set of the moment matrix.
///
/// Named hierarchies are written `npa2`, `local1`, `physical`, `physical2` or
/// `physical212`; explicit party blocks as `[[], [0], [1], [0, 1]]`; explicit
/// monomials as a list of operator products such as `["1", "A_1_0_0*B_1_0_0"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColumnSpecRepr", into = "ColumnSpecRepr")]
pub enum ColumnSpec {
    Npa(usize),
    Local(usize),
    Physical(PhysicalLengths),
    Blocks(Vec<Vec<usize>>),
    Monomials(Vec<String>),
}

/// Maximum length of the per-party commuting products in a `physical` set
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalLengths {
    /// The smallest inflation level among the party's sources
    Default,
    Uniform(usize),
    PerParty(Vec<usize>),
}

impl Default for ColumnSpec {
    fn default() -> Self {
        ColumnSpec::Npa(1)
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSpec::Npa(level) => write!(f, "npa{}", level),
            ColumnSpec::Local(level) => write!(f, "local{}", level),
            ColumnSpec::Physical(PhysicalLengths::Default) => write!(f, "physical"),
            ColumnSpec::Physical(PhysicalLengths::Uniform(n)) => write!(f, "physical{}", n),
            ColumnSpec::Physical(PhysicalLengths::PerParty(lengths)) => {
                write!(f, "physical")?;
                lengths.iter().try_for_each(|n| write!(f, "{}", n))
            }
            ColumnSpec::Blocks(blocks) => write!(f, "{:?}", blocks),
            ColumnSpec::Monomials(monomials) => write!(f, "[{}]", monomials.join(", ")),
        }
    }
}

impl FromStr for ColumnSpec {
    type Err = RelaxationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let invalid = || RelaxationError::InvalidColumnSpecification(s.to_string());
        let level = |digits: &str| digits.parse::<usize>().map_err(|_| invalid());

        if let Some(digits) = lower.strip_prefix("npa") {
            return Ok(ColumnSpec::Npa(level(digits)?));
        }
        if let Some(digits) = lower.strip_prefix("local") {
            return Ok(ColumnSpec::Local(level(digits)?));
        }
        if let Some(digits) = lower.strip_prefix("physical") {
            let lengths = digits
                .chars()
                .map(|c| c.to_digit(10).map(|d| d as usize).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ColumnSpec::Physical(match lengths.as_slice() {
                [] => PhysicalLengths::Default,
                [n] => PhysicalLengths::Uniform(*n),
                _ => PhysicalLengths::PerParty(lengths),
            }));
        }
        Err(invalid())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ColumnSpecRepr {
    Named(String),
    Blocks(Vec<Vec<usize>>),
    Words(Vec<String>),
}

impl TryFrom<ColumnSpecRepr> for ColumnSpec {
    type Error = RelaxationError;

    fn try_from(repr: ColumnSpecRepr) -> Result<Self, Self::Error> {
        match repr {
            ColumnSpecRepr::Named(name) => name.parse(),
            ColumnSpecRepr::Blocks(blocks) => Ok(ColumnSpec::Blocks(blocks)),
            ColumnSpecRepr::Words(words) => Ok(ColumnSpec::Monomials(words)),
        }
    }
}

impl From<ColumnSpec> for ColumnSpecRepr {
    fn from(spec: ColumnSpec) -> Self {
        match spec {
            ColumnSpec::Blocks(blocks) => ColumnSpecRepr::Blocks(blocks),
            ColumnSpec::Monomials(words) => ColumnSpecRepr::Words(words),
            named => ColumnSpecRepr::Named(named.to_string()),
        }
    }
}

/// Outcome of column generation
#[derive(Debug, Clone)]
pub struct Columns {
    pub words: Vec<Word>,
    pub has_identity: bool,
}

/// Build the generating set for a specification
pub fn build_columns(
    algebra: &OperatorAlgebra,
    spec: &ColumnSpec,
    max_monomial_length: usize,
) -> Result<Columns, RelaxationError> {
    let nr_parties = algebra.problem().nr_parties();
    let words = match spec {
        ColumnSpec::Npa(level) => {
            let max_length = cap(*level, max_monomial_length);
            let blocks = npa_blocks(nr_parties, max_length);
            columns_from_blocks(algebra, &blocks)?
        }
        ColumnSpec::Local(level) => {
            let max_length = cap(level * nr_parties, max_monomial_length);
            let frequencies = party_frequencies(&vec![*level; nr_parties], max_length);
            let blocks: Vec<Vec<usize>> = frequencies.iter().map(|f| block_of(f)).collect();
            columns_from_blocks(algebra, &blocks)?
        }
        ColumnSpec::Physical(lengths) => physical_columns(algebra, lengths, max_monomial_length)?,
        ColumnSpec::Blocks(blocks) => {
            let blocks: Vec<Vec<usize>> = blocks
                .iter()
                .filter(|b| max_monomial_length == 0 || b.len() <= max_monomial_length)
                .cloned()
                .collect();
            columns_from_blocks(algebra, &blocks)?
        }
        ColumnSpec::Monomials(monomials) => explicit_columns(algebra, monomials)?,
    };
    let has_identity = words.iter().any(|w| w.is_empty());
    Ok(Columns {
        words,
        has_identity,
    })
}

fn cap(length: usize, max_monomial_length: usize) -> usize {
    if max_monomial_length > 0 && max_monomial_length < length {
        max_monomial_length
    } else {
        length
    }
}

/// Non-decreasing party tuples of every length up to `max_length`
fn npa_blocks(nr_parties: usize, max_length: usize) -> Vec<Vec<usize>> {
    let mut blocks = vec![Vec::new()];
    let mut previous: Vec<Vec<usize>> = vec![Vec::new()];
    for _ in 0..max_length {
        let next: Vec<Vec<usize>> = previous
            .iter()
            .flat_map(|block| {
                let start = block.last().copied().unwrap_or(0);
                (start..nr_parties).map(move |p| {
                    let mut extended = block.clone();
                    extended.push(p);
                    extended
                })
            })
            .collect();
        blocks.extend(next.iter().cloned());
        previous = next;
    }
    blocks
}

/// How often each party appears, bounded per party and in total, sorted by total.
///
/// The cartesian product is walked with the first party fastest so that, among
/// blocks of equal length, earlier parties come first.
fn party_frequencies(per_party: &[usize], max_total: usize) -> Vec<Vec<usize>> {
    let mut frequencies: Vec<Vec<usize>> = vec![Vec::new()];
    for &bound in per_party.iter().rev() {
        frequencies = frequencies
            .into_iter()
            .flat_map(|tail| {
                (0..=bound).map(move |n| {
                    let mut f = tail.clone();
                    f.push(n);
                    f
                })
            })
            .collect();
    }
    let mut frequencies: Vec<Vec<usize>> = frequencies
        .into_iter()
        .map(|mut f| {
            f.reverse();
            f
        })
        .filter(|f| f.iter().sum::<usize>() <= max_total)
        .collect();
    frequencies.sort_by_key(|f| f.iter().sum::<usize>());
    frequencies
}

fn block_of(frequency: &[usize]) -> Vec<usize> {
    frequency
        .iter()
        .enumerate()
        .flat_map(|(party, &n)| std::iter::repeat(party).take(n))
        .collect()
}

fn party_operators(algebra: &OperatorAlgebra, party: usize) -> Vec<OpId> {
    (0..algebra.len())
        .filter(|&id| algebra.operator(id).party == party)
        .collect()
}

/// Products of every operator choice per block, deduplicated in first-seen order.
///
/// A product whose canonical form is shorter than its block belongs to a shorter
/// block and is left out.
fn columns_from_blocks(algebra: &OperatorAlgebra, blocks: &[Vec<usize>]) -> Result<Vec<Word>, RelaxationError> {
    let nr_parties = algebra.problem().nr_parties();
    let per_party: Vec<Vec<OpId>> = (0..nr_parties).map(|p| party_operators(algebra, p)).collect();

    let mut seen: HashSet<Word> = HashSet::new();
    let mut columns = Vec::new();
    for block in blocks {
        if let Some(&party) = block.iter().find(|&&p| p >= nr_parties) {
            return Err(RelaxationError::InvalidColumnSpecification(format!(
                "party {} does not exist in a scenario with {} parties",
                party, nr_parties
            )));
        }
        let mut products: Vec<Word> = vec![Vec::new()];
        for &party in block {
            products = products
                .into_iter()
                .flat_map(|prefix| {
                    per_party[party].iter().map(move |&op| {
                        let mut word = prefix.clone();
                        word.push(op);
                        word
                    })
                })
                .collect();
        }
        for product in products {
            if let Some(canonical) = algebra.canonical(&product) {
                if canonical.len() == block.len() && seen.insert(canonical.clone()) {
                    columns.push(canonical);
                }
            }
        }
    }
    Ok(columns)
}

/// Commuting products of up to `length` distinct operators of one party
fn physical_party_monomials(algebra: &OperatorAlgebra, party: usize, length: usize) -> Vec<Word> {
    let ops = party_operators(algebra, party);
    let mut result = Vec::new();
    let mut stack: Vec<Word> = vec![Vec::new()];
    while let Some(word) = stack.pop() {
        if word.len() == length {
            result.push(word);
            continue;
        }
        let start = word.last().map(|&last| last + 1).unwrap_or(0);
        for &op in ops.iter().filter(|&&op| op >= start).rev() {
            if word.iter().all(|&w| algebra.commute(w, op)) {
                let mut next = word.clone();
                next.push(op);
                stack.push(next);
            }
        }
    }
    result
}

fn physical_columns(
    algebra: &OperatorAlgebra,
    lengths: &PhysicalLengths,
    max_monomial_length: usize,
) -> Result<Vec<Word>, RelaxationError> {
    let problem = algebra.problem();
    let nr_parties = problem.nr_parties();
    let per_party: Vec<usize> = match lengths {
        PhysicalLengths::Default => (0..nr_parties)
            .map(|p| {
                problem
                    .sources_of_party(p)
                    .iter()
                    .map(|&s| problem.inflation_level_per_source()[s])
                    .min()
                    .unwrap_or(1)
            })
            .collect(),
        PhysicalLengths::Uniform(n) => vec![*n; nr_parties],
        PhysicalLengths::PerParty(lengths) if lengths.len() == nr_parties => lengths.clone(),
        PhysicalLengths::PerParty(lengths) => {
            return Err(RelaxationError::InvalidColumnSpecification(format!(
                "physical lengths {:?} must name one length per party ({})",
                lengths, nr_parties
            )))
        }
    };
    let max_total = cap(per_party.iter().sum(), max_monomial_length);

    let mut seen: HashSet<Word> = HashSet::new();
    let mut columns = Vec::new();
    for frequency in party_frequencies(&per_party, max_total) {
        let mut products: Vec<Word> = vec![Vec::new()];
        for (party, &n) in frequency.iter().enumerate() {
            if n == 0 {
                continue;
            }
            let factors = physical_party_monomials(algebra, party, n);
            products = products
                .into_iter()
                .flat_map(|prefix| {
                    factors.iter().map(move |factor| {
                        let mut word = prefix.clone();
                        word.extend(factor);
                        word
                    })
                })
                .collect();
        }
        for product in products {
            if let Some(canonical) = algebra.canonical(&product) {
                if seen.insert(canonical.clone()) {
                    columns.push(canonical);
                }
            }
        }
    }
    Ok(columns)
}

fn explicit_columns(algebra: &OperatorAlgebra, monomials: &[String]) -> Result<Vec<Word>, RelaxationError> {
    let mut seen: HashSet<Word> = HashSet::new();
    let mut columns = Vec::new();
    for monomial in monomials {
        let ops = parse_operator_product(algebra.problem(), monomial)?;
        let word = algebra.word_from_operators(&ops)?;
        match algebra.canonical(&word) {
            Some(canonical) => {
                if seen.insert(canonical.clone()) {
                    columns.push(canonical);
                }
            }
            None => {
                return Err(RelaxationError::InvalidColumnSpecification(format!(
                    "column '{}' is the zero operator",
                    monomial
                )))
            }
        }
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::InflationProblem;

    fn chsh(commuting: bool) -> OperatorAlgebra {
        let problem = InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2, 2], &[2, 2], &[1]).unwrap();
        OperatorAlgebra::new(&problem, commuting)
    }

    #[test]
    fn test_parse_named_specifications() {
        assert_eq!("npa2".parse::<ColumnSpec>().unwrap(), ColumnSpec::Npa(2));
        assert_eq!("Local1".parse::<ColumnSpec>().unwrap(), ColumnSpec::Local(1));
        assert_eq!(
            "physical".parse::<ColumnSpec>().unwrap(),
            ColumnSpec::Physical(PhysicalLengths::Default)
        );
        assert_eq!(
            "physical212".parse::<ColumnSpec>().unwrap(),
            ColumnSpec::Physical(PhysicalLengths::PerParty(vec![2, 1, 2]))
        );
        assert!(matches!(
            "npa".parse::<ColumnSpec>(),
            Err(RelaxationError::InvalidColumnSpecification(_))
        ));
        assert!("moments3".parse::<ColumnSpec>().is_err());
    }

    #[test]
    fn test_serde_forms() {
        let named: ColumnSpec = serde_yaml::from_str("npa2").unwrap();
        assert_eq!(named, ColumnSpec::Npa(2));
        let words: ColumnSpec = serde_yaml::from_str("['1', 'A_1_0_0']").unwrap();
        assert_eq!(words, ColumnSpec::Monomials(vec!["1".into(), "A_1_0_0".into()]));
        assert_eq!(serde_json::to_string(&ColumnSpec::Local(1)).unwrap(), "\"local1\"");
        assert!(serde_yaml::from_str::<ColumnSpec>("bogus").is_err());
    }

    #[test]
    fn test_npa_blocks() {
        assert_eq!(
            npa_blocks(3, 2),
            vec![
                vec![],
                vec![0],
                vec![1],
                vec![2],
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 1],
                vec![1, 2],
                vec![2, 2]
            ]
        );
    }

    #[test]
    fn test_local_frequencies() {
        let blocks: Vec<Vec<usize>> = party_frequencies(&[1, 1, 1], 3).iter().map(|f| block_of(f)).collect();
        assert_eq!(
            blocks,
            vec![
                vec![],
                vec![0],
                vec![1],
                vec![2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0, 1, 2]
            ]
        );
    }

    #[test]
    fn test_chsh_npa1() {
        let columns = build_columns(&chsh(false), &ColumnSpec::Npa(1), 0).unwrap();
        assert_eq!(columns.words.len(), 5);
        assert!(columns.has_identity);
        assert_eq!(columns.words[0], Vec::<OpId>::new());
    }

    #[test]
    fn test_blocks_drop_shortened_products() {
        let problem = InflationProblem::new(&[("A", &[])], &["A"], &[2], &[2], &[]).unwrap();
        let algebra = OperatorAlgebra::new(&problem, false);
        let columns = build_columns(&algebra, &ColumnSpec::Blocks(vec![vec![], vec![0, 0]]), 0).unwrap();
        assert_eq!(columns.words, vec![vec![], vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn test_max_monomial_length_caps_blocks() {
        let columns = build_columns(&chsh(false), &ColumnSpec::Npa(2), 1).unwrap();
        assert_eq!(columns.words.len(), 5);
    }

    #[test]
    fn test_explicit_monomials() {
        let algebra = chsh(false);
        let spec = ColumnSpec::Monomials(vec!["1".into(), "A_1_0_0".into(), "B_1_1_0*A_1_0_0".into()]);
        let columns = build_columns(&algebra, &spec, 0).unwrap();
        assert_eq!(columns.words.len(), 3);
        assert_eq!(columns.words[2].len(), 2);

        let missing = build_columns(&algebra, &ColumnSpec::Monomials(vec!["A_1_0_0".into()]), 0).unwrap();
        assert!(!missing.has_identity);
    }

    #[test]
    fn test_physical_columns_commute() {
        let problem = InflationProblem::new(
            &[("h1", &["v1", "v2"]), ("h2", &["v2", "v3"])],
            &["v1", "v2", "v3"],
            &[2, 2, 2],
            &[1, 1, 1],
            &[2, 2],
        )
        .unwrap();
        let algebra = OperatorAlgebra::new(&problem, false);
        let columns = build_columns(&algebra, &ColumnSpec::Physical(PhysicalLengths::Default), 0).unwrap();
        assert!(columns.words.iter().all(|w| algebra.is_physical(w)));
        assert!(columns.has_identity);
        // v2 pairs that commute: (1,1)(2,2) and (1,2)(2,1)
        assert_eq!(physical_party_monomials(&algebra, 1, 2).len(), 2);
    }
}

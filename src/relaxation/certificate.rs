// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Renderings of the dual certificate.
//!
//! Every certificate is a linear function of the known moments that is
//! non-negative on every distribution compatible with the inflated scenario.

use std::collections::{BTreeMap, HashMap};

use super::InflationSdp;
use crate::algebra::{MonomialId, Operator, Polynomial, ONE};
use crate::errors::{RelaxationError, RelaxationResult};

/// Chop, normalise and round coefficients.
///
/// Coefficients with `|c| <= chop_tol` are dropped, the rest are divided by the
/// largest magnitude and rounded to `round_decimals`; entries that round to zero
/// are removed.
pub fn clean_coefficients<K: Ord + Clone>(
    coefficients: &BTreeMap<K, f64>,
    chop_tol: f64,
    round_decimals: u32,
) -> BTreeMap<K, f64> {
    let chopped: BTreeMap<K, f64> = coefficients
        .iter()
        .filter(|(_, c)| c.abs() > chop_tol)
        .map(|(k, &c)| (k.clone(), c))
        .collect();
    let largest = chopped.values().fold(0.0_f64, |acc, c| acc.max(c.abs()));
    if largest == 0.0 {
        return BTreeMap::new();
    }
    let scale = 10f64.powi(round_decimals as i32);
    chopped
        .into_iter()
        .map(|(k, c)| (k, (c / largest * scale).round() / scale))
        .filter(|(_, c)| *c != 0.0)
        .collect()
}

impl InflationSdp {
    fn certificate_by_id(
        &self,
        clean: bool,
        chop_tol: f64,
        round_decimals: u32,
    ) -> RelaxationResult<BTreeMap<MonomialId, f64>> {
        let certificate = &self.solution()?.certificate;
        Ok(if clean {
            clean_coefficients(certificate, chop_tol, round_decimals)
        } else {
            certificate.clone()
        })
    }

    /// Certificate keyed by monomial name
    pub fn certificate_as_dict(
        &self,
        clean: bool,
        chop_tol: f64,
        round_decimals: u32,
    ) -> RelaxationResult<BTreeMap<String, f64>> {
        Ok(self
            .certificate_by_id(clean, chop_tol, round_decimals)?
            .into_iter()
            .map(|(id, c)| (self.store.compound(id).name.clone(), c))
            .collect())
    }

    /// Certificate keyed by products of probability symbols such as `pAB(00|01)`
    pub fn certificate_as_probs(
        &self,
        clean: bool,
        chop_tol: f64,
        round_decimals: u32,
    ) -> RelaxationResult<BTreeMap<String, f64>> {
        let mut probs = BTreeMap::new();
        for (id, c) in self.certificate_by_id(clean, chop_tol, round_decimals)? {
            *probs.entry(self.probability_name(id)).or_insert(0.0) += c;
        }
        Ok(probs)
    }

    fn probability_name(&self, id: MonomialId) -> String {
        if id == ONE {
            return "1".to_string();
        }
        let compound = self.store.compound(id);
        let symbols: Option<Vec<&str>> = compound
            .atoms
            .iter()
            .map(|&atom| self.store.atom(atom).symbol.as_deref())
            .collect();
        match symbols {
            Some(symbols) => symbols.join("*"),
            None => compound.name.clone(),
        }
    }

    /// Certificate as the inequality `c₀ + Σ cᵢ·mᵢ >= 0`
    pub fn certificate_as_string(
        &self,
        clean: bool,
        chop_tol: f64,
        round_decimals: u32,
    ) -> RelaxationResult<String> {
        let certificate = self.certificate_by_id(clean, chop_tol, round_decimals)?;
        let constant = certificate.get(&ONE).copied();
        let ordered = constant
            .map(|c| ("1".to_string(), c))
            .into_iter()
            .chain(
                certificate
                    .iter()
                    .filter(|(id, _)| **id != ONE)
                    .map(|(&id, &c)| (self.store.compound(id).name.clone(), c)),
            );
        Ok(format!("{} >= 0", render_linear(ordered)))
    }

    /// Certificate in terms of correlators `<A_x B_y ...>`.
    ///
    /// Every outcome-0 projector is expanded as `(1 + A_x)/2`. Only valid when
    /// every party has two outcomes.
    pub fn certificate_as_correlators(
        &self,
        clean: bool,
        chop_tol: f64,
        round_decimals: u32,
    ) -> RelaxationResult<BTreeMap<String, f64>> {
        if self.problem.outcomes_per_party().iter().any(|&o| o != 2) {
            return Err(RelaxationError::NonBinaryOutcomes);
        }
        let certificate = self.certificate_by_id(clean, chop_tol, round_decimals)?;

        let mut correlators: BTreeMap<String, f64> = BTreeMap::new();
        for (id, c) in certificate {
            let mut expansion: BTreeMap<Vec<String>, f64> = [(Vec::new(), c)].into();
            for &atom in &self.store.compound(id).atoms {
                let factor = self.atom_correlators(atom);
                let mut product = BTreeMap::new();
                for (left, &a) in &expansion {
                    for (right, &b) in &factor {
                        let mut key = left.clone();
                        key.extend(right.iter().cloned());
                        key.sort();
                        *product.entry(key).or_insert(0.0) += a * b;
                    }
                }
                expansion = product;
            }
            for (factors, value) in expansion {
                let name = if factors.is_empty() {
                    "1".to_string()
                } else {
                    factors.join("*")
                };
                *correlators.entry(name).or_insert(0.0) += value;
            }
        }
        correlators.retain(|_, c| c.abs() > chop_tol);
        Ok(correlators)
    }

    /// Correlator expansion of one atom; keys hold at most one `<...>` factor
    fn atom_correlators(&self, atom: usize) -> BTreeMap<Vec<String>, f64> {
        let names = self.problem.names();
        let mut expansion: BTreeMap<Vec<String>, f64> = [(Vec::new(), 1.0)].into();
        for &letter in &self.store.atom(atom).word {
            let op = self.algebra.operator(letter);
            let sign = if op.outcome == 0 { 1.0 } else { -1.0 };
            let label = format!("{}_{}", names[op.party], op.setting);
            let mut next = BTreeMap::new();
            for (key, &c) in &expansion {
                *next.entry(key.clone()).or_insert(0.0) += c / 2.0;
                let mut with = key.clone();
                with.push(label.clone());
                *next.entry(with).or_insert(0.0) += sign * c / 2.0;
            }
            expansion = next;
        }
        expansion
            .into_iter()
            .map(|(labels, c)| {
                let name = if labels.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("<{}>", labels.join(" "))]
                };
                (name, c)
            })
            .collect()
    }

    /// Certificate as a polynomial in the scenario's projectors
    pub fn certificate_as_objective(
        &self,
        clean: bool,
        chop_tol: f64,
        round_decimals: u32,
    ) -> RelaxationResult<Polynomial> {
        let mut polynomial = Polynomial::zero();
        for (id, c) in self.certificate_by_id(clean, chop_tol, round_decimals)? {
            polynomial = polynomial + Polynomial::term(self.disjoint_word(id), c);
        }
        Ok(polynomial)
    }

    /// Operators of a compound with every atom moved onto source copies of its own.
    ///
    /// Atom representatives all start at copy 1, so joining them directly would
    /// make independent factors share sources.
    fn disjoint_word(&self, id: MonomialId) -> Vec<Operator> {
        let mut used = vec![0; self.problem().nr_sources()];
        let mut word = Vec::new();
        for &atom in &self.store.compound(id).atoms {
            let mut relabel: HashMap<(usize, usize), usize> = HashMap::new();
            for &letter in &self.store.atom(atom).word {
                let mut op = self.algebra.operator(letter).clone();
                for (source, copy) in op.copies.iter_mut().enumerate() {
                    if *copy > 0 {
                        *copy = *relabel.entry((source, *copy)).or_insert_with(|| {
                            used[source] += 1;
                            used[source]
                        });
                    }
                }
                word.push(op);
            }
        }
        word
    }
}

fn render_linear(terms: impl Iterator<Item = (String, f64)>) -> String {
    let mut out = String::new();
    for (name, c) in terms {
        let magnitude = c.abs();
        if out.is_empty() {
            if c < 0.0 {
                out.push('-');
            }
        } else {
            out.push_str(if c < 0.0 { " - " } else { " + " });
        }
        if name == "1" {
            out.push_str(&magnitude.to_string());
        } else {
            out.push_str(&format!("{}*{}", magnitude, name));
        }
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubSolver;
    use crate::relaxation::{ColumnSpec, SolveOptions};
    use crate::scenario::InflationProblem;
    use crate::sdp::SolverStatus;

    fn solved_chsh() -> InflationSdp {
        let problem =
            InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2, 2], &[2, 2], &[1]).unwrap();
        let mut sdp = InflationSdp::new(&problem, false);
        sdp.generate_relaxation(&ColumnSpec::Npa(1), 0).unwrap();
        sdp.solve(&StubSolver::new(SolverStatus::Optimal, 0.0), &SolveOptions::default())
            .unwrap();
        sdp
    }

    fn with_certificate(sdp: &mut InflationSdp, entries: &[(&str, f64)]) {
        let mut certificate = BTreeMap::new();
        for (name, c) in entries {
            let id = sdp.store.resolve(&sdp.algebra, name).unwrap();
            certificate.insert(id, *c);
        }
        if let Some(solution) = sdp.solution.as_mut() {
            solution.certificate = certificate;
        }
    }

    #[test]
    fn test_clean_coefficients() {
        let mut coefficients = BTreeMap::new();
        coefficients.insert("a", 2.0);
        coefficients.insert("b", -1.0);
        coefficients.insert("c", 1e-12);
        coefficients.insert("d", 0.0004);
        let cleaned = clean_coefficients(&coefficients, 1e-10, 3);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned["a"], 1.0);
        assert_eq!(cleaned["b"], -0.5);
    }

    #[test]
    fn test_clean_coefficients_of_nothing() {
        let coefficients: BTreeMap<&str, f64> = [("a", 1e-13)].into();
        assert!(clean_coefficients(&coefficients, 1e-10, 3).is_empty());
    }

    #[test]
    fn test_requires_a_solution() {
        let problem =
            InflationProblem::new(&[("rho", &["A", "B"])], &[], &[2, 2], &[2, 2], &[1]).unwrap();
        let mut sdp = InflationSdp::new(&problem, false);
        sdp.generate_relaxation(&ColumnSpec::Npa(1), 0).unwrap();
        assert!(matches!(
            sdp.certificate_as_dict(false, 0.0, 3),
            Err(RelaxationError::NotSolved)
        ));
    }

    #[test]
    fn test_string_and_probability_forms() {
        let mut sdp = solved_chsh();
        with_certificate(&mut sdp, &[("1", 0.5), ("A_1_0_0*B_1_0_0", -1.0)]);

        let text = sdp.certificate_as_string(false, 0.0, 3).unwrap();
        assert_eq!(text, "0.5 - 1*<A_1_0_0 B_1_0_0> >= 0");

        let probs = sdp.certificate_as_probs(false, 0.0, 3).unwrap();
        assert_eq!(probs["1"], 0.5);
        assert_eq!(probs["pAB(00|00)"], -1.0);

        let cleaned = sdp.certificate_as_dict(true, 1e-10, 3).unwrap();
        assert_eq!(cleaned["<A_1_0_0 B_1_0_0>"], -1.0);
        assert_eq!(cleaned["1"], 0.5);
    }

    #[test]
    fn test_empty_certificate_string() {
        let mut sdp = solved_chsh();
        with_certificate(&mut sdp, &[]);
        assert_eq!(sdp.certificate_as_string(false, 0.0, 3).unwrap(), "0 >= 0");
    }

    #[test]
    fn test_correlator_expansion() {
        let mut sdp = solved_chsh();
        // p(00|00) = (1 + <A_0> + <B_0> + <A_0 B_0>)/4
        with_certificate(&mut sdp, &[("A_1_0_0*B_1_0_0", 4.0), ("A_1_1_0", 2.0)]);
        let correlators = sdp.certificate_as_correlators(false, 1e-12, 3).unwrap();
        assert_eq!(correlators["1"], 2.0);
        assert_eq!(correlators["<A_0>"], 1.0);
        assert_eq!(correlators["<A_1>"], 1.0);
        assert_eq!(correlators["<B_0>"], 1.0);
        assert_eq!(correlators["<A_0 B_0>"], 1.0);
    }

    #[test]
    fn test_correlators_need_binary_outcomes() {
        let problem =
            InflationProblem::new(&[("rho", &["A", "B"])], &[], &[3, 2], &[1, 1], &[1]).unwrap();
        let mut sdp = InflationSdp::new(&problem, false);
        sdp.generate_relaxation(&ColumnSpec::Npa(1), 0).unwrap();
        sdp.solve(&StubSolver::new(SolverStatus::Optimal, 0.0), &SolveOptions::default())
            .unwrap();
        assert!(matches!(
            sdp.certificate_as_correlators(false, 0.0, 3),
            Err(RelaxationError::NonBinaryOutcomes)
        ));
    }

    #[test]
    fn test_objective_form() {
        let mut sdp = solved_chsh();
        with_certificate(&mut sdp, &[("1", 1.0), ("B_1_1_0", -2.0)]);
        let polynomial = sdp.certificate_as_objective(false, 0.0, 3).unwrap();
        assert_eq!(polynomial.display(sdp.problem()), "1 - 2*B_1_1_0");
    }

    #[test]
    fn test_objective_keeps_independent_factors_apart() {
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
        sdp.solve(&StubSolver::new(SolverStatus::Optimal, 0.0), &SolveOptions::default())
            .unwrap();
        with_certificate(
            &mut sdp,
            &[
                ("v1_1_0_0_0*v2_1_1_0_0", 1.0),
                ("v1_1_0_0_0*v2_2_1_0_0", 2.0),
                ("v1_1_0_0_0*v1_2_0_0_0", 3.0),
            ],
        );

        let polynomial = sdp.certificate_as_objective(false, 0.0, 3).unwrap();
        assert_eq!(polynomial.len(), 3);

        // Every term maps back onto the monomial it came from
        let certificate = sdp.certificate_as_dict(false, 0.0, 3).unwrap();
        for (word, c) in polynomial.terms() {
            let letters = sdp.algebra.word_from_operators(word).unwrap();
            let id = sdp.store.from_word(&sdp.algebra, &letters);
            assert_eq!(certificate[&sdp.store.compound(id).name], c);
        }
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::ops::{Add, Mul, Neg, Sub};

use super::Operator;
use crate::scenario::InflationProblem;

/// A non-commutative polynomial in the scenario's projectors.
///
/// Terms are keyed by their operator word; the empty word is the constant term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polynomial {
    terms: BTreeMap<Vec<Operator>, f64>,
}

impl Polynomial {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self::term(Vec::new(), value)
    }

    pub fn term(word: Vec<Operator>, coefficient: f64) -> Self {
        let mut poly = Self::zero();
        poly.add_term(word, coefficient);
        poly
    }

    fn add_term(&mut self, word: Vec<Operator>, coefficient: f64) {
        let entry = self.terms.entry(word).or_insert(0.0);
        *entry += coefficient;
        if *entry == 0.0 {
            self.terms.retain(|_, c| *c != 0.0);
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = (&[Operator], f64)> {
        self.terms.iter().map(|(w, c)| (w.as_slice(), *c))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn pow(&self, exponent: u32) -> Self {
        (0..exponent).fold(Self::constant(1.0), |acc, _| &acc * self)
    }

    /// Render with operator names, e.g. `2*A_1_0_0*B_1_0_0 - 1`
    pub fn display(&self, problem: &InflationProblem) -> String {
        if self.terms.is_empty() {
            return "0".to_string();
        }
        let mut out = String::new();
        for (i, (word, coefficient)) in self.terms.iter().enumerate() {
            let magnitude = coefficient.abs();
            if i == 0 {
                if *coefficient < 0.0 {
                    out.push('-');
                }
            } else {
                out.push_str(if *coefficient < 0.0 { " - " } else { " + " });
            }
            let names: Vec<String> = word.iter().map(|op| problem.operator_name(op)).collect();
            match (names.is_empty(), magnitude == 1.0) {
                (true, _) => out.push_str(&magnitude.to_string()),
                (false, true) => out.push_str(&names.join("*")),
                (false, false) => out.push_str(&format!("{}*{}", magnitude, names.join("*"))),
            }
        }
        out
    }
}

impl From<Operator> for Polynomial {
    fn from(op: Operator) -> Self {
        Self::term(vec![op], 1.0)
    }
}

impl From<f64> for Polynomial {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let mut out = self.clone();
        for (word, coefficient) in &rhs.terms {
            out.add_term(word.clone(), *coefficient);
        }
        out
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        self + &(-rhs)
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        let mut out = Polynomial::zero();
        for (left, a) in &self.terms {
            for (right, b) in &rhs.terms {
                let word = left.iter().chain(right).cloned().collect();
                out.add_term(word, a * b);
            }
        }
        out
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self * -1.0
    }
}

impl Mul<f64> for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: f64) -> Polynomial {
        let mut out = Polynomial::zero();
        for (word, coefficient) in &self.terms {
            out.add_term(word.clone(), coefficient * rhs);
        }
        out
    }
}

macro_rules! forward_owned {
    ($trait:ident, $method:ident) => {
        impl $trait for Polynomial {
            type Output = Polynomial;

            fn $method(self, rhs: Polynomial) -> Polynomial {
                (&self).$method(&rhs)
            }
        }

        impl $trait<f64> for Polynomial {
            type Output = Polynomial;

            fn $method(self, rhs: f64) -> Polynomial {
                (&self).$method(&Polynomial::constant(rhs))
            }
        }
    };
}

forward_owned!(Add, add);
forward_owned!(Sub, sub);

impl Mul for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: Polynomial) -> Polynomial {
        &self * &rhs
    }
}

impl Mul<f64> for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: f64) -> Polynomial {
        &self * rhs
    }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        -&self
    }
}

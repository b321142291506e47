// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Text input for polynomials and operator products.
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary ('*' unary)*
//! unary := '-' unary | power
//! power := atom (('^' | '**') integer)?
//! atom  := number | operator name | '(' expr ')'
//! ```

use super::{Operator, Polynomial};
use crate::errors::RelaxationError;
use crate::scenario::InflationProblem;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Power,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, RelaxationError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            ' ' | '\t' | '\n' => {
                i += 1;
                continue;
            }
            '+' => tokens.push((start, Token::Plus)),
            '-' => tokens.push((start, Token::Minus)),
            '^' => tokens.push((start, Token::Power)),
            '(' => tokens.push((start, Token::LParen)),
            ')' => tokens.push((start, Token::RParen)),
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    i += 1;
                    tokens.push((start, Token::Power));
                } else {
                    tokens.push((start, Token::Star));
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == 'e'
                    || (matches!(chars[i], '+' | '-') && chars[i - 1] == 'e'))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| parse_error(input, start, "invalid number"))?;
                tokens.push((start, Token::Number(value)));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push((start, Token::Name(chars[start..i].iter().collect())));
                continue;
            }
            other => return Err(parse_error(input, start, &format!("unexpected character '{}'", other))),
        }
        i += 1;
    }
    Ok(tokens)
}

fn parse_error(input: &str, position: usize, reason: &str) -> RelaxationError {
    RelaxationError::Parse {
        input: input.to_string(),
        position,
        reason: reason.to_string(),
    }
}

struct Parser<'a> {
    input: &'a str,
    problem: &'a InflationProblem,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(p, _)| *p)
            .unwrap_or(self.input.len())
    }

    fn error(&self, reason: &str) -> RelaxationError {
        parse_error(self.input, self.offset(), reason)
    }

    fn expr(&mut self) -> Result<Polynomial, RelaxationError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = value + self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = value - self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Polynomial, RelaxationError> {
        let mut value = self.unary()?;
        while self.peek() == Some(&Token::Star) {
            self.pos += 1;
            value = value * self.unary()?;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Polynomial, RelaxationError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(-self.unary()?);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Polynomial, RelaxationError> {
        let base = self.atom()?;
        if self.peek() != Some(&Token::Power) {
            return Ok(base);
        }
        self.pos += 1;
        match self.peek() {
            Some(Token::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
                let exponent = *n as u32;
                self.pos += 1;
                Ok(base.pow(exponent))
            }
            _ => Err(self.error("exponent must be a non-negative integer")),
        }
    }

    fn atom(&mut self) -> Result<Polynomial, RelaxationError> {
        let position = self.offset();
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(Polynomial::constant(n))
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                let op = self
                    .problem
                    .parse_operator(&name)
                    .map_err(|_| parse_error(self.input, position, &format!("unknown operator '{}'", name)))?;
                Ok(Polynomial::from(op))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(_) => Err(self.error("unexpected token")),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

/// Parse a polynomial such as `A_1_0_0*B_1_0_0 - 0.5*(A_1_0_0 + 1)^2`
pub fn parse_polynomial(problem: &InflationProblem, input: &str) -> Result<Polynomial, RelaxationError> {
    let mut parser = Parser {
        input,
        problem,
        tokens: tokenize(input)?,
        pos: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(value)
}

/// Parse a product of operator names separated by `*` or whitespace; `1` is the empty product
pub fn parse_operator_product(problem: &InflationProblem, input: &str) -> Result<Vec<Operator>, RelaxationError> {
    let trimmed = input.trim();
    if trimmed == "1" || trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split(|c: char| c == '*' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| problem.parse_operator(part))
        .collect()
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! External SDPA process backend.
//!
//! The problem is written in sparse SDPA format to a scratch directory and handed to
//! `sdpa -ds <input> -o <output>`. SDPA's primal is our problem with `c = −b` and
//! `F0 = −F0`, so its `xVec` is `t`, its `yMat` is the dual matrix `X`, and both
//! objective values change sign.

use nalgebra::DMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::process::Command;
use std::time::Instant;

use crate::config::consts::DEFAULT_SDPA_EXECUTABLE;
use crate::errors::SolverError;
use crate::export::write_sdpa;
use crate::observability::messages::solver::{ExternalSolverLaunched, SolveFinished, SolveStarted};
use crate::observability::messages::StructuredLog;
use crate::sdp::{Block, SdpProblem, SdpSolution, SolverStatus};
use crate::traits::SdpSolver;

const INPUT_FILE: &str = "problem.dat-s";
const OUTPUT_FILE: &str = "problem.out";

pub struct SdpaSolver {
    executable: String,
}

impl Default for SdpaSolver {
    fn default() -> Self {
        Self::new(DEFAULT_SDPA_EXECUTABLE)
    }
}

impl SdpaSolver {
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }
}

impl SdpSolver for SdpaSolver {
    fn solve(&self, problem: &SdpProblem) -> Result<SdpSolution, SolverError> {
        SolveStarted {
            solver: self.name(),
            variables: problem.nr_variables(),
            dimension: problem.dimension(),
        }
        .log();
        let started = Instant::now();

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join(INPUT_FILE);
        let output = scratch.path().join(OUTPUT_FILE);
        {
            let mut out = BufWriter::new(File::create(&input)?);
            write_sdpa(problem, &[], &mut out)?;
            out.flush()?;
        }

        ExternalSolverLaunched {
            executable: &self.executable,
            input: &input.display().to_string(),
        }
        .log();
        let run = Command::new(&self.executable)
            .arg("-ds")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .current_dir(scratch.path())
            .output()?;
        if !run.status.success() {
            return Err(SolverError::ExternalFailed {
                executable: self.executable.clone(),
                status: run.status.to_string(),
                stderr: String::from_utf8_lossy(&run.stderr).trim().to_string(),
            });
        }

        let text = fs::read_to_string(&output)?;
        let solution = parse_output(&text, problem)?;

        SolveFinished {
            solver: self.name(),
            status: &solution.status.to_string(),
            iterations: solution.iterations,
            duration: started.elapsed(),
        }
        .log();
        Ok(solution)
    }

    fn name(&self) -> &'static str {
        "sdpa"
    }
}

/// Map an SDPA `phase.value` onto our status
pub fn phase_status(phase: &str) -> SolverStatus {
    match phase {
        "pdOPT" => SolverStatus::Optimal,
        "dUNBD" => SolverStatus::Infeasible,
        "pUNBD" => SolverStatus::Unbounded,
        p if p.starts_with("pINF") => SolverStatus::Infeasible,
        p if p.starts_with("dINF") => SolverStatus::Unbounded,
        _ => SolverStatus::NumericalError,
    }
}

/// Parse the text SDPA writes with `-o`
pub fn parse_output(text: &str, problem: &SdpProblem) -> Result<SdpSolution, SolverError> {
    let phase = scalar_field(text, "phase.value")
        .ok_or_else(|| SolverError::Parse("missing phase.value".to_string()))?;
    let status = phase_status(phase);
    let mut solution = SdpSolution::with_status(status);

    solution.iterations = scalar_field(text, "Iteration")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if let Some(value) = scalar_field(text, "objValPrimal").and_then(|v| v.parse::<f64>().ok()) {
        solution.primal_objective = -value + problem.offset;
    }
    if let Some(value) = scalar_field(text, "objValDual").and_then(|v| v.parse::<f64>().ok()) {
        solution.dual_objective = -value + problem.offset;
    }

    if let Some(body) = braced_field(text, "xVec") {
        let tree = Node::parse(body)?;
        solution.t = tree.numbers()?;
    }
    if let Some(body) = braced_field(text, "yMat") {
        let tree = Node::parse(body)?;
        solution.dual = dual_blocks(&tree, &problem.blocks)?;
    }
    Ok(solution)
}

/// Value of a `key = value` line
fn scalar_field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (name, value) = line.split_once('=')?;
        (name.trim() == key).then(|| value.trim())
    })
}

/// Text from the first `{` after `key =` up to its matching `}`
fn braced_field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let mut offset = 0;
    let start = loop {
        let found = text[offset..].find(key)? + offset;
        let rest = text[found + key.len()..].trim_start();
        if rest.starts_with('=') {
            break found + key.len();
        }
        offset = found + key.len();
    };
    let open = text[start..].find('{')? + start;
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, PartialEq)]
enum Node {
    Number(f64),
    List(Vec<Node>),
}

impl Node {
    fn parse(text: &str) -> Result<Node, SolverError> {
        let mut stack: Vec<Vec<Node>> = Vec::new();
        let mut token = String::new();
        let mut root = None;

        let flush = |token: &mut String, stack: &mut Vec<Vec<Node>>| -> Result<(), SolverError> {
            if token.is_empty() {
                return Ok(());
            }
            let value = token
                .parse::<f64>()
                .map_err(|_| SolverError::Parse(format!("invalid number '{}'", token)))?;
            token.clear();
            stack
                .last_mut()
                .ok_or_else(|| SolverError::Parse("number outside braces".to_string()))?
                .push(Node::Number(value));
            Ok(())
        };

        for c in text.chars() {
            match c {
                '{' => stack.push(Vec::new()),
                '}' => {
                    flush(&mut token, &mut stack)?;
                    let list = stack
                        .pop()
                        .ok_or_else(|| SolverError::Parse("unbalanced braces".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.push(Node::List(list)),
                        None => root = Some(Node::List(list)),
                    }
                }
                ',' => flush(&mut token, &mut stack)?,
                c if c.is_whitespace() => flush(&mut token, &mut stack)?,
                c => token.push(c),
            }
        }
        root.ok_or_else(|| SolverError::Parse("empty braces".to_string()))
    }

    fn numbers(&self) -> Result<Vec<f64>, SolverError> {
        match self {
            Node::List(items) => items
                .iter()
                .map(|item| match item {
                    Node::Number(v) => Ok(*v),
                    Node::List(_) => Err(SolverError::Parse("expected a flat vector".to_string())),
                })
                .collect(),
            Node::Number(v) => Ok(vec![*v]),
        }
    }
}

fn dual_blocks(tree: &Node, structure: &[Block]) -> Result<Vec<DMatrix<f64>>, SolverError> {
    let Node::List(blocks) = tree else {
        return Err(SolverError::Parse("yMat is not a block list".to_string()));
    };
    // A single block is printed without the outer braces
    let blocks: Vec<&Node> = if structure.len() == 1 {
        vec![tree]
    } else {
        blocks.iter().collect()
    };
    if blocks.len() != structure.len() {
        return Err(SolverError::Parse(format!(
            "yMat has {} blocks, expected {}",
            blocks.len(),
            structure.len()
        )));
    }

    blocks
        .into_iter()
        .zip(structure)
        .map(|(node, block)| {
            let n = block.size();
            match block {
                Block::Diagonal(_) => {
                    let diagonal = node.numbers()?;
                    if diagonal.len() != n {
                        return Err(SolverError::Parse("diagonal block size mismatch".to_string()));
                    }
                    Ok(DMatrix::from_diagonal(&nalgebra::DVector::from_vec(diagonal)))
                }
                Block::Psd(_) => {
                    let Node::List(rows) = node else {
                        return Err(SolverError::Parse("matrix block is not a list".to_string()));
                    };
                    let rows: Vec<Vec<f64>> =
                        rows.iter().map(Node::numbers).collect::<Result<_, _>>()?;
                    if rows.len() != n || rows.iter().any(|r| r.len() != n) {
                        return Err(SolverError::Parse("matrix block size mismatch".to_string()));
                    }
                    Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::SparseBlockMatrix;

    const OUTPUT: &str = r#"SDPA start at Mon Oct 19 10:00:00 2026
    mu      thetaP  thetaD  objP      objD      alphaP  alphaD  beta
 0 1.0e+04 1.0e+00 1.0e+00 -0.00e+00 +2.00e+02 9.5e-01 1.0e+00 2.00e-01

phase.value  = pdOPT
   Iteration = 11
          mu = +1.2e-09
relative gap = +3.1e-09
        gap  = +1.2e-09
      digits = +8.5e+00
objValPrimal = -1.0000000000000000e+00
objValDual   = -1.0000000014000000e+00
p.feas.error = +0.0e+00
d.feas.error = +1.1e-15
xVec =
{+1.000e+00}
xMat =
{
{ {+1.0e+00,+1.0e+00 }, {+1.0e+00,+1.0e+00 }   }
{+2.0e+00,+0.0e+00 }
}
yMat =
{
{ {+5.0e-01,-5.0e-01 }, {-5.0e-01,+5.0e-01 }   }
{+0.0e+00,+1.0e+00 }
}
    main loop time = 0.00
"#;

    fn problem() -> SdpProblem {
        let mut constant = SparseBlockMatrix::new();
        constant.add(0, 0, 0, 1.0);
        constant.add(0, 1, 1, 1.0);
        SdpProblem {
            blocks: vec![Block::Psd(2), Block::Diagonal(2)],
            constant,
            matrices: vec![SparseBlockMatrix::new()],
            objective: vec![1.0],
            offset: 0.25,
            variable_names: vec!["t".into()],
        }
    }

    #[test]
    fn test_parse_optimal_output() {
        let solution = parse_output(OUTPUT, &problem()).unwrap();
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.iterations, 11);
        assert!((solution.primal_objective - 1.25).abs() < 1e-12);
        assert_eq!(solution.t, vec![1.0]);
        assert_eq!(solution.dual.len(), 2);
        assert_eq!(solution.dual[0][(0, 1)], -0.5);
        assert_eq!(solution.dual[1][(1, 1)], 1.0);
        assert_eq!(solution.dual[1][(0, 1)], 0.0);
    }

    #[test]
    fn test_phase_mapping() {
        assert_eq!(phase_status("pdOPT"), SolverStatus::Optimal);
        assert_eq!(phase_status("pINF_dFEAS"), SolverStatus::Infeasible);
        assert_eq!(phase_status("dUNBD"), SolverStatus::Infeasible);
        assert_eq!(phase_status("dINF"), SolverStatus::Unbounded);
        assert_eq!(phase_status("pUNBD"), SolverStatus::Unbounded);
        assert_eq!(phase_status("noINFO"), SolverStatus::NumericalError);
        // Phases outside the map
        assert_eq!(phase_status("pdINF"), SolverStatus::NumericalError);
        assert_eq!(phase_status("pFEAS_dINF"), SolverStatus::NumericalError);
    }

    #[test]
    fn test_missing_phase_is_a_parse_error() {
        assert!(matches!(
            parse_output("objValPrimal = 1.0", &problem()),
            Err(SolverError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_executable_is_io_error() {
        let solver = SdpaSolver::new("definitely-not-an-sdpa-binary");
        assert!(matches!(solver.solve(&problem()), Err(SolverError::Io(_))));
    }
}

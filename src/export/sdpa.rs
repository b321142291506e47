// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::ExportError;
use crate::sdp::{Block, SdpProblem};

/// Write a problem in sparse SDPA format.
///
/// SDPA minimises `cᵀx` subject to `Σ xᵢFᵢ − F0 ⪰ 0`, so the objective is negated
/// and so is the constant matrix. Diagonal blocks get a negative size and entries
/// are 1-indexed upper-triangle.
pub fn write_sdpa<W: Write>(problem: &SdpProblem, comments: &[String], out: &mut W) -> std::io::Result<()> {
    for comment in comments {
        writeln!(out, "* {}", comment)?;
    }
    if !problem.variable_names.is_empty() {
        writeln!(out, "* variables: {}", problem.variable_names.join(" "))?;
    }
    writeln!(out, "{} = mDIM", problem.nr_variables())?;
    writeln!(out, "{} = nBLOCK", problem.blocks.len())?;
    let structure: Vec<String> = problem
        .blocks
        .iter()
        .map(|b| match b {
            Block::Psd(n) => n.to_string(),
            Block::Diagonal(n) => format!("-{}", n),
        })
        .collect();
    writeln!(out, "{} = bLOCKsTRUCT", structure.join(" "))?;
    let costs: Vec<String> = problem.objective.iter().map(|b| format_value(-b)).collect();
    writeln!(out, "{}", costs.join(" "))?;

    for (b, i, j, v) in problem.constant.iter() {
        writeln!(out, "0 {} {} {} {}", b + 1, i + 1, j + 1, format_value(-v))?;
    }
    for (k, matrix) in problem.matrices.iter().enumerate() {
        for (b, i, j, v) in matrix.iter() {
            writeln!(out, "{} {} {} {} {}", k + 1, b + 1, i + 1, j + 1, format_value(v))?;
        }
    }
    Ok(())
}

/// Write a problem in sparse SDPA format to `path`
pub fn write_sdpa_file(problem: &SdpProblem, comments: &[String], path: &Path) -> Result<(), ExportError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_sdpa(problem, comments, &mut out)?;
    out.flush()?;
    Ok(())
}

fn format_value(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::SparseBlockMatrix;

    #[test]
    fn test_sdpa_layout() {
        let mut constant = SparseBlockMatrix::new();
        constant.add(0, 0, 0, 1.0);
        constant.add(1, 0, 0, 2.0);
        let mut f1 = SparseBlockMatrix::new();
        f1.add(0, 1, 0, 1.0);
        f1.add(1, 1, 1, -1.0);
        let problem = SdpProblem {
            blocks: vec![Block::Psd(2), Block::Diagonal(2)],
            constant,
            matrices: vec![f1],
            objective: vec![1.5],
            offset: 0.0,
            variable_names: vec!["<A>".into()],
        };

        let mut buffer = Vec::new();
        write_sdpa(&problem, &["chsh".to_string()], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "* chsh",
                "* variables: <A>",
                "1 = mDIM",
                "2 = nBLOCK",
                "2 -2 = bLOCKsTRUCT",
                "-1.5",
                "0 1 1 1 -1",
                "0 2 1 1 -2",
                "1 1 1 2 1",
                "1 2 2 2 -1",
            ]
        );
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.dat-s");
        let problem = SdpProblem {
            blocks: vec![Block::Psd(1)],
            constant: SparseBlockMatrix::new(),
            matrices: vec![],
            objective: vec![],
            offset: 0.0,
            variable_names: vec![],
        };
        write_sdpa_file(&problem, &[], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("0 = mDIM"));
    }
}

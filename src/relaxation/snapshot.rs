// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Direction, InflationSdp, RelaxationSolution};
use crate::algebra::{CompoundMonomial, Knowability};
use crate::errors::RelaxationResult;
use crate::export::{resolve_export_path, write_csv, write_json, write_sdpa_file, ExportFormat};
use crate::observability::messages::relaxation::RelaxationExported;
use crate::observability::messages::StructuredLog;
use crate::scenario::InflationProblem;

/// One moment of the matrix as listed by `InflationSdp::monomials`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonomialEntry {
    /// Compact index in the moment matrix
    pub index: usize,
    pub name: String,
    pub knowability: Knowability,
    pub physical: bool,
}

impl MonomialEntry {
    pub fn new(index: usize, compound: &CompoundMonomial) -> Self {
        Self {
            index,
            name: compound.name.clone(),
            knowability: compound.knowability,
            physical: compound.physical,
        }
    }
}

/// Serialisable view of a relaxation, written by the JSON export
#[derive(Debug, Serialize)]
pub struct RelaxationSnapshot<'a> {
    pub scenario: &'a InflationProblem,
    pub commuting: bool,
    pub generating_monomials: Vec<String>,
    /// Compact index of every entry
    pub moment_matrix: Vec<Vec<usize>>,
    pub monomials: Vec<MonomialEntry>,
    pub known_values: BTreeMap<String, f64>,
    pub semiknown_values: BTreeMap<String, (f64, String)>,
    pub lower_bounds: BTreeMap<String, f64>,
    pub upper_bounds: BTreeMap<String, f64>,
    pub direction: Option<Direction>,
    pub objective: BTreeMap<String, f64>,
    pub solution: Option<&'a RelaxationSolution>,
    pub certificate: BTreeMap<String, f64>,
}

impl InflationSdp {
    pub fn snapshot(&self) -> RelaxationResult<RelaxationSnapshot<'_>> {
        let gamma = self.gamma()?;
        let certificate = match &self.solution {
            Some(_) => self.certificate_as_dict(false, 0.0, 0)?,
            None => BTreeMap::new(),
        };
        Ok(RelaxationSnapshot {
            scenario: &self.problem,
            commuting: self.is_commuting(),
            generating_monomials: self.generating_monomials()?,
            moment_matrix: gamma.matrix().rows().into_iter().map(|row| row.to_vec()).collect(),
            monomials: self.monomials()?,
            known_values: self.known_values(),
            semiknown_values: self.semiknown_values(),
            lower_bounds: self.lower_bounds(),
            upper_bounds: self.upper_bounds(),
            direction: self.direction(),
            objective: self.objective_by_name(),
            solution: self.solution.as_ref(),
            certificate,
        })
    }

    /// Export by extension: `.dat-s` (default), `.csv` or `.json`.
    ///
    /// Returns the path actually written, which gains `.dat-s` when `path` has
    /// no extension.
    pub fn write_to_file(&self, path: &Path) -> RelaxationResult<PathBuf> {
        let (path, format) = resolve_export_path(path)?;
        let label = match format {
            ExportFormat::Sdpa => {
                let assembly = self.assemble(self.objective.is_none())?;
                let comments = vec![
                    format!("moment matrix of size {}", self.gamma()?.size()),
                    format!("columns: {}", self.generating_monomials()?.join(" ")),
                ];
                write_sdpa_file(&assembly.problem, &comments, &path)?;
                "sdpa"
            }
            ExportFormat::Csv => {
                write_csv(&self.gamma()?.names(&self.store), &path)?;
                "csv"
            }
            ExportFormat::Json => {
                write_json(&self.snapshot()?, &path)?;
                "json"
            }
        };
        RelaxationExported {
            path: &path.display().to_string(),
            format: label,
        }
        .log();
        Ok(path)
    }
}

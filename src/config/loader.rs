// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_CHOP_TOLERANCE, DEFAULT_FEASIBILITY_TOLERANCE, DEFAULT_MAX_ITERATIONS,
    DEFAULT_ROUND_DECIMALS, DEFAULT_SCAN_PRECISION, DEFAULT_SDPA_EXECUTABLE, DEFAULT_TOLERANCE,
};
use crate::errors::ConfigError;
use crate::relaxation::{ColumnSpec, Direction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Complete description of one relaxation run.
///
/// A run configuration names the causal scenario, how the relaxation is built, the
/// observed data that constrains it, and how the resulting SDP is solved and exported.
/// It is typically loaded from a YAML file; TOML and JSON are accepted by extension.
///
/// # Example
/// ```yaml
/// name: triangle-ghz
/// scenario:
///   dag:
///     - node: lambda
///       children: [A, B]
///     - node: mu
///       children: [B, C]
///     - node: sigma
///       children: [A, C]
///   order: [A, B, C]
///   outcomes_per_party: [2, 2, 2]
///   settings_per_party: [1, 1, 1]
///   inflation_level_per_source: [2, 1, 1]
/// relaxation:
///   columns: local1
/// distribution:
///   kind: ghz
///   visibility: 0.5
/// solver:
///   backend: interior_point
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub relaxation: RelaxationConfig,
    #[serde(default)]
    pub distribution: Option<DistributionConfig>,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    #[serde(default)]
    pub bounds: BoundsConfig,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub certificate: CertificateConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub export: Option<PathBuf>,
}

impl RunConfig {
    /// Display name, falling back to a placeholder for anonymous runs
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

/// Causal scenario: the DAG plus cardinalities and inflation levels.
///
/// Latent sources are the DAG roots that are not named in `order`; they keep the
/// order in which they are declared, which is also the order of
/// `inflation_level_per_source`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScenarioConfig {
    pub dag: Vec<DagNode>,
    #[serde(default)]
    pub order: Vec<String>,
    pub outcomes_per_party: Vec<usize>,
    pub settings_per_party: Vec<usize>,
    #[serde(default)]
    pub inflation_level_per_source: Vec<usize>,
}

/// One DAG node and its children
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DagNode {
    pub node: String,
    #[serde(default)]
    pub children: Vec<String>,
}

impl DagNode {
    pub fn new(node: &str, children: &[&str]) -> Self {
        Self {
            node: node.to_string(),
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// How the moment matrix is generated
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelaxationConfig {
    #[serde(default)]
    pub commuting: bool,
    #[serde(default)]
    pub columns: ColumnSpec,
    /// Zero disables the limit
    #[serde(default)]
    pub max_monomial_length: usize,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            commuting: false,
            columns: ColumnSpec::default(),
            max_monomial_length: 0,
        }
    }
}

/// Observed distribution used to fix knowable moments
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistributionConfig {
    #[serde(flatten)]
    pub family: DistributionFamily,
    #[serde(default)]
    pub use_lpi_constraints: bool,
    #[serde(default)]
    pub shared_randomness: bool,
}

/// Distribution families.
///
/// `explicit` tables run over the axes `[outcomes per party..., settings per party...]`,
/// either as a nested array or as a flat row-major list with an optional `shape`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionFamily {
    Ghz {
        #[serde(default = "full_visibility")]
        visibility: f64,
    },
    W {
        #[serde(default = "full_visibility")]
        visibility: f64,
    },
    Uniform,
    Explicit {
        values: TableValues,
        #[serde(default)]
        shape: Option<Vec<usize>>,
    },
}

/// A probability table as written in a config file: a number or an array of tables
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TableValues {
    Number(f64),
    Nested(Vec<TableValues>),
}

impl TableValues {
    /// Extents of every axis and the entries in row-major order.
    ///
    /// `None` when sub-arrays of one axis differ in length or depth.
    pub fn to_shape_and_values(&self) -> Option<(Vec<usize>, Vec<f64>)> {
        match self {
            TableValues::Number(value) => Some((Vec::new(), vec![*value])),
            TableValues::Nested(items) => {
                let mut inner_shape: Option<Vec<usize>> = None;
                let mut values = Vec::new();
                for item in items {
                    let (shape, mut entries) = item.to_shape_and_values()?;
                    match &inner_shape {
                        Some(expected) if *expected != shape => return None,
                        Some(_) => {}
                        None => inner_shape = Some(shape),
                    }
                    values.append(&mut entries);
                }
                let mut shape = vec![items.len()];
                shape.extend(inner_shape.unwrap_or_default());
                Some((shape, values))
            }
        }
    }
}

impl From<Vec<f64>> for TableValues {
    fn from(values: Vec<f64>) -> Self {
        TableValues::Nested(values.into_iter().map(TableValues::Number).collect())
    }
}

fn full_visibility() -> f64 {
    1.0
}

impl DistributionFamily {
    /// Same family at another visibility; `None` for families without one
    pub fn with_visibility(&self, visibility: f64) -> Option<Self> {
        match self {
            DistributionFamily::Ghz { .. } => Some(DistributionFamily::Ghz { visibility }),
            DistributionFamily::W { .. } => Some(DistributionFamily::W { visibility }),
            _ => None,
        }
    }
}

/// Per-monomial bounds keyed by monomial name, probability symbol or operator product
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BoundsConfig {
    #[serde(default)]
    pub lower: BTreeMap<String, f64>,
    #[serde(default)]
    pub upper: BTreeMap<String, f64>,
}

/// Solver backend selection
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    #[default]
    InteriorPoint,
    Sdpa,
}

/// Solver options; unset values fall back to the constants in `config::consts`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub backend: SolverBackend,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<usize>,
    pub feasibility_tolerance: Option<f64>,
    #[serde(default)]
    pub feas_as_optim: bool,
    pub sdpa_executable: Option<String>,
}

impl SolverConfig {
    pub fn get_tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }

    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }

    pub fn get_feasibility_tolerance(&self) -> f64 {
        self.feasibility_tolerance
            .unwrap_or(DEFAULT_FEASIBILITY_TOLERANCE)
    }

    pub fn get_sdpa_executable(&self) -> &str {
        self.sdpa_executable
            .as_deref()
            .unwrap_or(DEFAULT_SDPA_EXECUTABLE)
    }
}

/// Certificate cleaning options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertificateConfig {
    #[serde(default = "default_clean")]
    pub clean: bool,
    pub chop_tol: Option<f64>,
    pub round_decimals: Option<u32>,
}

fn default_clean() -> bool {
    true
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            clean: true,
            chop_tol: None,
            round_decimals: None,
        }
    }
}

impl CertificateConfig {
    pub fn get_chop_tol(&self) -> f64 {
        self.chop_tol.unwrap_or(DEFAULT_CHOP_TOLERANCE)
    }

    pub fn get_round_decimals(&self) -> u32 {
        self.round_decimals.unwrap_or(DEFAULT_ROUND_DECIMALS)
    }
}

/// Visibility bisection window
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub low: f64,
    #[serde(default = "full_visibility")]
    pub high: f64,
    pub precision: Option<f64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 1.0,
            precision: None,
        }
    }
}

impl ScanConfig {
    pub fn get_precision(&self) -> f64 {
        self.precision.unwrap_or(DEFAULT_SCAN_PRECISION)
    }
}

/// Load a run config, choosing the parser from the file extension (YAML by default)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml")
        .to_ascii_lowercase();
    let cfg = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };
    Ok(cfg)
}

/// Load a run config and validate its causal scenario
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let cfg = load_config(path)?;

    crate::config::validate_scenario(&cfg.scenario).map_err(ConfigError::Validation)?;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CHSH_YAML: &str = r#"
name: chsh
scenario:
  dag:
    - node: rho
      children: [A, B]
  outcomes_per_party: [2, 2]
  settings_per_party: [2, 2]
relaxation:
  columns: npa1
objective: "A_1_0_0*B_1_0_0"
direction: max
"#;

    #[test]
    fn parse_basic_config() {
        let cfg: RunConfig = serde_yaml::from_str(CHSH_YAML).unwrap();
        assert_eq!(cfg.display_name(), "chsh");
        assert_eq!(cfg.scenario.dag.len(), 1);
        assert_eq!(cfg.scenario.dag[0].children, vec!["A", "B"]);
        assert!(cfg.scenario.inflation_level_per_source.is_empty());
        assert_eq!(cfg.relaxation.columns, ColumnSpec::Npa(1));
        assert_eq!(cfg.direction, Direction::Max);
        assert!(cfg.distribution.is_none());
    }

    #[test]
    fn test_solver_defaults() {
        let cfg: RunConfig = serde_yaml::from_str(CHSH_YAML).unwrap();
        assert_eq!(cfg.solver.backend, SolverBackend::InteriorPoint);
        assert_eq!(cfg.solver.get_tolerance(), DEFAULT_TOLERANCE);
        assert_eq!(cfg.solver.get_max_iterations(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(cfg.solver.get_sdpa_executable(), "sdpa");
        assert!(!cfg.solver.feas_as_optim);
        assert!(cfg.certificate.clean);
        assert_eq!(cfg.certificate.get_round_decimals(), DEFAULT_ROUND_DECIMALS);
    }

    #[test]
    fn test_distribution_family_is_flattened() {
        let yaml = r#"
scenario:
  dag:
    - node: lambda
      children: [A, B]
  outcomes_per_party: [2, 2]
  settings_per_party: [1, 1]
distribution:
  kind: ghz
  visibility: 0.25
  use_lpi_constraints: true
"#;
        let cfg: RunConfig = serde_yaml::from_str(yaml).unwrap();
        let dist = cfg.distribution.unwrap();
        assert_eq!(dist.family, DistributionFamily::Ghz { visibility: 0.25 });
        assert!(dist.use_lpi_constraints);
        assert!(!dist.shared_randomness);
    }

    #[test]
    fn test_explicit_table_forms() {
        let nested: DistributionConfig =
            serde_yaml::from_str("kind: explicit\nvalues: [[[0.5]], [[0.5]]]").unwrap();
        let DistributionFamily::Explicit { values, shape } = nested.family else {
            panic!("expected an explicit table");
        };
        assert_eq!(shape, None);
        assert_eq!(
            values.to_shape_and_values(),
            Some((vec![2, 1, 1], vec![0.5, 0.5]))
        );

        let flat: DistributionConfig =
            serde_yaml::from_str("kind: explicit\nvalues: [0.25, 0.75]\nshape: [2, 1]").unwrap();
        let DistributionFamily::Explicit { values, shape } = flat.family else {
            panic!("expected an explicit table");
        };
        assert_eq!(shape, Some(vec![2, 1]));
        assert_eq!(values.to_shape_and_values(), Some((vec![2], vec![0.25, 0.75])));
    }

    #[test]
    fn test_ragged_table_has_no_shape() {
        let ragged: TableValues = serde_json::from_str("[[0.5, 0.5], [1.0]]").unwrap();
        assert_eq!(ragged.to_shape_and_values(), None);
    }

    #[test]
    fn test_block_column_specification() {
        let yaml = r#"
scenario:
  dag:
    - node: lambda
      children: [A, B]
  outcomes_per_party: [2, 2]
  settings_per_party: [1, 1]
relaxation:
  commuting: true
  columns: [[], [0], [1], [0, 1]]
"#;
        let cfg: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.relaxation.commuting);
        assert_eq!(
            cfg.relaxation.columns,
            ColumnSpec::Blocks(vec![vec![], vec![0], vec![1], vec![0, 1]])
        );
    }

    #[test]
    fn test_with_visibility() {
        let ghz = DistributionFamily::Ghz { visibility: 1.0 };
        assert_eq!(
            ghz.with_visibility(0.3),
            Some(DistributionFamily::Ghz { visibility: 0.3 })
        );
        assert_eq!(DistributionFamily::Uniform.with_visibility(0.3), None);
    }

    #[test]
    fn test_load_and_validate_valid_config() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(CHSH_YAML.as_bytes()).unwrap();

        let result = load_and_validate_config(file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_toml_config() {
        let toml_text = r#"
name = "bell"
objective = "A_1_0_0"

[scenario]
outcomes_per_party = [2, 2]
settings_per_party = [2, 2]

[[scenario.dag]]
node = "rho"
children = ["A", "B"]
"#;
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(toml_text.as_bytes()).unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.display_name(), "bell");
        assert_eq!(cfg.scenario.settings_per_party, vec![2, 2]);
    }

    #[test]
    fn test_load_and_validate_cyclic_config() {
        let yaml = r#"
scenario:
  dag:
    - node: A
      children: [B]
    - node: B
      children: [A]
  order: [A, B]
  outcomes_per_party: [2, 2]
  settings_per_party: [1, 1]
"#;
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let result = load_and_validate_config(file.path());
        assert!(result.is_err());
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("Cyclic dependency detected"));
    }

    #[test]
    fn test_unsupported_extension() {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        file.write_all(b"[scenario]").unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
    }
}

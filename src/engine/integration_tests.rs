// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{RunConfig, ScanConfig};
use crate::engine::{run_config, scan_visibility, BatchRunner};
use crate::errors::RunError;
use crate::relaxation::RelaxationStatus;

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
objective: "2 - 4*A_1_0_0 - 4*B_1_0_0 + 4*A_1_0_0*B_1_0_0 + 4*A_1_0_0*B_1_1_0 + 4*A_1_1_0*B_1_0_0 - 4*A_1_1_0*B_1_1_0"
direction: max
"#;

const TRIANGLE_YAML: &str = r#"
name: triangle-ghz
scenario:
  dag:
    - node: lambda
      children: [A, B]
    - node: mu
      children: [B, C]
    - node: sigma
      children: [A, C]
  order: [A, B, C]
  outcomes_per_party: [2, 2, 2]
  settings_per_party: [1, 1, 1]
  inflation_level_per_source: [2, 1, 1]
relaxation:
  commuting: true
  columns: local1
distribution:
  kind: ghz
  visibility: 1.0
"#;

fn parse(yaml: &str) -> RunConfig {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_run_reports_optimum() {
    let report = run_config(&parse(CHSH_YAML)).unwrap();
    assert_eq!(report.name, "chsh");
    assert_eq!(report.status, RelaxationStatus::Optimal);
    assert!((report.objective_value.unwrap() - 2.0 * 2f64.sqrt()).abs() < 1e-4);
}

#[test]
fn test_run_reports_certificate_for_incompatible_data() {
    let report = run_config(&parse(TRIANGLE_YAML)).unwrap();
    assert_eq!(report.status, RelaxationStatus::Infeasible);
    assert!(!report.certificate.is_empty());
    let inequality = report.certificate_inequality.unwrap();
    assert!(inequality.ends_with(">= 0"));
}

#[test]
fn test_run_exports_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = parse(CHSH_YAML);
    cfg.export = Some(dir.path().join("chsh"));
    let report = run_config(&cfg).unwrap();
    let written = report.export.unwrap();
    assert_eq!(written, dir.path().join("chsh.dat-s"));
    assert!(written.exists());
}

#[tokio::test]
async fn test_batch_keeps_order_and_isolates_failures() {
    let mut broken = parse(CHSH_YAML);
    broken.name = Some("broken".to_string());
    broken.objective = Some("A_1_0_0*Z_1_0_0".to_string());

    let runner = BatchRunner::new(2);
    let results = runner
        .run(vec![parse(CHSH_YAML), broken, parse(TRIANGLE_YAML)])
        .await;

    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["chsh", "broken", "triangle-ghz"]);
    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(RunError::Relaxation(_))));
    assert!(results[2].1.is_ok());
}

#[test]
fn test_batch_concurrency_is_at_least_one() {
    assert_eq!(BatchRunner::new(0).max_concurrency(), 1);
    assert!(BatchRunner::default().max_concurrency() >= 1);
}

#[test]
fn test_scan_brackets_the_ghz_threshold() {
    let window = ScanConfig {
        low: 0.0,
        high: 1.0,
        precision: Some(0.02),
    };
    let report = scan_visibility(&parse(TRIANGLE_YAML), &window).unwrap();
    assert!((report.critical_visibility - 0.5).abs() < 0.05);
    assert_eq!(report.steps[0].visibility, 1.0);
    assert_eq!(report.steps[0].status, RelaxationStatus::Infeasible);
    assert_eq!(report.steps[1].status, RelaxationStatus::Feasible);
}

#[test]
fn test_scan_needs_a_family_with_visibility() {
    let window = ScanConfig::default();
    assert!(matches!(
        scan_visibility(&parse(CHSH_YAML), &window),
        Err(RunError::NothingToScan(_))
    ));

    let mut uniform = parse(TRIANGLE_YAML);
    if let Some(dist) = uniform.distribution.as_mut() {
        dist.family = crate::config::DistributionFamily::Uniform;
    }
    assert!(matches!(
        scan_visibility(&uniform, &window),
        Err(RunError::NothingToScan(_))
    ));
}

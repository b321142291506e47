#[cfg(test)]
mod integration_tests {
    use crate::config::{
        load_and_validate_config, DistributionFamily, SolverBackend,
    };
    use crate::relaxation::{ColumnSpec, Direction};
    use crate::scenario::InflationProblem;

    /// Test that the CHSH configuration loads with its objective
    #[test]
    fn test_chsh_yaml_loading() {
        let config = load_and_validate_config("configs/chsh.yaml").unwrap();

        assert_eq!(config.display_name(), "chsh");
        assert_eq!(config.relaxation.columns, ColumnSpec::Npa(1));
        assert!(!config.relaxation.commuting);
        assert_eq!(config.direction, Direction::Max);
        assert!(config.objective.unwrap().starts_with("2 - 4*A_1_0_0"));
        assert_eq!(config.solver.backend, SolverBackend::InteriorPoint);
        assert_eq!(config.solver.get_max_iterations(), 100);
    }

    /// Test the triangle configuration resolves sources in declaration order
    #[test]
    fn test_triangle_yaml_loading() {
        let config = load_and_validate_config("configs/triangle-ghz.yaml").unwrap();

        let problem = InflationProblem::from_config(&config.scenario).unwrap();
        assert_eq!(problem.names(), &["A", "B", "C"]);
        assert_eq!(problem.sources(), &["lambda", "mu", "sigma"]);
        assert_eq!(problem.inflation_level_per_source(), &[2, 1, 1]);

        let dist = config.distribution.unwrap();
        assert_eq!(dist.family, DistributionFamily::Ghz { visibility: 1.0 });
        assert!(!dist.use_lpi_constraints);
        assert_eq!(config.certificate.get_round_decimals(), 3);
        assert_eq!(config.scan.get_precision(), 1e-3);
        assert_eq!(
            config.export.unwrap().to_str(),
            Some("triangle-ghz.dat-s")
        );
    }

    /// Test a commuting relaxation with a parameter-free family
    #[test]
    fn test_bilocal_yaml_loading() {
        let config = load_and_validate_config("configs/bilocal.yaml").unwrap();

        assert!(config.relaxation.commuting);
        assert_eq!(config.relaxation.columns, ColumnSpec::Npa(2));
        assert_eq!(config.distribution.unwrap().family, DistributionFamily::Uniform);
        assert_eq!(config.scenario.inflation_level_per_source, vec![2, 2]);
    }

    /// Test that TOML configurations carry bounds and direction
    #[test]
    fn test_toml_bounds_loading() {
        let config = load_and_validate_config("configs/bell-bounds.toml").unwrap();

        assert_eq!(config.direction, Direction::Min);
        assert_eq!(config.bounds.lower.len(), 2);
        assert_eq!(config.bounds.lower["A_1_0_0"], 0.25);
        assert_eq!(config.bounds.upper["A_1_0_0"], 0.75);
        assert!(config.distribution.is_none());
    }

    /// Test that a missing file surfaces as an I/O error
    #[test]
    fn test_missing_config_file() {
        let result = load_and_validate_config("configs/does-not-exist.yaml");
        assert!(result.is_err());
    }
}

//! Tests for randomization configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        random_seed = 42

        [solver]
        timeout_ms = 1500

        [weights]
        uniformity = 2
        declared = 900

        [bias]
        integers = false
    "#;

    let config = RandomizeConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.random_seed, Some(42));
    assert_eq!(config.solver.timeout_ms, Some(1500));
    assert_eq!(
        config.weights(),
        Weights {
            uniformity: 2,
            declared: 900
        }
    );
    assert!(!config.bias.integers);
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        random_seed: 42
        solver:
          timeout_ms: 250
        bias:
          integers: true
    "#;

    let config = RandomizeConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.random_seed, Some(42));
    assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
    assert_eq!(config.weights(), Weights::default());
}

#[test]
fn test_defaults() {
    let config = RandomizeConfig::from_toml_str("").unwrap();
    assert_eq!(config, RandomizeConfig::default());
    assert_eq!(config.random_seed, None);
    assert_eq!(config.timeout(), None);
    assert_eq!(config.weights(), Weights::default());
    assert!(config.bias.integers);
}

#[test]
fn test_builder() {
    let config = RandomizeConfig::new()
        .with_random_seed(123)
        .with_timeout_ms(60)
        .with_integer_bias(false);

    assert_eq!(config.random_seed, Some(123));
    assert_eq!(config.timeout(), Some(Duration::from_millis(60)));
    assert!(!config.bias.integers);
}

#[test]
fn test_declared_weight_must_dominate() {
    let toml = r#"
        [weights]
        uniformity = 10
        declared = 10
    "#;
    let err = RandomizeConfig::from_toml_str(toml).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_zero_timeout_is_rejected() {
    let err = RandomizeConfig::from_yaml_str("solver:\n  timeout_ms: 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_missing_file() {
    let err = RandomizeConfig::load("/nonexistent/randforge.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_round_trip_through_toml() {
    let config = RandomizeConfig::new().with_random_seed(9).with_timeout_ms(100);
    let text = toml::to_string(&config).unwrap();
    assert_eq!(RandomizeConfig::from_toml_str(&text).unwrap(), config);
}

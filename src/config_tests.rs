use crate::config::{Config, DEFAULT_MODEL_DIR};
use std::collections::HashMap;
use std::path::PathBuf;

fn config_with(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_source(|key| vars.get(key).cloned())
}

#[test]
fn test_config_defaults() {
    let config = config_with(&[]).unwrap();

    assert_eq!(config.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
    assert_eq!(config.training_seed, 42);
    assert!(!config.eager_init);
    assert!(!config.force_retrain);
    assert!(config.use_ensemble);
    assert_eq!(config.cache_capacity, 10_000);
    assert!(config.metrics_enabled);
}

#[test]
fn test_config_overrides() {
    let config = config_with(&[
        ("PRICE_MODEL_DIR", "/var/lib/pricing"),
        ("PRICE_MODEL_SEED", "7"),
        ("PRICE_MODEL_EAGER_INIT", "true"),
        ("PRICE_MODEL_FORCE_RETRAIN", "true"),
        ("PRICE_USE_ENSEMBLE", "false"),
        ("PREDICTION_CACHE_CAPACITY", " 256 "),
        ("METRICS_ENABLED", "false"),
    ])
    .unwrap();

    assert_eq!(config.model_dir, PathBuf::from("/var/lib/pricing"));
    assert_eq!(config.training_seed, 7);
    assert!(config.eager_init);
    assert!(config.force_retrain);
    assert!(!config.use_ensemble);
    assert_eq!(config.cache_capacity, 256);
    assert!(!config.metrics_enabled);
}

#[test]
fn test_invalid_model_values_are_errors() {
    let err = config_with(&[("PRICE_MODEL_SEED", "forty-two")]).unwrap_err();
    assert!(format!("{:#}", err).contains("PRICE_MODEL_SEED"));

    assert!(config_with(&[("PRICE_MODEL_EAGER_INIT", "yes")]).is_err());
}

#[test]
fn test_cache_capacity_must_be_positive() {
    let err = config_with(&[("PREDICTION_CACHE_CAPACITY", "0")]).unwrap_err();
    assert!(format!("{:#}", err).contains("PREDICTION_CACHE_CAPACITY"));
    assert!(config_with(&[("PREDICTION_CACHE_CAPACITY", "-1")]).is_err());
}

#[test]
fn test_invalid_metrics_flag_falls_back_to_enabled() {
    let config = config_with(&[("METRICS_ENABLED", "maybe")]).unwrap();
    assert!(config.metrics_enabled);
}

#[test]
fn test_blank_model_dir_uses_default() {
    let config = config_with(&[("PRICE_MODEL_DIR", "  ")]).unwrap();
    assert_eq!(config.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
}

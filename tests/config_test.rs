//! Integration tests for Settings loading with layered merge semantics.
//!
//! These tests run without CATFISH_* variables (those live in config_env_test.rs),
//! so they test local config merging with defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use catfish::application::{ApplicationError, OutputFormat};
use catfish::config::{local_config_path, Settings};
use catfish::domain::{DenominatorPolicy, SignificanceMode};

#[test]
fn given_no_local_config_when_load_then_defaults() {
    let project = TempDir::new().unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.input.partition, "0");
    assert_eq!(settings.significance.p_value_threshold, 0.05);
}

#[test]
fn given_local_config_when_load_then_overrides_only_given_keys() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        r#"
[significance]
mode = "p-value-threshold"
p_value_threshold = 0.01

[aggregation]
denominator = "significant-rate-categories"

[output]
dir = "/tmp/pss-reports"
format = "mean-only"
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.significance.mode, SignificanceMode::PValueThreshold);
    assert_eq!(settings.significance.p_value_threshold, 0.01);
    assert_eq!(
        settings.aggregation.denominator,
        DenominatorPolicy::SignificantRateCategories
    );
    assert_eq!(settings.output.dir, PathBuf::from("/tmp/pss-reports"));
    assert_eq!(settings.output.format, OutputFormat::MeanOnly);
    assert_eq!(settings.input.partition, "0");
}

#[test]
fn given_tilde_table_path_when_load_then_expanded() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "[input]\nbh_table = \"~/bh.tsv\"\n",
    )
    .unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    let home = std::env::var("HOME").expect("HOME should be set");
    assert_eq!(
        settings.input.bh_table,
        Some(PathBuf::from(home).join("bh.tsv"))
    );
}

#[test]
fn given_unknown_enum_value_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "[significance]\nmode = \"coin-flip\"\n",
    )
    .unwrap();

    let result = Settings::load(Some(project.path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_threshold_above_one_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "[significance]\np_value_threshold = 1.5\n",
    )
    .unwrap();

    let err = Settings::load(Some(project.path())).unwrap_err();

    assert!(err.to_string().contains("p_value_threshold"), "{err}");
}

#[test]
fn given_loaded_settings_when_to_toml_then_round_trips_through_local_config() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "[input]\npartition = \"1\"\n",
    )
    .unwrap();
    let settings = Settings::load(Some(project.path())).unwrap();

    let other = TempDir::new().unwrap();
    fs::write(local_config_path(other.path()), settings.to_toml().unwrap()).unwrap();
    let reloaded = Settings::load(Some(other.path())).unwrap();

    assert_eq!(reloaded, settings);
}

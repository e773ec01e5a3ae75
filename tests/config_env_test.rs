//! CATFISH_* environment overrides.
//!
//! Environment variables are process-wide, so everything runs in one test.

use std::fs;

use tempfile::TempDir;

use catfish::application::ApplicationError;
use catfish::config::{local_config_path, Settings};
use catfish::domain::{DenominatorPolicy, SignificanceMode};

#[test]
fn given_env_vars_when_load_then_override_local_config() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "[significance]\nmode = \"rejection-table\"\n\n[input]\npartition = \"3\"\n",
    )
    .unwrap();

    std::env::set_var("CATFISH_SIGNIFICANCE__MODE", "p-value-threshold");
    std::env::set_var("CATFISH_SIGNIFICANCE__P_VALUE_THRESHOLD", "0.1");
    std::env::set_var("CATFISH_AGGREGATION__DENOMINATOR", "significant-rate-categories");
    std::env::set_var("CATFISH_INPUT__BH_TABLE", "/data/bh.tsv");

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.significance.mode, SignificanceMode::PValueThreshold);
    assert_eq!(settings.significance.p_value_threshold, 0.1);
    assert_eq!(
        settings.aggregation.denominator,
        DenominatorPolicy::SignificantRateCategories
    );
    assert_eq!(
        settings.input.bh_table.as_deref(),
        Some(std::path::Path::new("/data/bh.tsv"))
    );
    // untouched by env
    assert_eq!(settings.input.partition, "3");

    std::env::set_var("CATFISH_AGGREGATION__DENOMINATOR", "median");
    let result = Settings::load(Some(project.path()));
    assert!(matches!(result, Err(ApplicationError::Config { .. })));

    for key in [
        "CATFISH_SIGNIFICANCE__MODE",
        "CATFISH_SIGNIFICANCE__P_VALUE_THRESHOLD",
        "CATFISH_AGGREGATION__DENOMINATOR",
        "CATFISH_INPUT__BH_TABLE",
    ] {
        std::env::remove_var(key);
    }
}

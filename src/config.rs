//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/catfish/catfish.toml`
//! 3. Local config: `<project_dir>/.catfish.toml`
//! 4. Environment variables: `CATFISH_*` prefix, `__` between section and key
//!    (e.g. `CATFISH_SIGNIFICANCE__MODE=p-value-threshold`)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::PssOptions;
use crate::application::{ApplicationError, OutputFormat, DEFAULT_PARTITION};
use crate::domain::{DenominatorPolicy, SignificanceMode, DEFAULT_P_VALUE_THRESHOLD};
use crate::util::path::PathExt;

/// How branches are judged significant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignificanceConfig {
    /// `rejection-table` (BH flags from the significance table) or `p-value-threshold`
    pub mode: SignificanceMode,
    /// Cutoff for corrected p-values in `p-value-threshold` mode (strict `<`)
    pub p_value_threshold: f64,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            mode: SignificanceMode::default(),
            p_value_threshold: DEFAULT_P_VALUE_THRESHOLD,
        }
    }
}

/// Denominator of the per-leaf mean.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AggregationConfig {
    pub denominator: DenominatorPolicy,
}

/// Input locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    /// Partition key of the result document (`input.trees[partition]`)
    pub partition: String,
    /// BH significance table (TSV: gene, tree, branch, rejected)
    pub bh_table: Option<PathBuf>,
    /// Functional category table (CSV: File name, Functional Category, ...)
    pub annotation_table: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            partition: DEFAULT_PARTITION.to_string(),
            bh_table: None,
            annotation_table: None,
        }
    }
}

/// Report destination and shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            format: OutputFormat::default(),
        }
    }
}

/// Raw settings for intermediate parsing (every field optional to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub significance: RawSignificanceConfig,
    pub aggregation: RawAggregationConfig,
    pub input: RawInputConfig,
    pub output: RawOutputConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSignificanceConfig {
    pub mode: Option<SignificanceMode>,
    pub p_value_threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawAggregationConfig {
    pub denominator: Option<DenominatorPolicy>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawInputConfig {
    pub partition: Option<String>,
    pub bh_table: Option<PathBuf>,
    pub annotation_table: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
}

/// Unified configuration for catfish.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub significance: SignificanceConfig,
    pub aggregation: AggregationConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Get the XDG config directory for catfish.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "catfish").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("catfish.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".catfish.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand `~` and `$VAR` in path-like fields.
    fn expand_paths(&mut self) {
        self.input.bh_table = self.input.bh_table.as_deref().map(|p| p.expand());
        self.input.annotation_table = self.input.annotation_table.as_deref().map(|p| p.expand());
        self.output.dir = self.output.dir.expand();
    }

    /// Overlay wins for every field it specifies.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            significance: SignificanceConfig {
                mode: overlay.significance.mode.unwrap_or(self.significance.mode),
                p_value_threshold: overlay
                    .significance
                    .p_value_threshold
                    .unwrap_or(self.significance.p_value_threshold),
            },
            aggregation: AggregationConfig {
                denominator: overlay
                    .aggregation
                    .denominator
                    .unwrap_or(self.aggregation.denominator),
            },
            input: InputConfig {
                partition: overlay
                    .input
                    .partition
                    .clone()
                    .unwrap_or_else(|| self.input.partition.clone()),
                bh_table: overlay
                    .input
                    .bh_table
                    .clone()
                    .or_else(|| self.input.bh_table.clone()),
                annotation_table: overlay
                    .input
                    .annotation_table
                    .clone()
                    .or_else(|| self.input.annotation_table.clone()),
            },
            output: OutputConfig {
                dir: overlay
                    .output
                    .dir
                    .clone()
                    .unwrap_or_else(|| self.output.dir.clone()),
                format: overlay.output.format.unwrap_or(self.output.format),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory holding a local `.catfish.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/catfish/catfish.toml`
    /// 3. Local config: `<project_dir>/.catfish.toml`
    /// 4. Environment variables: `CATFISH_*` prefix
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(project) = project_dir {
            let local_path = local_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply CATFISH_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("CATFISH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("significance.mode") {
            settings.significance.mode = parse_env("significance.mode", &val)?;
        }
        if let Ok(val) = config.get_string("significance.p_value_threshold") {
            settings.significance.p_value_threshold =
                parse_env("significance.p_value_threshold", &val)?;
        }
        if let Ok(val) = config.get_string("aggregation.denominator") {
            settings.aggregation.denominator = parse_env("aggregation.denominator", &val)?;
        }
        if let Ok(val) = config.get_string("input.partition") {
            settings.input.partition = val;
        }
        if let Ok(val) = config.get_string("input.bh_table") {
            settings.input.bh_table = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("input.annotation_table") {
            settings.input.annotation_table = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("output.dir") {
            settings.output.dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("output.format") {
            settings.output.format = parse_env("output.format", &val)?;
        }

        Ok(settings)
    }

    /// Reject values no computation can use.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let threshold = self.significance.p_value_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(ApplicationError::Config {
                message: format!("p_value_threshold must be in (0, 1], got {threshold}"),
            });
        }
        if self.input.partition.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "partition must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Computation options derived from these settings.
    pub fn pss_options(&self) -> PssOptions {
        PssOptions {
            significance: self.significance.mode,
            p_value_threshold: self.significance.p_value_threshold,
            denominator: self.aggregation.denominator,
            partition: self.input.partition.clone(),
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# catfish configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/catfish/catfish.toml
#   Local:  <project_dir>/.catfish.toml
#   Env:    CATFISH_<SECTION>__<KEY>, e.g. CATFISH_SIGNIFICANCE__MODE=p-value-threshold
# Command-line flags override all of them for one run.

[significance]
# "rejection-table": branch is significant when the BH table marks it rejected ("True")
# "p-value-threshold": branch is significant when its Corrected P-value < p_value_threshold
# mode = "rejection-table"
# p_value_threshold = 0.05

[aggregation]
# "all-branches": every branch between leaf and root counts in the denominator
# "significant-rate-categories": each rate class > 1 on a significant branch counts
# denominator = "all-branches"

[input]
# Partition of the aBSREL document (input.trees / branch attributes key)
# partition = "0"
# bh_table = "~/data/bh_corrected.tsv"
# annotation_table = "~/data/functional_categories.csv"

[output]
# dir = "."
# "annotated" or "mean-only"
# format = "annotated"
"#
        .to_string()
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ApplicationError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| ApplicationError::Config {
        message: format!("CATFISH {key}: {e}"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_matches_reference_pipeline() {
        let settings = Settings::default();
        assert_eq!(settings.significance.mode, SignificanceMode::RejectionTable);
        assert_eq!(settings.significance.p_value_threshold, 0.05);
        assert_eq!(settings.aggregation.denominator, DenominatorPolicy::AllBranches);
        assert_eq!(settings.input.partition, "0");
        assert_eq!(settings.output.format, OutputFormat::Annotated);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn given_partial_overlay_when_merging_then_overlay_wins_only_where_set() {
        let base = Settings::default();
        let overlay: RawSettings = toml::from_str(
            r#"
[significance]
mode = "p-value-threshold"

[input]
bh_table = "/data/bh.tsv"
"#,
        )
        .unwrap();

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.significance.mode, SignificanceMode::PValueThreshold);
        assert_eq!(merged.significance.p_value_threshold, 0.05);
        assert_eq!(merged.input.bh_table, Some(PathBuf::from("/data/bh.tsv")));
        assert_eq!(merged.input.annotation_table, None);
        assert_eq!(merged.output, OutputConfig::default());
    }

    #[test]
    fn given_tilde_in_paths_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings::default();
        settings.input.bh_table = Some(PathBuf::from("~/bh.tsv"));
        settings.output.dir = PathBuf::from("$HOME/out");

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let bh = settings.input.bh_table.unwrap();
        assert!(bh.starts_with(&home), "bh_table should start with home: {}", bh.display());
        assert!(settings.output.dir.starts_with(&home));
    }

    #[test]
    fn given_out_of_range_threshold_when_validating_then_config_error() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let mut settings = Settings::default();
            settings.significance.p_value_threshold = bad;
            assert!(
                matches!(settings.validate(), Err(ApplicationError::Config { .. })),
                "threshold {bad} should be rejected"
            );
        }
    }

    #[test]
    fn given_settings_when_serializing_then_template_and_toml_parse_back() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.significance.mode.is_none());

        let mut settings = Settings::default();
        settings.aggregation.denominator = DenominatorPolicy::SignificantRateCategories;
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn given_settings_when_deriving_options_then_copies_fields() {
        let mut settings = Settings::default();
        settings.significance.mode = SignificanceMode::PValueThreshold;
        settings.significance.p_value_threshold = 0.01;
        settings.input.partition = "1".into();

        let options = settings.pss_options();

        assert_eq!(options.significance, SignificanceMode::PValueThreshold);
        assert_eq!(options.p_value_threshold, 0.01);
        assert_eq!(options.partition, "1");
    }
}

//! Per-leaf PSS report and its JSON rendering.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::LeafResult;

/// Suffix of report files written next to other reports in the output directory.
pub const REPORT_SUFFIX: &str = ".pss.json";

/// Shape of the JSON report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// `{ leaf: { meanPss, functionalCategory, functionalCategoryAnalyses } }`
    #[default]
    Annotated,
    /// `{ leaf: meanPss }`
    MeanOnly,
}

impl OutputFormat {
    pub const VARIANTS: &'static [&'static str] = &["annotated", "mean-only"];
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Annotated => f.write_str("annotated"),
            OutputFormat::MeanOnly => f.write_str("mean-only"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "annotated" => Ok(OutputFormat::Annotated),
            "mean-only" => Ok(OutputFormat::MeanOnly),
            other => Err(format!(
                "unknown value '{}', expected one of: {}",
                other,
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

/// Result of one (gene, tree) computation.
#[derive(Debug, Clone, PartialEq)]
pub struct PssReport {
    /// Result document the report was computed from
    pub source: PathBuf,
    /// Result file name without directory and extension; the annotation key
    pub key: String,
    pub gene: String,
    pub tree: String,
    /// Output records keyed by leaf name
    pub records: BTreeMap<String, LeafResult>,
}

impl PssReport {
    /// Pretty-printed JSON (2-space indentation).
    pub fn to_json(&self, format: OutputFormat) -> ApplicationResult<String> {
        let rendered = match format {
            OutputFormat::Annotated => serde_json::to_string_pretty(&self.records),
            OutputFormat::MeanOnly => {
                let means: BTreeMap<&str, f64> = self
                    .records
                    .iter()
                    .map(|(leaf, record)| (leaf.as_str(), record.mean_pss))
                    .collect();
                serde_json::to_string_pretty(&means)
            }
        };
        rendered.map_err(|e| ApplicationError::OperationFailed {
            context: format!("serialize report for {}", self.source.display()),
            source: Box::new(e),
        })
    }

    /// Report file location inside `output_dir`.
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}{}", self.key, REPORT_SUFFIX))
    }
}

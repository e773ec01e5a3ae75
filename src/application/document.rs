//! aBSREL result document: tree topology and per-branch selection results.
//!
//! Only the parts needed for PSS are read:
//! ```text
//! { "input": { "trees": { "0": "<newick>" } },
//!   "branch attributes": { "0": { "<node>": { "Corrected P-value": 0.01,
//!                                             "Rate Distributions": [[1.5, 0.3], ...] } } } }
//! ```
//! Numbers may also be given as numeric strings. Other keys are ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::error_ext::PathContextExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    BranchAttributeMap, BranchAttributes, DomainResult, PhyloTree, RateCategory, TreeBuilder,
};
use crate::infrastructure::traits::FileSystem;

/// Partition read unless configured otherwise.
pub const DEFAULT_PARTITION: &str = "0";

#[derive(Debug, Deserialize)]
struct RawDocument {
    input: RawInput,
    #[serde(rename = "branch attributes")]
    branch_attributes: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    trees: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBranch {
    #[serde(rename = "Corrected P-value")]
    corrected_p_value: Option<Numeric>,
    #[serde(rename = "Rate Distributions")]
    rate_distributions: Vec<Vec<Numeric>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Tree and branch attributes of one partition of a result document.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Document the data was read from
    pub path: PathBuf,
    /// Partition key inside the document
    pub partition: String,
    /// Newick topology as stored in the document
    pub newick: String,
    /// Branch attributes keyed by node name
    pub branch_attributes: BranchAttributeMap,
}

impl SelectionResult {
    /// Read and parse a result document.
    #[instrument(level = "debug", skip(fs))]
    pub fn load(fs: &dyn FileSystem, path: &Path, partition: &str) -> ApplicationResult<Self> {
        let content = fs
            .read_to_string(path)
            .with_path_context("read result document", path)?;
        Self::parse(&content, path, partition)
    }

    /// Parse document content; `path` is only used for error messages.
    pub fn parse(content: &str, path: &Path, partition: &str) -> ApplicationResult<Self> {
        let invalid = |message: String| ApplicationError::InvalidDocument {
            path: path.to_path_buf(),
            message,
        };

        let raw: RawDocument = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

        let newick = raw
            .input
            .trees
            .get(partition)
            .cloned()
            .ok_or_else(|| invalid(format!("no tree for partition '{partition}'")))?;

        let branches = raw
            .branch_attributes
            .get(partition)
            .ok_or_else(|| invalid(format!("no branch attributes for partition '{partition}'")))?;
        let branches: HashMap<String, RawBranch> = serde_json::from_value(branches.clone())
            .map_err(|e| invalid(format!("branch attributes: {e}")))?;

        let mut branch_attributes = BranchAttributeMap::with_capacity(branches.len());
        for (node, raw_branch) in branches {
            let attributes = convert_branch(&node, raw_branch).map_err(invalid)?;
            branch_attributes.insert(node, attributes);
        }
        debug!(
            "partition {}: {} branch records",
            partition,
            branch_attributes.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            partition: partition.to_string(),
            newick,
            branch_attributes,
        })
    }

    /// Parse the stored topology into a named tree.
    pub fn tree(&self) -> DomainResult<PhyloTree> {
        TreeBuilder::parse(&self.newick)
    }
}

fn convert_branch(node: &str, raw: RawBranch) -> Result<BranchAttributes, String> {
    let corrected_p_value = match raw.corrected_p_value {
        Some(p) => Some(
            p.value()
                .ok_or_else(|| format!("branch '{node}': Corrected P-value is not a number"))?,
        ),
        None => None,
    };

    let rate_distributions = raw
        .rate_distributions
        .iter()
        .enumerate()
        .map(|(i, pair)| match pair.as_slice() {
            [rate, weight, ..] => match (rate.value(), weight.value()) {
                (Some(rate), Some(weight)) if !rate.is_finite() || !weight.is_finite() => Err(
                    format!("branch '{node}': rate class {i} is not finite"),
                ),
                (Some(_), Some(weight)) if weight < 0.0 => Err(format!(
                    "branch '{node}': rate class {i} has negative weight {weight}"
                )),
                (Some(rate), Some(weight)) => Ok(RateCategory::new(rate, weight)),
                _ => Err(format!("branch '{node}': rate class {i} is not numeric")),
            },
            _ => Err(format!(
                "branch '{node}': rate class {i} needs a rate and a weight"
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BranchAttributes {
        corrected_p_value,
        rate_distributions,
    })
}

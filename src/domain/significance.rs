//! Branch significance: rejection-table lookup or corrected p-value cutoff.

use std::collections::HashMap;

use crate::domain::entities::BranchAttributeMap;
use crate::domain::error::{DomainError, DomainResult};

/// Cutoff applied to corrected p-values unless configured otherwise.
pub const DEFAULT_P_VALUE_THRESHOLD: f64 = 0.05;

/// Decides whether the branch leading to a node counts as under selection.
pub trait SignificanceResolver {
    fn is_significant(&self, node_name: &str) -> DomainResult<bool>;
}

/// Rejection flags of one (gene, tree) pair, keyed by branch name.
///
/// Branches without an entry are not significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionTable {
    rejected: HashMap<String, bool>,
}

impl RejectionTable {
    pub fn new(rejected: HashMap<String, bool>) -> Self {
        Self { rejected }
    }

    pub fn is_empty(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn get(&self, branch: &str) -> Option<bool> {
        self.rejected.get(branch).copied()
    }
}

impl FromIterator<(String, bool)> for RejectionTable {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl SignificanceResolver for RejectionTable {
    fn is_significant(&self, node_name: &str) -> DomainResult<bool> {
        Ok(self.get(node_name).unwrap_or(false))
    }
}

/// Significant when the branch's corrected p-value is strictly below `cutoff`.
///
/// Every branch on a walked path must carry a p-value.
#[derive(Debug, Clone, Copy)]
pub struct PValueThreshold<'a> {
    attributes: &'a BranchAttributeMap,
    cutoff: f64,
}

impl<'a> PValueThreshold<'a> {
    pub fn new(attributes: &'a BranchAttributeMap, cutoff: f64) -> Self {
        Self { attributes, cutoff }
    }
}

impl SignificanceResolver for PValueThreshold<'_> {
    fn is_significant(&self, node_name: &str) -> DomainResult<bool> {
        let attributes =
            self.attributes
                .get(node_name)
                .ok_or_else(|| DomainError::MissingAttribute {
                    node: node_name.to_string(),
                    attribute: "branch attributes",
                })?;
        let p_value = attributes
            .corrected_p_value
            .ok_or_else(|| DomainError::MissingAttribute {
                node: node_name.to_string(),
                attribute: "corrected p-value",
            })?;
        Ok(p_value < self.cutoff)
    }
}

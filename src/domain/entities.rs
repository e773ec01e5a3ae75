//! Domain entities: core data structures

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sentinel used when no annotation row matches a result file.
pub const UNKNOWN: &str = "UNKNOWN";

/// One rate class of a branch's rate distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCategory {
    /// Evolutionary rate (omega) of the class
    pub rate: f64,
    /// Proportion of sites assigned to the class
    pub weight: f64,
}

impl RateCategory {
    pub fn new(rate: f64, weight: f64) -> Self {
        Self { rate, weight }
    }

    /// Rate strictly above neutral: the class is under positive selection.
    pub fn is_positive(&self) -> bool {
        self.rate > 1.0
    }
}

/// Selection-test results for one branch, keyed by the node the branch leads to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchAttributes {
    /// Multiple-testing corrected p-value, absent for untested branches
    pub corrected_p_value: Option<f64>,
    /// Rate classes in the order the selection test reported them
    pub rate_distributions: Vec<RateCategory>,
}

impl BranchAttributes {
    /// Rate classes with rate > 1.0.
    pub fn positive_categories(&self) -> impl Iterator<Item = &RateCategory> {
        self.rate_distributions.iter().filter(|c| c.is_positive())
    }
}

/// Branch attributes of one tree, keyed by node name.
pub type BranchAttributeMap = HashMap<String, BranchAttributes>;

/// Mean PSS per leaf name.
pub type MeanPssMap = BTreeMap<String, f64>;

/// Functional-category annotation of one result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub functional_category: String,
    pub functional_category_analyses: String,
}

impl Annotation {
    pub fn new(
        functional_category: impl Into<String>,
        functional_category_analyses: impl Into<String>,
    ) -> Self {
        Self {
            functional_category: functional_category.into(),
            functional_category_analyses: functional_category_analyses.into(),
        }
    }

    /// The `("UNKNOWN", "UNKNOWN")` pair used when the table has no matching row.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

impl Default for Annotation {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Output record for one leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafResult {
    pub mean_pss: f64,
    pub functional_category: String,
    pub functional_category_analyses: String,
}

/// Which branches make up the denominator of the mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenominatorPolicy {
    /// Every branch on the leaf-to-root path counts once, significant or not
    #[default]
    AllBranches,
    /// Each rate class with rate > 1.0 on a significant branch counts once
    SignificantRateCategories,
}

/// How branch significance is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignificanceMode {
    /// Benjamini-Hochberg rejection flags from the significance table
    #[default]
    RejectionTable,
    /// Corrected p-value from the result document below a cutoff
    PValueThreshold,
}

macro_rules! kebab_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const VARIANTS: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown value '{}', expected one of: {}",
                        other,
                        $ty::VARIANTS.join(", ")
                    )),
                }
            }
        }
    };
}

kebab_enum!(DenominatorPolicy {
    AllBranches => "all-branches",
    SignificantRateCategories => "significant-rate-categories",
});

kebab_enum!(SignificanceMode {
    RejectionTable => "rejection-table",
    PValueThreshold => "p-value-threshold",
});

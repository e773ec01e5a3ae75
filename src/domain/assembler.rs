//! Joins per-leaf mean PSS with the annotation of the result file.

use std::collections::BTreeMap;

use crate::domain::entities::{Annotation, LeafResult, MeanPssMap};

/// Builds one output record per leaf. The annotation describes the whole result file and is
/// shared by every leaf.
pub fn assemble(mean_pss: &MeanPssMap, annotation: &Annotation) -> BTreeMap<String, LeafResult> {
    mean_pss
        .iter()
        .map(|(leaf, &mean)| {
            let record = LeafResult {
                mean_pss: mean,
                functional_category: annotation.functional_category.clone(),
                functional_category_analyses: annotation.functional_category_analyses.clone(),
            };
            (leaf.clone(), record)
        })
        .collect()
}

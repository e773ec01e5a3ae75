//! Mean PSS aggregation along leaf-to-root paths.

use tracing::{debug, instrument, trace};

use crate::domain::arena::{NodeId, PhyloTree};
use crate::domain::entities::{BranchAttributeMap, DenominatorPolicy, MeanPssMap};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::significance::SignificanceResolver;

/// Computes the mean proportion of sites under positive selection for every leaf.
///
/// For each leaf the path up to (but excluding) the root is walked. On every significant
/// branch the weights of rate classes with rate > 1.0 are summed; the sum is divided by the
/// count chosen by `denominator`, or is 0.0 when that count is zero.
#[instrument(level = "debug", skip(tree, attributes, significance), fields(nodes = tree.len()))]
pub fn compute_mean_pss(
    tree: &PhyloTree,
    attributes: &BranchAttributeMap,
    significance: &dyn SignificanceResolver,
    denominator: DenominatorPolicy,
) -> DomainResult<MeanPssMap> {
    if tree.is_empty() {
        return Err(DomainError::parse("empty tree"));
    }

    let mut result = MeanPssMap::new();
    for leaf in tree.leaves() {
        let mean = leaf_mean_pss(tree, leaf, attributes, significance, denominator)?;
        let name = tree.name(leaf)?;
        trace!("leaf {}: mean pss {}", name, mean);
        result.insert(name.to_string(), mean);
    }
    debug!("computed mean pss for {} leaves", result.len());
    Ok(result)
}

fn leaf_mean_pss(
    tree: &PhyloTree,
    leaf: NodeId,
    attributes: &BranchAttributeMap,
    significance: &dyn SignificanceResolver,
    denominator: DenominatorPolicy,
) -> DomainResult<f64> {
    let mut pss_sum = 0.0;
    let mut pss_count = 0.0;
    let mut node = leaf;

    while !tree.is_root(node) {
        let name = tree.name(node)?;
        if denominator == DenominatorPolicy::AllBranches {
            pss_count += 1.0;
        }

        if significance.is_significant(name)? {
            let branch = attributes
                .get(name)
                .ok_or_else(|| DomainError::MissingAttribute {
                    node: name.to_string(),
                    attribute: "branch attributes",
                })?;
            for category in branch.positive_categories() {
                pss_sum += category.weight;
                if denominator == DenominatorPolicy::SignificantRateCategories {
                    pss_count += 1.0;
                }
            }
        }

        node = tree.parent(node)?;
    }

    if pss_count > 0.0 {
        Ok(pss_sum / pss_count)
    } else {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::builder::TreeBuilder;
    use crate::domain::entities::{BranchAttributes, RateCategory};
    use crate::domain::significance::{PValueThreshold, RejectionTable, DEFAULT_P_VALUE_THRESHOLD};

    const EPS: f64 = 1e-12;

    fn branch(p: f64, rates: &[(f64, f64)]) -> BranchAttributes {
        BranchAttributes {
            corrected_p_value: Some(p),
            rate_distributions: rates
                .iter()
                .map(|&(rate, weight)| RateCategory::new(rate, weight))
                .collect(),
        }
    }

    fn only(names: &[&str]) -> RejectionTable {
        names.iter().map(|n| (n.to_string(), true)).collect()
    }

    /// `(A:1,(B:1,C:1)BC:1);` with only BC under selection.
    fn scenario() -> (PhyloTree, BranchAttributeMap) {
        let tree = TreeBuilder::parse("(A:1,(B:1,C:1)BC:1);").unwrap();
        let mut attrs = BranchAttributeMap::new();
        attrs.insert("BC".into(), branch(0.01, &[(1.5, 0.3), (0.8, 0.7)]));
        (tree, attrs)
    }

    #[test]
    fn given_significant_ancestor_when_all_branches_then_divides_by_path_length() {
        let (tree, attrs) = scenario();
        let result =
            compute_mean_pss(&tree, &attrs, &only(&["BC"]), DenominatorPolicy::AllBranches)
                .unwrap();

        assert!((result["B"] - 0.15).abs() < EPS);
        assert!((result["C"] - 0.15).abs() < EPS);
        assert_eq!(result["A"], 0.0);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn given_significant_ancestor_when_rate_categories_then_divides_by_qualifying_classes() {
        let (tree, attrs) = scenario();
        let result = compute_mean_pss(
            &tree,
            &attrs,
            &only(&["BC"]),
            DenominatorPolicy::SignificantRateCategories,
        )
        .unwrap();

        assert!((result["B"] - 0.3).abs() < EPS);
        assert_eq!(result["A"], 0.0);
    }

    #[test]
    fn given_multiple_positive_classes_when_policies_differ_then_means_diverge() {
        let tree = TreeBuilder::parse("((A,B)X,C);").unwrap();
        let mut attrs = BranchAttributeMap::new();
        attrs.insert("A".into(), branch(0.01, &[(2.0, 0.2), (5.0, 0.1), (0.1, 0.7)]));
        attrs.insert("X".into(), branch(0.5, &[(3.0, 0.4)]));
        let table = only(&["A"]);

        let all = compute_mean_pss(&tree, &attrs, &table, DenominatorPolicy::AllBranches).unwrap();
        let categories = compute_mean_pss(
            &tree,
            &attrs,
            &table,
            DenominatorPolicy::SignificantRateCategories,
        )
        .unwrap();

        // A -> X -> root: 0.3 over two branches vs. over two qualifying classes
        assert!((all["A"] - 0.15).abs() < EPS);
        assert!((categories["A"] - 0.15).abs() < EPS);
        // C passes no significant branch
        assert_eq!(all["C"], 0.0);
        assert_eq!(categories["C"], 0.0);

        let tree = TreeBuilder::parse("(((A)Y,B)X,C);").unwrap();
        let all = compute_mean_pss(&tree, &attrs, &table, DenominatorPolicy::AllBranches).unwrap();
        let categories = compute_mean_pss(
            &tree,
            &attrs,
            &table,
            DenominatorPolicy::SignificantRateCategories,
        )
        .unwrap();
        assert!((all["A"] - 0.1).abs() < EPS);
        assert!((categories["A"] - 0.15).abs() < EPS);
    }

    #[test]
    fn given_rate_of_exactly_one_when_summing_then_excluded() {
        let tree = TreeBuilder::parse("(A,B);").unwrap();
        let mut attrs = BranchAttributeMap::new();
        attrs.insert("A".into(), branch(0.001, &[(1.0, 0.6), (1.2, 0.1)]));
        let result =
            compute_mean_pss(&tree, &attrs, &only(&["A"]), DenominatorPolicy::AllBranches)
                .unwrap();
        assert!((result["A"] - 0.1).abs() < EPS);
    }

    #[test]
    fn given_empty_rate_distribution_when_all_branches_then_still_counted() {
        let tree = TreeBuilder::parse("((A)X,B);").unwrap();
        let mut attrs = BranchAttributeMap::new();
        attrs.insert("A".into(), branch(0.001, &[]));
        attrs.insert("X".into(), branch(0.001, &[(4.0, 0.5)]));
        let table = only(&["A", "X"]);

        let all = compute_mean_pss(&tree, &attrs, &table, DenominatorPolicy::AllBranches).unwrap();
        assert!((all["A"] - 0.25).abs() < EPS);

        let categories = compute_mean_pss(
            &tree,
            &attrs,
            &table,
            DenominatorPolicy::SignificantRateCategories,
        )
        .unwrap();
        assert!((categories["A"] - 0.5).abs() < EPS);
    }

    #[test]
    fn given_leaf_that_is_root_when_computing_then_zero() {
        let tree = TreeBuilder::parse("A;").unwrap();
        let result = compute_mean_pss(
            &tree,
            &BranchAttributeMap::new(),
            &RejectionTable::default(),
            DenominatorPolicy::AllBranches,
        )
        .unwrap();
        assert_eq!(result["A"], 0.0);
    }

    #[test]
    fn given_p_value_threshold_when_computing_then_uses_document_p_values() {
        let tree = TreeBuilder::parse("((A,B)X,C);").unwrap();
        let mut attrs = BranchAttributeMap::new();
        attrs.insert("A".into(), branch(0.05, &[(9.0, 0.9)]));
        attrs.insert("B".into(), branch(0.2, &[(9.0, 0.9)]));
        attrs.insert("C".into(), branch(0.2, &[]));
        attrs.insert("X".into(), branch(0.001, &[(2.0, 0.4)]));
        let resolver = PValueThreshold::new(&attrs, DEFAULT_P_VALUE_THRESHOLD);

        let result =
            compute_mean_pss(&tree, &attrs, &resolver, DenominatorPolicy::AllBranches).unwrap();
        // A's own p-value sits on the cutoff and is excluded
        assert!((result["A"] - 0.2).abs() < EPS);
        assert!((result["B"] - 0.2).abs() < EPS);
        assert_eq!(result["C"], 0.0);
    }

    #[test]
    fn given_threshold_mode_and_unannotated_branch_when_computing_then_missing_attribute() {
        let tree = TreeBuilder::parse("((A,B)X,C);").unwrap();
        let mut attrs = BranchAttributeMap::new();
        attrs.insert("A".into(), branch(0.01, &[]));
        let resolver = PValueThreshold::new(&attrs, DEFAULT_P_VALUE_THRESHOLD);

        let err =
            compute_mean_pss(&tree, &attrs, &resolver, DenominatorPolicy::AllBranches).unwrap_err();
        assert!(matches!(err, DomainError::MissingAttribute { ref node, .. } if node == "X"));
    }

    #[test]
    fn given_significant_branch_without_record_when_computing_then_missing_attribute() {
        let tree = TreeBuilder::parse("(A,B);").unwrap();
        let err = compute_mean_pss(
            &tree,
            &BranchAttributeMap::new(),
            &only(&["B"]),
            DenominatorPolicy::AllBranches,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::MissingAttribute { .. }));
    }

    #[test]
    fn given_same_inputs_when_computing_twice_then_identical() {
        let (tree, attrs) = scenario();
        let table = only(&["BC", "A"]);
        let first = compute_mean_pss(&tree, &attrs, &table, DenominatorPolicy::AllBranches);
        let second = compute_mean_pss(&tree, &attrs, &table, DenominatorPolicy::AllBranches);
        // A is flagged but has no record
        assert!(first.is_err());
        assert_eq!(first, second);

        let table = only(&["BC"]);
        let first = compute_mean_pss(&tree, &attrs, &table, DenominatorPolicy::AllBranches);
        let second = compute_mean_pss(&tree, &attrs, &table, DenominatorPolicy::AllBranches);
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[test]
    fn given_empty_tree_when_computing_then_tree_parse_error() {
        let err = compute_mean_pss(
            &PhyloTree::new(),
            &BranchAttributeMap::new(),
            &RejectionTable::default(),
            DenominatorPolicy::AllBranches,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::TreeParse { .. }));
    }
}

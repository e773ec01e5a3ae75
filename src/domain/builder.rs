//! Tree builder: parses a Newick topology with `phylotree` into a [`PhyloTree`] and names
//! every node.
//!
//! The input is normalized before parsing: whitespace, bracket comments (`[&&NHX...]`) and
//! HyPhy branch-set tags (`{Foreground}`) are dropped, parentheses must balance, nothing may
//! follow the `;`, and a missing `;` is added.
//!
//! After the topology is read, unnamed internal nodes get synthetic names `Node<k>` in
//! pre-order, skipping names the input already uses, so join keys never depend on how a
//! particular parser numbers its nodes.

use std::collections::HashSet;
use std::fmt;

use phylotree::tree::Tree as NewickTree;
use tracing::{debug, instrument};

use crate::domain::arena::{NodeData, NodeId, PhyloTree};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Prefix of the synthetic names given to unnamed internal nodes.
pub const SYNTHETIC_NAME_PREFIX: &str = "Node";

/// Constructs a named [`PhyloTree`] from a Newick string.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    names: HashSet<String>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `newick` and run the naming pass.
    #[instrument(level = "debug", skip(newick), fields(len = newick.len()))]
    pub fn parse(newick: &str) -> TreeResult<PhyloTree> {
        let normalized = normalize(newick)?;
        let parsed = NewickTree::from_newick(&normalized).map_err(newick_error)?;

        let mut builder = TreeBuilder::new();
        let mut tree = builder.convert(&parsed)?;
        builder.assign_synthetic_names(&mut tree);
        debug!(
            "parsed tree with {} nodes, {} leaves",
            tree.len(),
            tree.leaves().len()
        );
        Ok(tree)
    }

    /// Copies the parsed topology into the arena in pre-order, keeping child order.
    fn convert(&mut self, parsed: &NewickTree) -> TreeResult<PhyloTree> {
        let mut tree = PhyloTree::new();
        let root = parsed.get_root().map_err(newick_error)?;
        let mut stack: Vec<(usize, Option<NodeId>)> = vec![(root, None)];

        while let Some((id, parent)) = stack.pop() {
            let node = parsed.get(&id).map_err(newick_error)?;
            let name = node.name.clone().unwrap_or_default();
            if name.is_empty() && node.children.is_empty() {
                return Err(DomainError::parse("leaf without a name"));
            }
            if !name.is_empty() && !self.names.insert(name.clone()) {
                return Err(DomainError::parse(format!("duplicate node name '{name}'")));
            }

            let data = NodeData {
                name,
                branch_length: node.parent_edge,
            };
            let idx = tree.insert_node(data, parent);
            for &child in node.children.iter().rev() {
                stack.push((child, Some(idx)));
            }
        }
        Ok(tree)
    }

    /// Gives every unnamed internal node a fresh `Node<k>` name, in pre-order.
    fn assign_synthetic_names(&mut self, tree: &mut PhyloTree) {
        let unnamed: Vec<NodeId> = tree
            .iter()
            .filter(|(_, node)| node.data.name.is_empty())
            .map(|(idx, _)| idx)
            .collect();

        let mut counter = 0usize;
        for idx in unnamed {
            let name = loop {
                counter += 1;
                let candidate = format!("{SYNTHETIC_NAME_PREFIX}{counter}");
                if !self.names.contains(&candidate) {
                    break candidate;
                }
            };
            self.names.insert(name.clone());
            if let Some(node) = tree.get_node_mut(idx) {
                node.data.name = name;
            }
        }
    }
}

/// Strips decoration the Newick parser does not need and checks the overall shape.
fn normalize(newick: &str) -> TreeResult<String> {
    let mut out = String::with_capacity(newick.len() + 1);
    let mut depth = 0usize;
    let mut terminated = false;
    let mut chars = newick.char_indices();

    while let Some((pos, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if terminated {
            return Err(DomainError::parse(format!(
                "trailing content after ';' at byte {pos}"
            )));
        }
        match c {
            '[' | '{' => {
                let close = if c == '[' { ']' } else { '}' };
                if !chars.by_ref().any(|(_, next)| next == close) {
                    return Err(DomainError::parse(format!(
                        "missing '{close}' for '{c}' at byte {pos}"
                    )));
                }
            }
            '(' => {
                depth += 1;
                out.push(c);
            }
            ')' => {
                if depth == 0 {
                    return Err(DomainError::parse(format!("unbalanced ')' at byte {pos}")));
                }
                depth -= 1;
                out.push(c);
            }
            ';' => terminated = true,
            _ => out.push(c),
        }
    }

    if depth > 0 {
        return Err(DomainError::parse(format!("{depth} unclosed '('")));
    }
    if out.is_empty() {
        return Err(DomainError::parse("empty tree"));
    }
    out.push(';');
    Ok(out)
}

fn newick_error(e: impl fmt::Display) -> DomainError {
    DomainError::parse(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parent_name(tree: &PhyloTree, name: &str) -> String {
        let idx = tree.find(name).expect("node exists");
        let parent = tree.parent(idx).expect("has parent");
        tree.name(parent).unwrap().to_string()
    }

    #[test]
    fn given_nested_topology_when_parsing_then_builds_parent_links() {
        let tree = TreeBuilder::parse("(A:1,(B:1,C:1):1);").unwrap();

        assert_eq!(tree.leaf_names(), vec!["A", "B", "C"]);
        assert_eq!(parent_name(&tree, "B"), parent_name(&tree, "C"));
        assert_ne!(parent_name(&tree, "A"), parent_name(&tree, "B"));
        let root = tree.root().unwrap();
        assert_eq!(tree.name(root).unwrap(), "Node1");
        assert_eq!(parent_name(&tree, "B"), "Node2");
        assert_eq!(parent_name(&tree, "Node2"), "Node1");
    }

    #[test]
    fn given_named_internal_nodes_when_parsing_then_keeps_names() {
        let tree = TreeBuilder::parse("((a:0.1,b:0.2)Node3:0.3,c:0.4)Root").unwrap();
        assert_eq!(parent_name(&tree, "a"), "Node3");
        assert_eq!(parent_name(&tree, "Node3"), "Root");
        let node3 = tree.find("Node3").unwrap();
        assert_eq!(tree.get_node(node3).unwrap().data.branch_length, Some(0.3));
    }

    #[test]
    fn given_synthetic_name_collision_when_naming_then_skips_used_name() {
        let tree = TreeBuilder::parse("((Node1,b),c);").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.name(root).unwrap(), "Node2");
        assert_eq!(parent_name(&tree, "Node1"), "Node3");
    }

    #[test]
    fn given_comments_and_tags_when_parsing_then_strips_decoration() {
        let tree =
            TreeBuilder::parse("( human:0.1[&&NHX:S=human], chimp{FG}:0.002 ) ;").unwrap();
        assert_eq!(tree.leaf_names(), vec!["human", "chimp"]);
        let idx = tree.find("chimp").unwrap();
        assert_eq!(tree.get_node(idx).unwrap().data.branch_length, Some(0.002));
    }

    #[rstest]
    #[case("(A,B)", "(A,B);")]
    #[case(" (A{FG}:1, B) ; ", "(A:1,B);")]
    #[case("(A[c],B);", "(A,B);")]
    fn given_decorated_input_when_normalizing_then_canonical_newick(
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(normalize(input).unwrap(), expected);
    }

    #[test]
    fn given_single_leaf_when_parsing_then_leaf_is_root() {
        let tree = TreeBuilder::parse("A;").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.leaves(), vec![root]);
        assert!(tree.is_root(root));
    }

    #[test]
    fn given_same_input_when_parsing_twice_then_names_are_identical() {
        let input = "((a,b),(c,(d,e)));";
        let first: Vec<String> = TreeBuilder::parse(input)
            .unwrap()
            .iter()
            .map(|(_, n)| n.data.name.clone())
            .collect();
        let second: Vec<String> = TreeBuilder::parse(input)
            .unwrap()
            .iter()
            .map(|(_, n)| n.data.name.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[rstest]
    #[case::empty("")]
    #[case::only_terminator(";")]
    #[case::unclosed("(A,B")]
    #[case::unbalanced("(A,B));")]
    #[case::empty_leaf("(A,,B);")]
    #[case::trailing_comma("(A,B,);")]
    #[case::empty_group("();")]
    #[case::two_roots("(A,B)C;D")]
    #[case::bad_length("(A:abc,B);")]
    #[case::duplicate("(A,A);")]
    #[case::unnamed_leaf("(:0.1,B);")]
    #[case::unterminated_tag("(A{FG,B);")]
    #[case::unterminated_comment("(A[x,B);")]
    #[case::trailing_garbage("(A,B); C")]
    fn given_malformed_topology_when_parsing_then_tree_parse_error(#[case] input: &str) {
        let err = TreeBuilder::parse(input).unwrap_err();
        assert!(
            matches!(err, DomainError::TreeParse { .. }),
            "unexpected error for {input:?}: {err:?}"
        );
    }
}

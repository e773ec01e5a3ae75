use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};

/// Handle to a node stored in a [`PhyloTree`].
pub type NodeId = Index;

/// Data payload for tree nodes: the Newick label and branch length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeData {
    /// Node name (join key into branch attributes and rejection tables)
    pub name: String,
    /// Length of the branch leading to this node, if the topology carries one
    pub branch_length: Option<f64>,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch_length {
            Some(length) => write!(f, "{}:{}", self.name, length),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Tree node in the arena-based phylogeny.
#[derive(Debug)]
pub struct TreeNode {
    /// Label and branch length of this node
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in Newick order
    pub children: Vec<Index>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based rooted phylogenetic tree.
///
/// Every non-root node has exactly one parent; the root has none. Node handles are only
/// meaningful for the tree that produced them.
#[derive(Debug)]
pub struct PhyloTree {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl Default for PhyloTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PhyloTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: NodeId) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub(crate) fn get_node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    fn node(&self, idx: NodeId) -> DomainResult<&TreeNode> {
        self.arena
            .get(idx)
            .ok_or_else(|| DomainError::InvalidTraversal(format!("unknown node handle {idx:?}")))
    }

    pub fn is_root(&self, idx: NodeId) -> bool {
        self.root == Some(idx)
    }

    /// Parent of `idx`. Asking for the parent of the root is a traversal error.
    pub fn parent(&self, idx: NodeId) -> DomainResult<NodeId> {
        let node = self.node(idx)?;
        node.parent.ok_or_else(|| {
            DomainError::InvalidTraversal(format!("root node '{}' has no parent", node.data.name))
        })
    }

    pub fn name(&self, idx: NodeId) -> DomainResult<&str> {
        self.node(idx).map(|node| node.data.name.as_str())
    }

    /// Looks up a node by its (unique) name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.data.name == name)
            .map(|(idx, _)| idx)
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Collects all leaf nodes, left to right.
    ///
    /// A single-node tree yields its root as the only leaf. Empty trees return an empty vector.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.is_leaf())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Names of all leaves, left to right.
    pub fn leaf_names(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, node)| node.is_leaf())
            .map(|(_, node)| node.data.name.clone())
            .collect()
    }
}

/// Pre-order (parent before children, left to right) iterator.
pub struct TreeIterator<'a> {
    tree: &'a PhyloTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

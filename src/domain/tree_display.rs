//! Text rendering of a phylogeny with its resolved node names.

use generational_arena::Index;
use termtree::Tree;

use crate::domain::arena::PhyloTree;

pub trait TreeDisplay {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeDisplay for PhyloTree {
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(arena: &PhyloTree, node_idx: Index, parent_tree: &mut Tree<String>) {
            if let Some(node) = arena.get_node(node_idx) {
                for &child_idx in &node.children {
                    if let Some(child) = arena.get_node(child_idx) {
                        let mut child_tree = Tree::new(child.data.to_string());
                        build_tree(arena, child_idx, &mut child_tree);
                        parent_tree.push(child_tree);
                    }
                }
            }
        }

        match self.root().and_then(|root| self.get_node(root).map(|n| (root, n))) {
            Some((root_idx, root)) => {
                let mut tree = Tree::new(root.data.to_string());
                build_tree(self, root_idx, &mut tree);
                tree
            }
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

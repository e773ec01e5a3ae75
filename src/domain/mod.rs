//! Domain layer: tree model, significance, PSS aggregation
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregator;
pub mod arena;
pub mod assembler;
pub mod builder;
pub mod entities;
pub mod error;
pub mod significance;
pub mod tree_display;

pub use aggregator::compute_mean_pss;
pub use arena::{NodeData, NodeId, PhyloTree, TreeNode};
pub use assembler::assemble;
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use significance::{
    PValueThreshold, RejectionTable, SignificanceResolver, DEFAULT_P_VALUE_THRESHOLD,
};
pub use tree_display::TreeDisplay;

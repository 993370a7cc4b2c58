//! Basic blocks, control flow graph construction, and dominance analysis.
//!
//! A function's linear instruction stream is split into [`BasicBlock`]s, which
//! are linked into a [`Cfg`] whose nodes reference each other by integer id.
//! Dominator sets, the dominator tree, and dominance frontiers are derived
//! from the graph for the SSA passes.

mod block;
mod dominance;
mod graph;
mod labels;

pub use block::{flatten_blocks, split_blocks, BasicBlock};
pub use dominance::{dom_frontier, dom_tree, dominators, DomTree, Dominators};
pub use graph::{Cfg, Node, NodeId};
pub use labels::LabelGenerator;

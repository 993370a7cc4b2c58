//! Control flow graph over basic blocks.
//!
//! Nodes reference each other by integer id (index into the node vector)
//! rather than by pointer, so the structure stays sound when the vector grows
//! during SSA destruction.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::CfgError;
use crate::ir::{Instruction, Item, Op};

use super::block::BasicBlock;
use super::labels::LabelGenerator;

/// Identifier of a CFG node: its index in the node vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Id of the synthetic entry node.
    pub const ENTRY: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A CFG vertex wrapping one basic block.
///
/// Predecessors keep one entry per incoming edge occurrence, in insertion
/// order, so a predecessor's index stays stable until the graph is edited;
/// φ arguments are aligned with that order. Successors preserve the order of
/// the terminator's label list.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable id, equal to this node's index.
    pub id: NodeId,
    /// The wrapped block.
    pub block: BasicBlock,
    /// Incoming edges, one entry per edge occurrence.
    pub preds: Vec<NodeId>,
    /// Outgoing edges, in terminator label order.
    pub succs: Vec<NodeId>,
}

/// A per-function control flow graph.
#[derive(Debug, Clone)]
pub struct Cfg {
    nodes: Vec<Node>,
    entry: NodeId,
    exits: Vec<NodeId>,
}

impl Cfg {
    /// Link blocks into a graph.
    ///
    /// The first block becomes the entry. Successors of a node derive from
    /// its last item: branch terminators resolve their labels through the
    /// label map (order preserved, duplicates allowed), `ret` has none, and
    /// anything else falls through to the next block when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`CfgError::UnknownLabel`] when a branch target does not name
    /// any labeled block.
    pub fn from_blocks(blocks: Vec<BasicBlock>) -> Result<Self, CfgError> {
        let mut nodes: Vec<Node> = blocks
            .into_iter()
            .enumerate()
            .map(|(id, block)| Node {
                id: NodeId(id),
                block,
                preds: Vec::new(),
                succs: Vec::new(),
            })
            .collect();

        let labels: BTreeMap<String, NodeId> = nodes
            .iter()
            .filter_map(|node| node.block.label().map(|l| (l.to_string(), node.id)))
            .collect();

        let mut exits = Vec::new();

        for i in 0..nodes.len() {
            let succs = successors(i, &nodes, &labels)?;
            nodes[i].succs = succs.clone();

            for succ in succs {
                nodes[succ.0].preds.push(NodeId(i));
            }

            if is_exit(i, &nodes) {
                exits.push(NodeId(i));
            }
        }

        Ok(Self {
            nodes,
            entry: NodeId::ENTRY,
            exits,
        })
    }

    /// Id of the entry node.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// Ids of the exit nodes.
    #[must_use]
    pub fn exits(&self) -> &[NodeId] {
        &self.exits
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Get a mutable node by id.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Iterate over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Append a fresh node, returning its id.
    ///
    /// Used by SSA destruction when splitting edges; the caller is
    /// responsible for rewiring the affected predecessor/successor slots.
    pub fn push_node(&mut self, block: BasicBlock, preds: Vec<NodeId>, succs: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            block,
            preds,
            succs,
        });
        id
    }

    /// Give every label-less block a freshly generated label.
    pub fn insert_labels(&mut self, gen: &mut LabelGenerator) {
        for node in &mut self.nodes {
            if node.block.label().is_none() {
                node.block.items.insert(0, Item::label(gen.next()));
            }
        }
    }

    /// Append `ret` to any exit node lacking a terminator.
    pub fn insert_explicit_returns(&mut self) {
        for i in 0..self.exits.len() {
            let id = self.exits[i];
            let node = &mut self.nodes[id.0];
            let has_ret = matches!(
                node.block.last(),
                Some(Item::Instr(Instruction { op: Op::Ret, .. }))
            );
            if !has_ret {
                node.block.items.push(Item::Instr(Instruction::new(Op::Ret)));
            }
        }
    }

    /// Consume the graph, yielding its blocks in id order.
    #[must_use]
    pub fn into_blocks(self) -> Vec<BasicBlock> {
        self.nodes.into_iter().map(|node| node.block).collect()
    }
}

fn successors(
    i: usize,
    nodes: &[Node],
    labels: &BTreeMap<String, NodeId>,
) -> Result<Vec<NodeId>, CfgError> {
    match nodes[i].block.last() {
        Some(Item::Instr(instr)) if instr.op.is_branch() => instr
            .labels
            .iter()
            .map(|label| {
                labels.get(label).copied().ok_or_else(|| CfgError::UnknownLabel {
                    label: label.clone(),
                })
            })
            .collect(),
        Some(Item::Instr(instr)) if instr.op == Op::Ret => Ok(Vec::new()),
        _ if i + 1 == nodes.len() => Ok(Vec::new()),
        _ => Ok(vec![NodeId(i + 1)]),
    }
}

fn is_exit(i: usize, nodes: &[Node]) -> bool {
    if let Some(Item::Instr(instr)) = nodes[i].block.last() {
        if instr.op == Op::Ret {
            return true;
        }
        if instr.op.is_branch() {
            return false;
        }
    }
    i + 1 == nodes.len()
}

//! SSA destruction: lowering φ-instructions to copies via edge splitting.
//!
//! Every (node, predecessor) pair with at least one φ assignment gets a
//! fresh block carrying the copies and a jump back to the node. Splitting
//! per predecessor rather than per critical edge keeps the policy simple and
//! stays correct when one predecessor reaches the node through several of
//! its terminator labels.

use tracing::trace;

use crate::cfg::{BasicBlock, Cfg, LabelGenerator, NodeId};
use crate::error::{CfgError, Result, SsaError};
use crate::ir::{Instruction, Item, Literal, Op};

use super::construct::UNDEF;

/// Lower every φ in the graph to copies on split edges, in place.
///
/// A φ argument equal to [`UNDEF`] lowers to `const 0` of the φ's type; all
/// others become `id` copies. After all predecessors of all nodes are
/// processed, φ-instructions are stripped from every block.
///
/// # Errors
///
/// Fails when a φ is missing its destination, argument, or type fields, or
/// when a block that must be addressable carries no label.
pub fn from_ssa(cfg: &mut Cfg, gen: &mut LabelGenerator) -> Result<()> {
    let original_len = cfg.len();

    for i in 0..original_len {
        let node_id = NodeId(i);
        let pred_count = cfg.node(node_id).preds.len();

        for j in 0..pred_count {
            let assignments = edge_assignments(cfg.node(node_id).block.items.iter(), j)?;
            if assignments.is_empty() {
                continue;
            }

            let this_label = cfg
                .node(node_id)
                .block
                .label()
                .map(str::to_string)
                .ok_or(CfgError::MissingLabel { node: i })?;
            let new_label = gen.next();
            let pred_id = cfg.node(node_id).preds[j];

            replace_target(&mut cfg.node_mut(pred_id).block, &this_label, &new_label);

            let mut items = Vec::with_capacity(assignments.len() + 2);
            items.push(Item::label(new_label.clone()));
            items.extend(assignments);
            items.push(Item::Instr(Instruction::jmp(this_label)));

            let new_id = cfg.push_node(BasicBlock::new(items), vec![pred_id], vec![node_id]);
            trace!(node = %node_id, pred = %pred_id, split = %new_id, "split edge");

            // Rebind the predecessor's successor slot and our edge slot.
            // With duplicate edges the first still-unbound slot is the right
            // one, since earlier iterations already rebound earlier slots.
            if let Some(slot) = cfg
                .node_mut(pred_id)
                .succs
                .iter_mut()
                .find(|succ| **succ == node_id)
            {
                *slot = new_id;
            }
            cfg.node_mut(node_id).preds[j] = new_id;
        }
    }

    for i in 0..cfg.len() {
        cfg.node_mut(NodeId(i))
            .block
            .items
            .retain(|item| !matches!(item.as_instr(), Some(instr) if instr.op == Op::Phi));
    }

    Ok(())
}

/// The copies a node's φs imply along the edge from its j-th predecessor.
fn edge_assignments<'a>(
    items: impl Iterator<Item = &'a Item>,
    j: usize,
) -> Result<Vec<Item>> {
    let mut assignments = Vec::new();

    for item in items {
        let Some(instr) = item.as_instr() else {
            continue;
        };
        if instr.op != Op::Phi {
            continue;
        }

        let dest = instr
            .dest
            .clone()
            .ok_or(SsaError::MalformedPhi { field: "dest" })?;
        let arg = instr
            .args
            .get(j)
            .ok_or(SsaError::MalformedPhi { field: "args" })?;

        if arg == UNDEF {
            let mut zero = Instruction::new(Op::Const);
            zero.dest = Some(dest);
            zero.typ = Some(
                instr
                    .typ
                    .clone()
                    .ok_or(SsaError::MalformedPhi { field: "type" })?,
            );
            zero.value = Some(Literal::Int(0));
            assignments.push(Item::Instr(zero));
        } else {
            assignments.push(Item::Instr(Instruction::copy(dest, arg.clone())));
        }
    }

    Ok(assignments)
}

/// Rewrite the predecessor's terminator so the edge lands on `new`.
///
/// A branch terminator has every occurrence of `old` replaced; a block that
/// falls through gains an explicit jump to `new`.
fn replace_target(block: &mut BasicBlock, old: &str, new: &str) {
    match block.items.last_mut() {
        Some(Item::Instr(instr)) if instr.op.is_branch() => {
            for label in &mut instr.labels {
                if label == old {
                    *label = new.to_string();
                }
            }
        }
        _ => block.items.push(Item::Instr(Instruction::jmp(new))),
    }
}

//! SSA construction and destruction.
//!
//! Both drivers share the same per-function wrapping: a synthetic `__entry`
//! block is prepended, every block gains a label, exit nodes gain an explicit
//! `ret`, and only then does φ placement and renaming run. The optional
//! reversal pass lowers φ-instructions back to copies by splitting edges.

mod construct;
mod destruct;

pub use construct::{to_ssa, UNDEF};
pub use destruct::from_ssa;

use tracing::debug;

use crate::cfg::{flatten_blocks, split_blocks, BasicBlock, Cfg, LabelGenerator};
use crate::error::Result;
use crate::ir::{Function, Program};

/// Label of the synthetic entry block prepended to every function.
pub const ENTRY_LABEL: &str = "__entry";

/// Convert one function to SSA form in place, optionally lowering the φs
/// back to copies afterwards.
///
/// # Errors
///
/// Fails on unresolvable branch labels, untyped or conflictingly typed
/// definitions, and uses of never-defined variables.
pub fn transform_function(func: &mut Function, roundtrip: bool) -> Result<()> {
    debug!(function = %func.name, roundtrip, "converting to SSA");

    let mut blocks = split_blocks(std::mem::take(&mut func.instrs));
    blocks.insert(0, BasicBlock::labeled(ENTRY_LABEL));

    let mut gen = LabelGenerator::new(&blocks);
    let mut cfg = Cfg::from_blocks(blocks)?;
    cfg.insert_labels(&mut gen);
    cfg.insert_explicit_returns();

    let params: Vec<String> = func.args.iter().map(|arg| arg.name.clone()).collect();
    to_ssa(&mut cfg, &params)?;

    if roundtrip {
        from_ssa(&mut cfg, &mut gen)?;
    }

    func.instrs = flatten_blocks(cfg.into_blocks());
    Ok(())
}

/// Convert every function of a program to SSA form in place.
///
/// # Errors
///
/// Propagates the first per-function failure; the program is left partially
/// transformed in that case and must not be reused.
pub fn transform_program(prog: &mut Program, roundtrip: bool) -> Result<()> {
    for func in &mut prog.functions {
        transform_function(func, roundtrip)?;
    }
    Ok(())
}

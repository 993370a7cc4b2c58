//! Lowering of SSA-form programs to LLVM textual assembly.
//!
//! The program is first converted to SSA (never deconstructed), then emitted
//! function by function: the fixed runtime preamble, one type declaration
//! per record, each IL function under a `__`-prefixed name, and a generated
//! `main` that parses command-line arguments and calls `__main`.

mod context;
mod emit;
mod runtime;

pub use context::{FnContext, RecordLayouts};
pub use emit::emit_function;

use tracing::debug;

use crate::error::Result;
use crate::ir::{Param, Program};
use crate::ssa;

/// Lower a program to LLVM assembly, returning the complete module text.
///
/// `source_name` labels the emitted module (the input path, or `stdin`).
///
/// # Errors
///
/// Fails when SSA conversion fails or when an instruction is missing fields
/// the emitter requires.
pub fn lower_program(mut prog: Program, source_name: &str) -> Result<String> {
    ssa::transform_program(&mut prog, false)?;

    let mut out = String::new();
    out.push_str(&runtime::preamble(source_name));
    out.push('\n');

    let layouts = RecordLayouts::build(&prog.structs);
    for decl in layouts.declarations() {
        out.push_str(&decl);
        out.push('\n');
    }

    // The IL `main` becomes `__main` like every other function, loses its
    // declared return type, and donates its formals to the generated entry
    // point's command-line contract.
    let mut main_params: Vec<Param> = Vec::new();
    for func in &mut prog.functions {
        if func.name == "main" {
            main_params = func.args.clone();
            func.typ = None;
        }
        func.name = format!("__{}", func.name);
    }

    for func in &prog.functions {
        debug!(function = %func.name, "emitting");
        let mut ctx = FnContext::build(func)?;
        emit_function(func, &mut ctx, &layouts, &mut out)?;
    }

    out.push_str(&runtime::entry_main(&main_params));
    out.push('\n');

    Ok(out)
}

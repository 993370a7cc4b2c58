//! # IL Mid-End Library
//!
//! A mid-end compiler component for a small educational instruction
//! language: it constructs Static Single Assignment form via dominance
//! frontiers (with an optional reversal pass through critical-edge
//! splitting) and lowers SSA-form programs to LLVM textual assembly.
//!
//! ## Architecture Overview
//!
//! The pipeline runs per function:
//!
//! ```text
//! JSON → IR model → blocks → CFG → dominance → SSA → [destruct] → flatten
//!                                                 ↘ lowering context → LLVM text
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use il_midend::{ir::Program, ssa};
//!
//! let json = r#"{"functions": [{"name": "main", "instrs": [
//!     {"op": "const", "dest": "x", "type": "int", "value": 1},
//!     {"op": "ret", "args": ["x"]}
//! ]}]}"#;
//!
//! let mut prog = Program::from_json(json)?;
//! ssa::transform_program(&mut prog, false)?;
//! println!("{}", prog.to_json());
//! # Ok::<(), il_midend::Error>(())
//! ```

pub mod cfg;
pub mod cli;
pub mod error;
pub mod ir;
pub mod lower;
pub mod ssa;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use ir::{Function, Instruction, Item, Op, Program, Type};
pub use lower::lower_program;
pub use ssa::{transform_function, transform_program};

//! In-memory representation of IL programs.
//!
//! The JSON surface form deserializes directly into these types via serde.
//! Instructions are modeled as a tagged operator enum plus a shared envelope
//! of optional fields, replacing the loose "optional everything" shape of the
//! surface form with something the compiler can exhaustively match on.

mod instruction;
mod program;
mod types;

pub use instruction::{Instruction, Item, Op};
pub use program::{Function, Param, Program, RecordDecl};
pub use types::{Literal, Type};

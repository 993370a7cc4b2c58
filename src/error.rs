//! Error types returned by the library.
//!
//! Most public APIs return [`crate::Result`], which uses [`Error`] as the error
//! type. The variants provide access to more specific error categories when
//! needed. Every error is fatal: the pipeline either completes or surfaces the
//! first failure to the caller.

use std::fmt;
use std::io;

use thiserror::Error;

/// Convenient result alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top level error surfaced by the library APIs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Errors encountered while reading the JSON surface form.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Errors encountered while building the control flow graph.
    #[error(transparent)]
    Cfg(#[from] CfgError),

    /// Errors encountered during SSA construction or destruction.
    #[error(transparent)]
    Ssa(#[from] SsaError),

    /// Errors encountered while lowering to LLVM assembly.
    #[error(transparent)]
    Lower(#[from] LowerError),

    /// I/O failures when reading inputs or writing output.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors returned while parsing the JSON program form.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The input was not valid JSON or did not match the program schema.
    #[error("malformed program JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned while constructing a control flow graph.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CfgError {
    /// A branch target did not resolve to any labeled block.
    #[error("branch references unknown label `{label}`")]
    UnknownLabel {
        /// The unresolved label.
        label: String,
    },

    /// A block that must carry a label did not have one.
    #[error("block {node} has no leading label")]
    MissingLabel {
        /// Index of the label-less block.
        node: usize,
    },
}

/// Errors returned during SSA construction and destruction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SsaError {
    /// An instruction defined a variable without declaring its type.
    #[error("definition of `{var}` carries no type")]
    MissingType {
        /// The destination variable.
        var: String,
    },

    /// Two definitions of the same variable disagreed on its type.
    #[error("conflicting types across definitions of `{var}`")]
    TypeConflict {
        /// The variable with conflicting definitions.
        var: String,
    },

    /// An instruction used a variable with no reaching definition.
    #[error("use of undefined variable `{var}`")]
    UndefinedVariable {
        /// The variable used before any definition.
        var: String,
    },

    /// A φ-instruction was missing a field the pass requires.
    #[error("phi instruction is missing its {field} field")]
    MalformedPhi {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The input already carried a φ-instruction.
    ///
    /// Construction starts from φ-free programs; a pre-existing φ cannot be
    /// attributed to an originating variable.
    #[error("input already carries a phi for `{var}`")]
    UnexpectedPhi {
        /// The φ destination found in the input.
        var: String,
    },
}

/// Errors returned while lowering SSA form to LLVM assembly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LowerError {
    /// A destination was declared without a type.
    #[error("destination `{dest}` carries no type")]
    MissingType {
        /// The untyped destination.
        dest: String,
    },

    /// An instruction was missing a required field.
    #[error("malformed `{op}` instruction: {reason}")]
    MalformedInstruction {
        /// Operator name of the offending instruction.
        op: String,
        /// What was missing or inconsistent.
        reason: &'static str,
    },

    /// An argument had no recorded type.
    #[error("no type recorded for `{name}`")]
    UnknownVariable {
        /// The untyped argument name.
        name: String,
    },

    /// A φ's type could not be inherited from its first argument.
    #[error("cannot infer type of phi `{dest}` from its first argument")]
    UnknownPhiType {
        /// The φ destination.
        dest: String,
    },

    /// A member access named a record that was never declared.
    #[error("unknown record type `{name}`")]
    UnknownRecord {
        /// The undeclared record name.
        name: String,
    },

    /// A member access named a field the record does not declare.
    #[error("record `{record}` has no member `{member}`")]
    UnknownMember {
        /// The record type.
        record: String,
        /// The missing member name.
        member: String,
    },

    /// Formatting into the output buffer failed.
    #[error(transparent)]
    Fmt(#[from] fmt::Error),
}

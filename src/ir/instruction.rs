//! IL instructions and the items that make up a function body.

use serde::{Deserialize, Serialize};

use super::types::{Literal, Type};

/// Operator of an IL instruction.
///
/// The accepted set is fixed; anything else deserializes into
/// [`Op::Unknown`], which the SSA passes treat as an ordinary operation and
/// the emitter silently skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    // Terminators
    Jmp,
    Br,
    Ret,

    // Merge pseudo-instruction
    Phi,

    // Pure values
    Add,
    Mul,
    Sub,
    Div,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Not,
    Id,
    Const,

    // Memory
    Alloc,
    Load,
    Store,
    Ptradd,
    Getmbr,
    Isnull,
    Free,

    // Control
    Call,

    // Effects
    Print,

    /// Operator name outside the accepted set.
    #[serde(untagged)]
    Unknown(String),
}

impl Op {
    /// Check whether this operator ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self, Op::Jmp | Op::Br | Op::Ret)
    }

    /// Check whether this operator carries branch-target labels.
    ///
    /// φ-instructions also carry labels, but those name predecessors rather
    /// than targets and must not feed successor computation.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(self, Op::Jmp | Op::Br)
    }

    /// Operator name as it appears in the surface form.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Op::Jmp => "jmp",
            Op::Br => "br",
            Op::Ret => "ret",
            Op::Phi => "phi",
            Op::Add => "add",
            Op::Mul => "mul",
            Op::Sub => "sub",
            Op::Div => "div",
            Op::Eq => "eq",
            Op::Lt => "lt",
            Op::Gt => "gt",
            Op::Le => "le",
            Op::Ge => "ge",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Id => "id",
            Op::Const => "const",
            Op::Alloc => "alloc",
            Op::Load => "load",
            Op::Store => "store",
            Op::Ptradd => "ptradd",
            Op::Getmbr => "getmbr",
            Op::Isnull => "isnull",
            Op::Free => "free",
            Op::Call => "call",
            Op::Print => "print",
            Op::Unknown(name) => name,
        }
    }
}

/// An operation instruction: an operator plus its optional envelope fields.
///
/// Which fields are meaningful depends on the operator; the envelope mirrors
/// the JSON surface form, and absent fields are skipped on serialization so
/// that transformed programs stay as lean as their inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The operator.
    pub op: Op,

    /// Destination variable, for value-producing operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,

    /// Declared type of the destination.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub typ: Option<Type>,

    /// Literal payload of a `const`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,

    /// Ordered argument names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Callee names, for `call`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funcs: Vec<String>,

    /// Branch targets for `jmp`/`br`, predecessor labels for `phi`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Instruction {
    /// Build a bare instruction with the given operator and no envelope.
    #[must_use]
    pub fn new(op: Op) -> Self {
        Self {
            op,
            dest: None,
            typ: None,
            value: None,
            args: Vec::new(),
            funcs: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Build an unconditional jump to `target`.
    #[must_use]
    pub fn jmp(target: impl Into<String>) -> Self {
        let mut instr = Self::new(Op::Jmp);
        instr.labels = vec![target.into()];
        instr
    }

    /// Build a copy of `src` into `dest`.
    #[must_use]
    pub fn copy(dest: impl Into<String>, src: impl Into<String>) -> Self {
        let mut instr = Self::new(Op::Id);
        instr.dest = Some(dest.into());
        instr.args = vec![src.into()];
        instr
    }
}

/// One element of a function body: either a label or an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
    /// A label marking the start of a basic block.
    Label {
        /// The label text. Non-empty and unique within the function.
        label: String,
    },
    /// An operation instruction.
    Instr(Instruction),
}

impl Item {
    /// Build a label item.
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Item::Label {
            label: label.into(),
        }
    }

    /// Check whether this item is a label.
    #[must_use]
    pub const fn is_label(&self) -> bool {
        matches!(self, Item::Label { .. })
    }

    /// Check whether this item is a block-ending terminator.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        match self {
            Item::Instr(instr) => instr.op.is_terminator(),
            Item::Label { .. } => false,
        }
    }

    /// View this item as an instruction, if it is one.
    #[must_use]
    pub const fn as_instr(&self) -> Option<&Instruction> {
        match self {
            Item::Instr(instr) => Some(instr),
            Item::Label { .. } => None,
        }
    }

    /// Mutable view of this item as an instruction, if it is one.
    pub fn as_instr_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            Item::Instr(instr) => Some(instr),
            Item::Label { .. } => None,
        }
    }

    /// Destination variable defined by this item, if any.
    #[must_use]
    pub fn dest(&self) -> Option<&str> {
        match self {
            Item::Instr(instr) => instr.dest.as_deref(),
            Item::Label { .. } => None,
        }
    }
}

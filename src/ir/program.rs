//! Top-level program, function, and record declarations.

use std::io;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

use super::instruction::Item;
use super::types::Type;

/// A complete IL program: the unit both drivers consume and produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// All functions, in declaration order.
    pub functions: Vec<Function>,

    /// Record declarations, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structs: Vec<RecordDecl>,
}

impl Program {
    /// Parse a program from its JSON surface form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] when the input is not valid JSON or does
    /// not match the program schema.
    pub fn from_json(json: &str) -> Result<Self> {
        let prog = serde_json::from_str(json).map_err(ParseError::Json)?;
        Ok(prog)
    }

    /// Parse a program from a reader carrying its JSON surface form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] on malformed input, or [`crate::Error::Io`]
    /// when the reader fails.
    pub fn from_reader(reader: impl io::Read) -> Result<Self> {
        let prog = serde_json::from_reader(reader).map_err(ParseError::Json)?;
        Ok(prog)
    }

    /// Serialize the program back to compact JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Serialization of these derive-only types cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Look up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// A single IL function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Function name, unique within the program.
    pub name: String,

    /// Formal parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Param>,

    /// Declared return type, absent for void functions.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub typ: Option<Type>,

    /// Linear instruction stream.
    pub instrs: Vec<Item>,
}

/// A named, typed binding: formal parameter or record member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Binding name.
    pub name: String,

    /// Binding type.
    #[serde(rename = "type")]
    pub typ: Type,
}

/// A record declaration: an ordered sequence of named, typed members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDecl {
    /// Record name, keyed into [`Type::Record`].
    pub name: String,

    /// Ordered members.
    pub mbrs: Vec<Param>,
}

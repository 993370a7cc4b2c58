//! Per-function lowering context and program-level record layouts.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::LowerError;
use crate::ir::{Function, Literal, Op, RecordDecl, Type};

/// Render an IL type as LLVM assembly text.
#[must_use]
pub(crate) fn llvm_type(typ: &Type) -> String {
    match typ {
        Type::Int => "i64".to_string(),
        Type::Bool => "i1".to_string(),
        Type::Ptr(inner) => format!("{}*", llvm_type(inner)),
        Type::Record(name) => format!("%{name}"),
    }
}

/// Record sizes and member offsets for the whole program.
///
/// Built once per program, before any function is emitted, and passed by
/// reference to function emission.
#[derive(Debug, Default)]
pub struct RecordLayouts {
    sizes: IndexMap<String, i64>,
    offsets: IndexMap<String, IndexMap<String, usize>>,
    decls: Vec<(String, Vec<String>)>,
}

impl RecordLayouts {
    /// Accumulate sizes and member offsets in declaration order.
    ///
    /// A member of a record type declared *later* sizes as a plain word,
    /// matching the one-pass accumulation: only already-seen records resolve
    /// transitively.
    #[must_use]
    pub fn build(records: &[RecordDecl]) -> Self {
        let mut layouts = Self::default();

        for record in records {
            let mut size = 0i64;
            let mut members = IndexMap::new();
            let mut rendered = Vec::with_capacity(record.mbrs.len());

            for (index, mbr) in record.mbrs.iter().enumerate() {
                size += layouts.size_of(&mbr.typ);
                members.insert(mbr.name.clone(), index);
                rendered.push(llvm_type(&mbr.typ));
            }

            layouts.sizes.insert(record.name.clone(), size);
            layouts.offsets.insert(record.name.clone(), members);
            layouts.decls.push((record.name.clone(), rendered));
        }

        layouts
    }

    /// Byte size of a type: bools one byte, pointers and ints a word,
    /// records the sum of their member sizes.
    #[must_use]
    pub fn size_of(&self, typ: &Type) -> i64 {
        match typ {
            Type::Bool => 1,
            Type::Ptr(_) => 8,
            Type::Record(name) => self.sizes.get(name).copied().unwrap_or(8),
            Type::Int => 8,
        }
    }

    /// Ordinal of `member` within `record`'s declaration.
    pub fn member_offset(&self, record: &str, member: &str) -> Result<usize, LowerError> {
        let members = self
            .offsets
            .get(record)
            .ok_or_else(|| LowerError::UnknownRecord {
                name: record.to_string(),
            })?;
        members
            .get(member)
            .copied()
            .ok_or_else(|| LowerError::UnknownMember {
                record: record.to_string(),
                member: member.to_string(),
            })
    }

    /// LLVM type declaration lines, one per record, in declaration order.
    #[must_use]
    pub fn declarations(&self) -> Vec<String> {
        self.decls
            .iter()
            .map(|(name, members)| format!("%{name} = type {{ {} }}", members.join(", ")))
            .collect()
    }
}

/// Per-function variable metadata driving emission.
///
/// One pass over the instructions records every variable's type, folds
/// `const` literals into a constant table, and canonicalizes `id` copy
/// chains so copies vanish at use sites.
#[derive(Debug)]
pub struct FnContext {
    types: HashMap<String, Type>,
    constants: HashMap<String, i64>,
    canonical: HashMap<String, String>,
    is_main: bool,
    next_tmp: usize,
}

impl FnContext {
    /// Build the context for one (already renamed and prefixed) function.
    ///
    /// # Errors
    ///
    /// Fails when a destination lacks a type, a φ's first argument has no
    /// recorded type, or a `const`/`id` is missing its payload.
    pub fn build(func: &Function) -> Result<Self, LowerError> {
        let mut types: HashMap<String, Type> = func
            .args
            .iter()
            .map(|arg| (arg.name.clone(), arg.typ.clone()))
            .collect();
        let mut constants: HashMap<String, i64> = HashMap::new();
        let mut canonical: HashMap<String, String> = HashMap::new();

        for item in &func.instrs {
            let Some(instr) = item.as_instr() else {
                continue;
            };

            if let Some(dest) = &instr.dest {
                if instr.op == Op::Phi {
                    // Renaming made every variable single-valued, so the
                    // first argument's type is the φ's type.
                    let first = instr.args.first().ok_or(LowerError::MalformedInstruction {
                        op: "phi".to_string(),
                        reason: "missing arguments",
                    })?;
                    let typ = types
                        .get(first)
                        .cloned()
                        .ok_or_else(|| LowerError::UnknownPhiType { dest: dest.clone() })?;
                    types.insert(dest.clone(), typ);
                } else {
                    let typ = instr
                        .typ
                        .clone()
                        .ok_or_else(|| LowerError::MissingType { dest: dest.clone() })?;
                    types.insert(dest.clone(), typ);

                    if instr.op == Op::Id {
                        let src = instr.args.first().ok_or(LowerError::MalformedInstruction {
                            op: "id".to_string(),
                            reason: "missing source argument",
                        })?;
                        if let Some(&value) = constants.get(src) {
                            constants.insert(dest.clone(), value);
                        } else if let Some(canon) = canonical.get(src) {
                            canonical.insert(dest.clone(), canon.clone());
                        } else {
                            canonical.insert(dest.clone(), src.clone());
                        }
                    }
                }
            }

            if let Some(value) = instr.value {
                let dest = instr.dest.clone().ok_or(LowerError::MalformedInstruction {
                    op: instr.op.name().to_string(),
                    reason: "literal value without a destination",
                })?;
                let normalized = match instr.typ {
                    Some(Type::Bool) => match value {
                        Literal::Bool(b) => i64::from(b),
                        Literal::Int(v) => i64::from(v != 0),
                    },
                    _ => value.as_int(),
                };
                constants.insert(dest, normalized);
            }
        }

        Ok(Self {
            types,
            constants,
            canonical,
            is_main: func.name == "__main",
            next_tmp: 0,
        })
    }

    /// Whether this function is the program's (prefixed) entry point.
    #[must_use]
    pub const fn is_main(&self) -> bool {
        self.is_main
    }

    /// Recorded type of a variable.
    pub fn type_of(&self, name: &str) -> Result<&Type, LowerError> {
        self.types.get(name).ok_or_else(|| LowerError::UnknownVariable {
            name: name.to_string(),
        })
    }

    /// Allocate a fresh emitter temporary with prefix `z`.
    ///
    /// Temporaries created only to thread a value through a cast carry no
    /// type and are never queried.
    pub fn new_tmp(&mut self, typ: Option<Type>) -> String {
        let name = format!("z{}", self.next_tmp);
        self.next_tmp += 1;
        if let Some(typ) = typ {
            self.types.insert(name.clone(), typ);
        }
        name
    }

    /// Render arguments for emission, comma separated.
    ///
    /// Each argument renders as its constant literal, its canonical name, or
    /// its own name, in that priority order; `show_types` prefixes each with
    /// its LLVM type. A pointer-typed zero constant renders as `null`.
    pub fn format_args<'a>(
        &self,
        args: impl IntoIterator<Item = &'a str>,
        show_types: bool,
    ) -> Result<String, LowerError> {
        let mut rendered = Vec::new();

        for arg in args {
            let typ = self.type_of(arg)?;
            let value = if let Some(&constant) = self.constants.get(arg) {
                if typ.is_ptr() && constant == 0 {
                    "null".to_string()
                } else {
                    constant.to_string()
                }
            } else if let Some(canon) = self.canonical.get(arg) {
                format!("%{canon}")
            } else {
                format!("%{arg}")
            };

            if show_types {
                rendered.push(format!("{} {value}", llvm_type(typ)));
            } else {
                rendered.push(value);
            }
        }

        Ok(rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Program;

    fn func_of(json: &str) -> Function {
        let prog: Program = serde_json::from_str(json).unwrap();
        prog.functions.into_iter().next().unwrap()
    }

    #[test]
    fn test_llvm_type_rendering() {
        assert_eq!(llvm_type(&Type::Int), "i64");
        assert_eq!(llvm_type(&Type::Bool), "i1");
        assert_eq!(llvm_type(&Type::Ptr(Box::new(Type::Int))), "i64*");
        assert_eq!(llvm_type(&Type::Record("pair".to_string())), "%pair");
        assert_eq!(
            llvm_type(&Type::Ptr(Box::new(Type::Record("pair".to_string())))),
            "%pair*"
        );
    }

    #[test]
    fn test_record_layouts() {
        let prog: Program = serde_json::from_str(
            r#"{"functions": [], "structs": [
                {"name": "flags", "mbrs": [
                    {"name": "a", "type": "bool"},
                    {"name": "b", "type": "bool"}
                ]},
                {"name": "pair", "mbrs": [
                    {"name": "first", "type": "int"},
                    {"name": "inner", "type": "flags"}
                ]}
            ]}"#,
        )
        .unwrap();

        let layouts = RecordLayouts::build(&prog.structs);

        assert_eq!(layouts.size_of(&Type::Record("flags".to_string())), 2);
        // Transitive: pair embeds the already-declared flags.
        assert_eq!(layouts.size_of(&Type::Record("pair".to_string())), 10);

        assert_eq!(layouts.member_offset("pair", "inner").unwrap(), 1);
        assert!(layouts.member_offset("pair", "third").is_err());
        assert!(layouts.member_offset("ghost", "a").is_err());

        assert_eq!(
            layouts.declarations(),
            vec![
                "%flags = type { i1, i1 }".to_string(),
                "%pair = type { i64, %flags }".to_string(),
            ]
        );
    }

    #[test]
    fn test_constant_folding_and_canonicalization() {
        let func = func_of(
            r#"{"functions": [{"name": "__f", "instrs": [
                {"op": "const", "dest": "one", "type": "int", "value": 1},
                {"op": "const", "dest": "t", "type": "bool", "value": true},
                {"op": "id", "dest": "copy", "type": "int", "args": ["one"]},
                {"op": "add", "dest": "sum", "type": "int", "args": ["one", "one"]},
                {"op": "id", "dest": "alias", "type": "int", "args": ["sum"]},
                {"op": "id", "dest": "alias2", "type": "int", "args": ["alias"]}
            ]}]}"#,
        );
        let ctx = FnContext::build(&func).unwrap();

        // Constants propagate through copies; booleans normalize to 0/1.
        assert_eq!(ctx.format_args(["one"], false).unwrap(), "1");
        assert_eq!(ctx.format_args(["copy"], false).unwrap(), "1");
        assert_eq!(ctx.format_args(["t"], true).unwrap(), "i1 1");

        // Copy chains collapse to the canonical source, non-recursively.
        assert_eq!(ctx.format_args(["alias"], false).unwrap(), "%sum");
        assert_eq!(ctx.format_args(["alias2"], false).unwrap(), "%sum");

        // Plain names render as themselves.
        assert_eq!(ctx.format_args(["sum"], true).unwrap(), "i64 %sum");
    }

    #[test]
    fn test_null_pointer_rendering() {
        let func = func_of(
            r#"{"functions": [{"name": "__f", "instrs": [
                {"op": "const", "dest": "p", "type": {"ptr": "int"}, "value": 0}
            ]}]}"#,
        );
        let ctx = FnContext::build(&func).unwrap();
        assert_eq!(ctx.format_args(["p"], true).unwrap(), "i64* null");
    }

    #[test]
    fn test_phi_type_inherited_from_first_argument() {
        let func = func_of(
            r#"{"functions": [{"name": "__f", "instrs": [
                {"op": "const", "dest": "a", "type": "bool", "value": true},
                {"op": "phi", "dest": "m", "args": ["a", "b"], "labels": ["l", "r"]}
            ]}]}"#,
        );
        let ctx = FnContext::build(&func).unwrap();
        assert_eq!(ctx.type_of("m").unwrap(), &Type::Bool);
    }

    #[test]
    fn test_phi_with_untyped_first_argument_is_fatal() {
        let func = func_of(
            r#"{"functions": [{"name": "__f", "instrs": [
                {"op": "phi", "dest": "m", "args": ["nowhere", "b"], "labels": ["l", "r"]}
            ]}]}"#,
        );
        assert!(matches!(
            FnContext::build(&func),
            Err(LowerError::UnknownPhiType { .. })
        ));
    }

    #[test]
    fn test_temporaries_count_up() {
        let func = func_of(r#"{"functions": [{"name": "__f", "instrs": []}]}"#);
        let mut ctx = FnContext::build(&func).unwrap();

        assert_eq!(ctx.new_tmp(Some(Type::Int)), "z0");
        assert_eq!(ctx.new_tmp(None), "z1");
        assert!(ctx.type_of("z0").is_ok());
        assert!(ctx.type_of("z1").is_err());
    }
}

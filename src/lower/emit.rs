//! Per-instruction translation to LLVM assembly text.

use std::fmt::Write as _;

use tracing::trace;

use crate::error::LowerError;
use crate::ir::{Function, Instruction, Item, Op, Type};

use super::context::{llvm_type, FnContext, RecordLayouts};

type EmitResult = Result<(), LowerError>;

/// LLVM mnemonic for a binary value operator.
fn binary_mnemonic(op: &Op) -> Option<&'static str> {
    match op {
        Op::Add => Some("add"),
        Op::Mul => Some("mul"),
        Op::Sub => Some("sub"),
        Op::Div => Some("sdiv"),
        Op::Eq => Some("icmp eq"),
        Op::Lt => Some("icmp slt"),
        Op::Gt => Some("icmp sgt"),
        Op::Le => Some("icmp sle"),
        Op::Ge => Some("icmp sge"),
        Op::And => Some("and"),
        Op::Or => Some("or"),
        _ => None,
    }
}

/// `print_<suffix>` runtime helper for a printed operand's type.
fn print_suffix(typ: &Type) -> &'static str {
    match typ {
        Type::Int => "int",
        Type::Bool => "bool",
        Type::Ptr(_) | Type::Record(_) => "ptr",
    }
}

/// Emit one function: header, body items, footer.
///
/// # Errors
///
/// Fails when an instruction is missing fields required by its translation.
pub fn emit_function(
    func: &Function,
    ctx: &mut FnContext,
    layouts: &RecordLayouts,
    out: &mut String,
) -> crate::error::Result<()> {
    let ret_type = func
        .typ
        .as_ref()
        .map_or_else(|| "void".to_string(), llvm_type);
    let params = func
        .args
        .iter()
        .map(|arg| format!("{} %{}", llvm_type(&arg.typ), arg.name))
        .collect::<Vec<_>>()
        .join(", ");

    write!(out, "\ndefine dso_local {ret_type} @{}({params}) {{\n", func.name)
        .map_err(LowerError::from)?;

    for item in &func.instrs {
        emit_item(item, ctx, layouts, out)?;
    }

    out.push_str("\n}\n\n");
    Ok(())
}

/// Emit one item: a label line or the translation of an operation.
fn emit_item(
    item: &Item,
    ctx: &mut FnContext,
    layouts: &RecordLayouts,
    out: &mut String,
) -> EmitResult {
    let instr = match item {
        Item::Label { label } => {
            writeln!(out, "{label}:")?;
            return Ok(());
        }
        Item::Instr(instr) => instr,
    };

    if instr.dest.is_some() {
        emit_value(instr, ctx, layouts, out)
    } else {
        emit_effect(instr, ctx, out)
    }
}

/// Value operations: those carrying a destination.
fn emit_value(
    instr: &Instruction,
    ctx: &mut FnContext,
    layouts: &RecordLayouts,
    out: &mut String,
) -> EmitResult {
    let dest = instr.dest.as_deref().unwrap_or_default();
    let args: Vec<&str> = instr.args.iter().map(String::as_str).collect();

    match &instr.op {
        Op::Call => {
            let typ = instr.typ.as_ref().ok_or_else(|| LowerError::MissingType {
                dest: dest.to_string(),
            })?;
            let callee = instr.funcs.first().ok_or(LowerError::MalformedInstruction {
                op: "call".to_string(),
                reason: "missing callee",
            })?;
            writeln!(
                out,
                "  %{dest} = call {} @__{callee}({})",
                llvm_type(typ),
                ctx.format_args(args.iter().copied(), true)?
            )?;
        }

        Op::Not => {
            writeln!(
                out,
                "  %{dest} = xor i1 1, {}",
                ctx.format_args(args.iter().copied(), false)?
            )?;
        }

        op if binary_mnemonic(op).is_some() => {
            let mnemonic = binary_mnemonic(op).unwrap_or_default();
            let first = args.first().ok_or(LowerError::MalformedInstruction {
                op: op.name().to_string(),
                reason: "missing operands",
            })?;
            writeln!(
                out,
                "  %{dest} = {mnemonic} {} {}",
                llvm_type(ctx.type_of(first)?),
                ctx.format_args(args.iter().copied(), false)?
            )?;
        }

        Op::Phi => emit_phi(instr, dest, &args, ctx, out)?,

        Op::Alloc => {
            let typ = instr.typ.as_ref().ok_or_else(|| LowerError::MissingType {
                dest: dest.to_string(),
            })?;
            let pointee = typ.pointee().ok_or(LowerError::MalformedInstruction {
                op: "alloc".to_string(),
                reason: "destination type is not a pointer",
            })?;

            let bytes = ctx.new_tmp(Some(Type::Int));
            writeln!(
                out,
                "  %{bytes} = mul i64 {}, {}",
                ctx.format_args(args.iter().copied(), false)?,
                layouts.size_of(pointee)
            )?;

            let raw = ctx.new_tmp(None);
            writeln!(
                out,
                "  %{raw} = call i8* @malloc({})",
                ctx.format_args([bytes.as_str()], true)?
            )?;
            writeln!(out, "  %{dest} = bitcast i8* %{raw} to {}", llvm_type(typ))?;
        }

        Op::Load => {
            let typ = instr.typ.as_ref().ok_or_else(|| LowerError::MissingType {
                dest: dest.to_string(),
            })?;
            writeln!(
                out,
                "  %{dest} = load {}, {}",
                llvm_type(typ),
                ctx.format_args(args.iter().copied(), true)?
            )?;
        }

        Op::Ptradd => {
            let typ = instr.typ.as_ref().ok_or_else(|| LowerError::MissingType {
                dest: dest.to_string(),
            })?;
            let pointee = typ.pointee().ok_or(LowerError::MalformedInstruction {
                op: "ptradd".to_string(),
                reason: "destination type is not a pointer",
            })?;
            writeln!(
                out,
                "  %{dest} = getelementptr inbounds {}, {}",
                llvm_type(pointee),
                ctx.format_args(args.iter().copied(), true)?
            )?;
        }

        Op::Getmbr => {
            let base = args.first().ok_or(LowerError::MalformedInstruction {
                op: "getmbr".to_string(),
                reason: "missing base pointer",
            })?;
            let member = args.get(1).ok_or(LowerError::MalformedInstruction {
                op: "getmbr".to_string(),
                reason: "missing member name",
            })?;

            let record = match ctx.type_of(base)?.pointee() {
                Some(Type::Record(name)) => name.clone(),
                _ => {
                    return Err(LowerError::MalformedInstruction {
                        op: "getmbr".to_string(),
                        reason: "base is not a record pointer",
                    })
                }
            };
            let offset = layouts.member_offset(&record, member)?;

            writeln!(
                out,
                "  %{dest} = getelementptr inbounds %{record}, {}, i64 0, i32 {offset}",
                ctx.format_args([*base], true)?
            )?;
        }

        Op::Isnull => {
            let word = ctx.new_tmp(Some(Type::Int));
            writeln!(
                out,
                "  %{word} = ptrtoint {} to i64",
                ctx.format_args(args.iter().copied(), true)?
            )?;
            writeln!(out, "  %{dest} = icmp eq i64 0, %{word}")?;
        }

        // Copies and constants fold into their use sites.
        Op::Id | Op::Const => {}

        other => {
            trace!(op = other.name(), "skipping unknown value operation");
        }
    }

    Ok(())
}

/// φ-assembly: (value, predecessor label) pairs in reversed argument order.
fn emit_phi(
    instr: &Instruction,
    dest: &str,
    args: &[&str],
    ctx: &FnContext,
    out: &mut String,
) -> EmitResult {
    let first = args.first().ok_or(LowerError::MalformedInstruction {
        op: "phi".to_string(),
        reason: "missing arguments",
    })?;
    if instr.labels.len() != args.len() {
        return Err(LowerError::MalformedInstruction {
            op: "phi".to_string(),
            reason: "argument and label counts differ",
        });
    }

    let mut pairs = Vec::with_capacity(args.len());
    for index in (0..args.len()).rev() {
        pairs.push(format!(
            "[ {}, %{} ]",
            ctx.format_args([args[index]], false)?,
            instr.labels[index]
        ));
    }

    writeln!(
        out,
        "  %{dest} = phi {} {}",
        llvm_type(ctx.type_of(first)?),
        pairs.join(", ")
    )?;
    Ok(())
}

/// Effect operations: those without a destination.
fn emit_effect(instr: &Instruction, ctx: &mut FnContext, out: &mut String) -> EmitResult {
    let args: Vec<&str> = instr.args.iter().map(String::as_str).collect();

    match &instr.op {
        Op::Br => {
            let (then_l, else_l) = match (instr.labels.first(), instr.labels.get(1)) {
                (Some(t), Some(e)) => (t, e),
                _ => {
                    return Err(LowerError::MalformedInstruction {
                        op: "br".to_string(),
                        reason: "needs two target labels",
                    })
                }
            };
            writeln!(
                out,
                "  br i1 {}, label %{then_l}, label %{else_l}",
                ctx.format_args(args.iter().copied(), false)?
            )?;
        }

        Op::Jmp => {
            let target = instr.labels.first().ok_or(LowerError::MalformedInstruction {
                op: "jmp".to_string(),
                reason: "missing target label",
            })?;
            writeln!(out, "  br label %{target}")?;
        }

        Op::Ret => {
            let value = ctx.format_args(args.iter().copied(), true)?;
            // The entry function's declared result is discarded; it always
            // returns void internally.
            if value.is_empty() || ctx.is_main() {
                writeln!(out, "  ret void")?;
            } else {
                writeln!(out, "  ret {value}")?;
            }
        }

        Op::Call => {
            let callee = instr.funcs.first().ok_or(LowerError::MalformedInstruction {
                op: "call".to_string(),
                reason: "missing callee",
            })?;
            writeln!(
                out,
                "  call void @__{callee}({})",
                ctx.format_args(args.iter().copied(), true)?
            )?;
        }

        Op::Print => {
            let mut calls = Vec::with_capacity(args.len());
            for arg in &args {
                let suffix = print_suffix(ctx.type_of(arg)?);
                calls.push(format!(
                    "  call void @print_{suffix}({})",
                    ctx.format_args([*arg], true)?
                ));
            }
            writeln!(out, "{}", calls.join("\n  call void @print_space()\n"))?;
            writeln!(out, "  call void @print_newline()")?;
        }

        Op::Free => {
            let raw = ctx.new_tmp(None);
            writeln!(
                out,
                "  %{raw} = bitcast {} to i8*",
                ctx.format_args(args.iter().copied(), true)?
            )?;
            writeln!(out, "  call void @free(i8* %{raw})")?;
        }

        Op::Store => {
            // Value precedes pointer in LLVM store syntax, the reverse of
            // the IL argument order.
            writeln!(
                out,
                "  store {}",
                ctx.format_args(args.iter().rev().copied(), true)?
            )?;
        }

        other => {
            trace!(op = other.name(), "skipping unknown effect operation");
        }
    }

    Ok(())
}

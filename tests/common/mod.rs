//! Common test utilities and helpers
//!
//! Program builders plus a reference interpreter for the scalar IL subset,
//! used to check that transformations preserve observable behavior.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::collections::HashMap;

use il_midend::ir::{Function, Item, Literal, Op, Program, Type};

/// Parse a JSON program, panicking on malformed test fixtures.
pub fn parse_program(json: &str) -> Program {
    Program::from_json(json).expect("test fixture should parse")
}

/// A runtime value in the reference interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    fn as_int(self) -> i64 {
        match self {
            Value::Int(v) => v,
            Value::Bool(b) => i64::from(b),
        }
    }

    fn as_bool(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::Int(v) => v != 0,
        }
    }

    fn render(self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Bool(b) => b.to_string(),
        }
    }
}

/// Execute a program's `main` with no arguments, collecting printed lines.
pub fn run_main(prog: &Program) -> (Option<Value>, Vec<String>) {
    let main = prog
        .function("main")
        .expect("test program should have a main");
    let mut output = Vec::new();
    let result = run_function(prog, main, &[], &mut output);
    (result, output)
}

/// Execute one function on the scalar subset of the IL.
///
/// Supports arithmetic, comparisons, boolean logic, copies, constants,
/// control flow, calls, and `print`. φ-instructions are rejected: programs
/// under interpretation are expected to be φ-free.
pub fn run_function(
    prog: &Program,
    func: &Function,
    args: &[Value],
    output: &mut Vec<String>,
) -> Option<Value> {
    let mut env: HashMap<String, Value> = func
        .args
        .iter()
        .zip(args)
        .map(|(param, value)| (param.name.clone(), *value))
        .collect();

    let labels: HashMap<&str, usize> = func
        .instrs
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            Item::Label { label } => Some((label.as_str(), index)),
            Item::Instr(_) => None,
        })
        .collect();

    let lookup = |env: &HashMap<String, Value>, name: &str| -> Value {
        *env.get(name)
            .unwrap_or_else(|| panic!("use of unbound variable {name}"))
    };

    let mut pc = 0usize;
    let mut steps = 0usize;

    while pc < func.instrs.len() {
        steps += 1;
        assert!(steps < 100_000, "interpreter ran away");

        let instr = match &func.instrs[pc] {
            Item::Label { .. } => {
                pc += 1;
                continue;
            }
            Item::Instr(instr) => instr,
        };

        match &instr.op {
            Op::Const => {
                let dest = instr.dest.clone().expect("const without dest");
                let value = match (instr.typ.as_ref(), instr.value.expect("const without value")) {
                    (Some(Type::Bool), literal) => Value::Bool(literal.as_int() != 0),
                    (_, Literal::Int(v)) => Value::Int(v),
                    (_, Literal::Bool(b)) => Value::Bool(b),
                };
                env.insert(dest, value);
            }

            Op::Id => {
                let dest = instr.dest.clone().expect("id without dest");
                let value = lookup(&env, &instr.args[0]);
                env.insert(dest, value);
            }

            Op::Add | Op::Mul | Op::Sub | Op::Div => {
                let dest = instr.dest.clone().expect("arith without dest");
                let lhs = lookup(&env, &instr.args[0]).as_int();
                let rhs = lookup(&env, &instr.args[1]).as_int();
                let value = match instr.op {
                    Op::Add => lhs.wrapping_add(rhs),
                    Op::Mul => lhs.wrapping_mul(rhs),
                    Op::Sub => lhs.wrapping_sub(rhs),
                    _ => lhs / rhs,
                };
                env.insert(dest, Value::Int(value));
            }

            Op::Eq | Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                let dest = instr.dest.clone().expect("cmp without dest");
                let lhs = lookup(&env, &instr.args[0]).as_int();
                let rhs = lookup(&env, &instr.args[1]).as_int();
                let value = match instr.op {
                    Op::Eq => lhs == rhs,
                    Op::Lt => lhs < rhs,
                    Op::Gt => lhs > rhs,
                    Op::Le => lhs <= rhs,
                    _ => lhs >= rhs,
                };
                env.insert(dest, Value::Bool(value));
            }

            Op::And | Op::Or => {
                let dest = instr.dest.clone().expect("logic without dest");
                let lhs = lookup(&env, &instr.args[0]).as_bool();
                let rhs = lookup(&env, &instr.args[1]).as_bool();
                let value = if instr.op == Op::And { lhs && rhs } else { lhs || rhs };
                env.insert(dest, Value::Bool(value));
            }

            Op::Not => {
                let dest = instr.dest.clone().expect("not without dest");
                let value = !lookup(&env, &instr.args[0]).as_bool();
                env.insert(dest, Value::Bool(value));
            }

            Op::Jmp => {
                pc = labels[instr.labels[0].as_str()];
                continue;
            }

            Op::Br => {
                let cond = lookup(&env, &instr.args[0]).as_bool();
                let target = if cond { &instr.labels[0] } else { &instr.labels[1] };
                pc = labels[target.as_str()];
                continue;
            }

            Op::Ret => {
                return instr.args.first().map(|arg| lookup(&env, arg));
            }

            Op::Call => {
                let callee_name = instr.funcs.first().expect("call without callee");
                let callee = prog
                    .function(callee_name)
                    .unwrap_or_else(|| panic!("call to unknown function {callee_name}"));
                let values: Vec<Value> =
                    instr.args.iter().map(|arg| lookup(&env, arg)).collect();
                let result = run_function(prog, callee, &values, output);
                if let Some(dest) = instr.dest.clone() {
                    env.insert(dest, result.expect("value call returned nothing"));
                }
            }

            Op::Print => {
                let line = instr
                    .args
                    .iter()
                    .map(|arg| lookup(&env, arg).render())
                    .collect::<Vec<_>>()
                    .join(" ");
                output.push(line);
            }

            Op::Phi => panic!("interpreter does not execute phi instructions"),

            other => panic!("interpreter does not support op {other:?}"),
        }

        pc += 1;
    }

    None
}

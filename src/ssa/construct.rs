//! SSA construction: φ placement over dominance frontiers, then renaming
//! along the dominator tree.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::trace;

use crate::cfg::{dom_frontier, dom_tree, dominators, Cfg, NodeId};
use crate::error::{CfgError, Result, SsaError};
use crate::ir::{Instruction, Item, Op, Type};

/// Sentinel substituted for a φ argument whose variable has no reaching
/// definition along that edge.
pub const UNDEF: &str = "__undef";

/// Definition sites and the agreed type of one variable.
struct DefSites {
    typ: Type,
    worklist: Vec<NodeId>,
}

/// Convert the graph to SSA form in place.
///
/// Formal parameter names in `params` are treated as already defined at the
/// entry: their rename stacks start with the parameter's own name, so the
/// first redefinition produces version `name.0` while plain uses keep the
/// original identifier.
///
/// # Errors
///
/// Fails when a definition lacks a type ([`SsaError::MissingType`]), when two
/// definitions of one variable disagree ([`SsaError::TypeConflict`]), when a
/// non-φ use has no reaching definition ([`SsaError::UndefinedVariable`]), or
/// when the input already carries φs ([`SsaError::UnexpectedPhi`]).
pub fn to_ssa(cfg: &mut Cfg, params: &[String]) -> Result<()> {
    let dom = dominators(cfg);
    let frontier = dom_frontier(cfg, &dom);
    let tree = dom_tree(cfg, &dom);

    // Gather Defs[v] and Types[v]; `vars[n]` is the set of variables with a
    // definition inside node n.
    let mut defs: IndexMap<String, DefSites> = IndexMap::new();
    let mut vars: Vec<BTreeSet<String>> = vec![BTreeSet::new(); cfg.len()];

    for node in cfg.nodes() {
        for item in &node.block.items {
            let Item::Instr(instr) = item else {
                continue;
            };
            if instr.op == Op::Phi {
                return Err(SsaError::UnexpectedPhi {
                    var: instr.dest.clone().unwrap_or_default(),
                }
                .into());
            }
            let Some(dest) = instr.dest.clone() else {
                continue;
            };
            if vars[node.id.0].contains(&dest) {
                continue;
            }

            let typ = instr
                .typ
                .clone()
                .ok_or_else(|| SsaError::MissingType { var: dest.clone() })?;

            match defs.get_mut(&dest) {
                Some(info) => {
                    if info.typ != typ {
                        return Err(SsaError::TypeConflict { var: dest }.into());
                    }
                    info.worklist.push(node.id);
                }
                None => {
                    defs.insert(
                        dest.clone(),
                        DefSites {
                            typ,
                            worklist: vec![node.id],
                        },
                    );
                }
            }
            vars[node.id.0].insert(dest);
        }
    }

    place_phis(cfg, &frontier, &mut defs, &vars)?;
    rename(cfg, &tree, &defs, params)
}

/// Phase 1: insert a φ for variable v at every block of the iterated
/// dominance frontier of v's definition sites.
///
/// Each φ gets one predecessor label and one argument (initially the
/// variable itself) per predecessor, in predecessor order. Inserting a φ
/// makes the block a definition site, feeding the worklist.
fn place_phis(
    cfg: &mut Cfg,
    frontier: &[BTreeSet<NodeId>],
    defs: &mut IndexMap<String, DefSites>,
    vars: &[BTreeSet<String>],
) -> Result<()> {
    let var_names: Vec<String> = defs.keys().cloned().collect();
    let mut placed: Vec<BTreeSet<String>> = vec![BTreeSet::new(); cfg.len()];
    let mut inserted = 0usize;

    for var in &var_names {
        let typ = match defs.get(var) {
            Some(info) => info.typ.clone(),
            None => continue,
        };

        loop {
            let Some(site) = defs.get_mut(var).and_then(|info| info.worklist.pop()) else {
                break;
            };

            for &target in &frontier[site.0] {
                if placed[target.0].contains(var) {
                    continue;
                }
                placed[target.0].insert(var.clone());

                let preds = cfg.node(target).preds.clone();
                let labels = preds
                    .iter()
                    .map(|&p| {
                        cfg.node(p)
                            .block
                            .label()
                            .map(str::to_string)
                            .ok_or(CfgError::MissingLabel { node: p.0 })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut phi = Instruction::new(Op::Phi);
                phi.dest = Some(var.clone());
                phi.typ = Some(typ.clone());
                phi.labels = labels;
                phi.args = vec![var.clone(); preds.len()];

                let block = &mut cfg.node_mut(target).block;
                let at = usize::from(block.label().is_some());
                block.items.insert(at, Item::Instr(phi));
                inserted += 1;

                if !vars[target.0].contains(var) {
                    if let Some(info) = defs.get_mut(var) {
                        info.worklist.push(target);
                    }
                }
            }
        }
    }

    trace!(phis = inserted, "phi placement done");
    Ok(())
}

/// One pending step of the dominator-tree walk.
enum Frame {
    /// Process the node's own block and its successors' φs, then descend.
    Enter(NodeId),
    /// Unwind the pushes performed at the node.
    Exit(HashMap<String, usize>),
}

/// Phase 2: walk the dominator tree, substituting argument uses with the
/// top of each variable's rename stack and versioning every destination.
///
/// The walk uses an explicit work stack with per-node push counts so that
/// deep dominator trees cannot exhaust the call stack.
fn rename(
    cfg: &mut Cfg,
    tree: &crate::cfg::DomTree,
    defs: &IndexMap<String, DefSites>,
    params: &[String],
) -> Result<()> {
    let mut stack: HashMap<String, Vec<String>> = defs
        .keys()
        .map(|var| (var.clone(), Vec::new()))
        .collect();
    let mut counter: HashMap<String, usize> =
        defs.keys().map(|var| (var.clone(), 0)).collect();

    // Parameters are their own version zero.
    for param in params {
        stack.insert(param.clone(), vec![param.clone()]);
    }

    // φ origins per node, in block order. A φ's j-th argument is patched from
    // the stack of its *originating* variable, which its (renamed) dest no
    // longer reveals.
    let mut origins: HashMap<NodeId, Vec<String>> = HashMap::new();
    for node in cfg.nodes() {
        for item in &node.block.items {
            if let Some(instr) = item.as_instr() {
                if instr.op == Op::Phi {
                    let dest = instr.dest.clone().unwrap_or_default();
                    origins.entry(node.id).or_default().push(dest);
                }
            }
        }
    }

    let mut work = vec![Frame::Enter(cfg.entry())];

    while let Some(frame) = work.pop() {
        let node = match frame {
            Frame::Exit(pops) => {
                for (var, count) in pops {
                    if let Some(versions) = stack.get_mut(&var) {
                        let keep = versions.len().saturating_sub(count);
                        versions.truncate(keep);
                    }
                }
                continue;
            }
            Frame::Enter(node) => node,
        };

        let mut pops: HashMap<String, usize> = HashMap::new();

        // Rewrite this node's own instructions, uses before definitions.
        for item in &mut cfg.node_mut(node).block.items {
            let Some(instr) = item.as_instr_mut() else {
                continue;
            };

            if instr.op != Op::Phi {
                // getmbr's second argument names a record member, not a
                // variable; it must survive renaming untouched.
                let renameable = if instr.op == Op::Getmbr {
                    1
                } else {
                    instr.args.len()
                };
                for arg in instr.args.iter_mut().take(renameable) {
                    match stack.get(arg.as_str()).and_then(|s| s.last()) {
                        Some(current) => *arg = current.clone(),
                        None => {
                            return Err(SsaError::UndefinedVariable { var: arg.clone() }.into())
                        }
                    }
                }
            }

            if let Some(dest) = instr.dest.clone() {
                let next = counter.entry(dest.clone()).or_insert(0);
                let versioned = format!("{dest}.{next}");
                *next += 1;
                *pops.entry(dest.clone()).or_insert(0) += 1;

                instr.dest = Some(versioned.clone());
                stack.entry(dest).or_default().push(versioned);
            }
        }

        // Feed the φs of every successor through this node's edge slot.
        let succs = cfg.node(node).succs.clone();
        for succ in succs {
            let Some(slot) = cfg.node(succ).preds.iter().position(|&p| p == node) else {
                continue;
            };
            let origin_list = origins.get(&succ).cloned().unwrap_or_default();

            let mut phi_index = 0usize;
            for item in &mut cfg.node_mut(succ).block.items {
                let Some(instr) = item.as_instr_mut() else {
                    continue;
                };
                if instr.op != Op::Phi {
                    continue;
                }

                let origin = origin_list.get(phi_index).cloned().ok_or_else(|| {
                    SsaError::UnexpectedPhi {
                        var: instr.dest.clone().unwrap_or_default(),
                    }
                })?;
                phi_index += 1;

                let current = stack
                    .get(&origin)
                    .and_then(|s| s.last())
                    .cloned()
                    .unwrap_or_else(|| UNDEF.to_string());

                match instr.args.get_mut(slot) {
                    Some(arg) => *arg = current,
                    None => return Err(SsaError::MalformedPhi { field: "args" }.into()),
                }
            }
        }

        work.push(Frame::Exit(pops));
        for &child in tree.children(node).iter().rev() {
            work.push(Frame::Enter(child));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Function, Program};
    use crate::ssa::transform_function;
    use std::collections::HashMap as StdHashMap;

    fn func_of(json: &str) -> Function {
        let prog: Program = serde_json::from_str(json).unwrap();
        prog.functions.into_iter().next().unwrap()
    }

    fn dest_counts(func: &Function) -> StdHashMap<String, usize> {
        let mut counts = StdHashMap::new();
        for item in &func.instrs {
            if let Some(dest) = item.dest() {
                *counts.entry(dest.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn test_straight_line_single_definitions() {
        let mut func = func_of(
            r#"{"functions": [{"name": "main", "instrs": [
                {"op": "const", "dest": "x", "type": "int", "value": 1},
                {"op": "const", "dest": "y", "type": "int", "value": 2},
                {"op": "add", "dest": "z", "type": "int", "args": ["x", "y"]},
                {"op": "ret", "args": ["z"]}
            ]}]}"#,
        );
        transform_function(&mut func, false).unwrap();

        for (dest, count) in dest_counts(&func) {
            assert_eq!(count, 1, "{dest} defined more than once");
        }
        assert!(!func
            .instrs
            .iter()
            .any(|i| matches!(i.as_instr(), Some(instr) if instr.op == Op::Phi)));

        // Uses follow the renamed definitions.
        let ret = func.instrs.last().unwrap().as_instr().unwrap();
        assert_eq!(ret.args, vec!["z.0"]);
    }

    #[test]
    fn test_diamond_gets_one_phi_at_merge() {
        let mut func = func_of(
            r#"{"functions": [{"name": "main", "instrs": [
                {"op": "const", "dest": "c", "type": "bool", "value": true},
                {"op": "br", "args": ["c"], "labels": ["then", "else"]},
                {"label": "then"},
                {"op": "const", "dest": "x", "type": "int", "value": 1},
                {"op": "jmp", "labels": ["join"]},
                {"label": "else"},
                {"op": "const", "dest": "x", "type": "int", "value": 2},
                {"op": "jmp", "labels": ["join"]},
                {"label": "join"},
                {"op": "print", "args": ["x"]},
                {"op": "ret"}
            ]}]}"#,
        );
        transform_function(&mut func, false).unwrap();

        let phis: Vec<_> = func
            .instrs
            .iter()
            .filter_map(Item::as_instr)
            .filter(|instr| instr.op == Op::Phi)
            .collect();
        assert_eq!(phis.len(), 1);

        let phi = phis[0];
        assert_eq!(phi.args.len(), 2);
        assert_eq!(phi.labels, vec!["then", "else"]);
        assert_eq!(phi.args, vec!["x.0", "x.1"]);
        assert_eq!(phi.typ, Some(Type::Int));
    }

    #[test]
    fn test_loop_redefinition_creates_header_phi() {
        let mut func = func_of(
            r#"{"functions": [{"name": "main", "instrs": [
                {"op": "const", "dest": "x", "type": "int", "value": 0},
                {"op": "jmp", "labels": ["header"]},
                {"label": "header"},
                {"op": "const", "dest": "c", "type": "bool", "value": true},
                {"op": "br", "args": ["c"], "labels": ["body", "done"]},
                {"label": "body"},
                {"op": "add", "dest": "x", "type": "int", "args": ["x", "x"]},
                {"op": "jmp", "labels": ["header"]},
                {"label": "done"},
                {"op": "ret", "args": ["x"]}
            ]}]}"#,
        );
        transform_function(&mut func, false).unwrap();

        // The header gets a φ for x merging the entry path and the back edge.
        let phi = func
            .instrs
            .iter()
            .filter_map(Item::as_instr)
            .find(|instr| instr.op == Op::Phi && instr.args.iter().any(|a| a.starts_with("x")))
            .expect("no phi for x at the loop header");
        assert_eq!(phi.args.len(), 2);

        // The body's use of x resolves to the φ's version, and the
        // redefinition gets a fresh version.
        let add = func
            .instrs
            .iter()
            .filter_map(Item::as_instr)
            .find(|instr| instr.op == Op::Add)
            .unwrap();
        assert_eq!(add.args[0], phi.dest.clone().unwrap());
    }

    #[test]
    fn test_parameters_are_version_zero() {
        let mut func = func_of(
            r#"{"functions": [{"name": "f",
                "args": [{"name": "n", "type": "int"}],
                "type": "int",
                "instrs": [
                    {"op": "add", "dest": "m", "type": "int", "args": ["n", "n"]},
                    {"op": "ret", "args": ["m"]}
                ]}]}"#,
        );
        transform_function(&mut func, false).unwrap();

        let add = func
            .instrs
            .iter()
            .filter_map(Item::as_instr)
            .find(|instr| instr.op == Op::Add)
            .unwrap();
        assert_eq!(add.args, vec!["n", "n"]);
        assert_eq!(add.dest.as_deref(), Some("m.0"));
    }

    #[test]
    fn test_undefined_path_yields_undef_sentinel() {
        let mut func = func_of(
            r#"{"functions": [{"name": "main", "instrs": [
                {"op": "const", "dest": "c", "type": "bool", "value": true},
                {"op": "br", "args": ["c"], "labels": ["then", "join"]},
                {"label": "then"},
                {"op": "const", "dest": "x", "type": "int", "value": 1},
                {"op": "jmp", "labels": ["join"]},
                {"label": "join"},
                {"op": "ret"}
            ]}]}"#,
        );
        transform_function(&mut func, false).unwrap();

        let phi = func
            .instrs
            .iter()
            .filter_map(Item::as_instr)
            .find(|instr| instr.op == Op::Phi)
            .expect("merge should get a phi for x");
        assert!(phi.args.contains(&UNDEF.to_string()));
    }

    #[test]
    fn test_use_of_undefined_variable_is_fatal() {
        let mut func = func_of(
            r#"{"functions": [{"name": "main", "instrs": [
                {"op": "print", "args": ["ghost"]},
                {"op": "ret"}
            ]}]}"#,
        );
        let err = transform_function(&mut func, false).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_type_conflict_is_fatal() {
        let mut func = func_of(
            r#"{"functions": [{"name": "main", "instrs": [
                {"op": "const", "dest": "x", "type": "int", "value": 1},
                {"op": "jmp", "labels": ["next"]},
                {"label": "next"},
                {"op": "const", "dest": "x", "type": "bool", "value": true},
                {"op": "ret"}
            ]}]}"#,
        );
        let err = transform_function(&mut func, false).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Ssa(SsaError::TypeConflict { .. })
        ));
    }

    #[test]
    fn test_untyped_definition_is_fatal() {
        let mut func = func_of(
            r#"{"functions": [{"name": "main", "instrs": [
                {"op": "const", "dest": "x", "value": 1},
                {"op": "ret"}
            ]}]}"#,
        );
        let err = transform_function(&mut func, false).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Ssa(SsaError::MissingType { .. })
        ));
    }
}

//! Dominance analysis: dominator sets, dominator tree, dominance frontiers.
//!
//! Uses the classic iterative data-flow formulation over dominator *sets*
//! rather than an immediate-dominator-only algorithm: initialize every
//! non-entry node to the full node set and intersect over predecessors in
//! reverse post-order until a fixed point.

use std::collections::BTreeSet;

use tracing::trace;

use super::graph::{Cfg, NodeId};

/// Dominator sets for every node, indexed by node id.
///
/// Nodes unreachable from the entry keep the universal set after
/// convergence. That is a latent artifact of the saturating initialization;
/// callers must not rely on it.
#[derive(Debug, Clone)]
pub struct Dominators {
    sets: Vec<BTreeSet<NodeId>>,
}

impl Dominators {
    /// The set of nodes dominating `node` (including itself).
    #[must_use]
    pub fn dom(&self, node: NodeId) -> &BTreeSet<NodeId> {
        &self.sets[node.0]
    }

    /// Check whether `d` dominates `node`. Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, d: NodeId, node: NodeId) -> bool {
        self.sets[node.0].contains(&d)
    }
}

/// Compute dominator sets for the graph.
///
/// `Dom[entry] = {entry}`; for every other node the fixed point of
/// `Dom[n] = {n} ∪ ⋂ Dom[p] over predecessors p`, iterated in reverse
/// post-order over the entry-reachable subgraph. The intersection over an
/// empty predecessor set is the full node set.
#[must_use]
pub fn dominators(cfg: &Cfg) -> Dominators {
    let all: BTreeSet<NodeId> = (0..cfg.len()).map(NodeId).collect();
    let mut sets = vec![all.clone(); cfg.len()];
    sets[cfg.entry().0] = BTreeSet::from([cfg.entry()]);

    let post = post_order(cfg);
    let mut rounds = 0usize;
    let mut changed = true;

    while changed {
        changed = false;
        rounds += 1;

        for &node in post.iter().rev() {
            if node == cfg.entry() {
                continue;
            }

            let mut new = all.clone();
            for &pred in &cfg.node(node).preds {
                let pred_dom = &sets[pred.0];
                new.retain(|candidate| pred_dom.contains(candidate));
            }
            new.insert(node);

            if new != sets[node.0] {
                sets[node.0] = new;
                changed = true;
            }
        }
    }

    trace!(nodes = cfg.len(), rounds, "dominator sets converged");
    Dominators { sets }
}

/// Post-order over the entry-reachable subgraph.
fn post_order(cfg: &Cfg) -> Vec<NodeId> {
    let mut visited = BTreeSet::new();
    let mut order = Vec::new();
    if !cfg.is_empty() {
        visit(cfg, cfg.entry(), &mut visited, &mut order);
    }
    order
}

fn visit(cfg: &Cfg, node: NodeId, visited: &mut BTreeSet<NodeId>, order: &mut Vec<NodeId>) {
    visited.insert(node);
    for &succ in &cfg.node(node).succs {
        if !visited.contains(&succ) {
            visit(cfg, succ, visited, order);
        }
    }
    order.push(node);
}

/// Dominator tree: parents and ordered children, indexed by node id.
///
/// The entry (and any node without a unique strict dominator) has parent
/// `None`.
#[derive(Debug, Clone)]
pub struct DomTree {
    parent: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
}

impl DomTree {
    /// Immediate dominator of `node`, if any.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent[node.0]
    }

    /// Nodes immediately dominated by `node`, in ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node.0]
    }
}

/// Derive the dominator tree from dominator sets.
///
/// A strict dominator `d` of `n` is the immediate dominator iff no other
/// strict dominator of `n` is itself strictly dominated by `d`. Immediate
/// dominators are unique in well-formed graphs.
#[must_use]
pub fn dom_tree(cfg: &Cfg, dom: &Dominators) -> DomTree {
    let mut parent = vec![None; cfg.len()];
    let mut children = vec![Vec::new(); cfg.len()];

    for i in 0..cfg.len() {
        let node = NodeId(i);

        'candidates: for &d in dom.dom(node) {
            if d == node {
                continue;
            }

            for &other in dom.dom(node) {
                if other != d && other != node && dom.dom(other).contains(&d) {
                    continue 'candidates;
                }
            }

            parent[i] = Some(d);
            children[d.0].push(node);
        }
    }

    DomTree { parent, children }
}

/// Compute the dominance frontier of every node.
///
/// `DF[d] = { s | ∃ n: d dominates n, s ∈ successors(n), and d does not
/// dominate s or d == s }`.
#[must_use]
pub fn dom_frontier(cfg: &Cfg, dom: &Dominators) -> Vec<BTreeSet<NodeId>> {
    // Invert the dominator sets once so the frontier scan walks each
    // dominated region directly.
    let mut dominated = vec![BTreeSet::new(); cfg.len()];
    for node in cfg.nodes() {
        for &d in dom.dom(node.id) {
            dominated[d.0].insert(node.id);
        }
    }

    let mut frontier = vec![BTreeSet::new(); cfg.len()];
    for i in 0..cfg.len() {
        let d = NodeId(i);
        for &inner in &dominated[i] {
            for &succ in &cfg.node(inner).succs {
                if !dom.dominates(d, succ) || d == succ {
                    frontier[i].insert(succ);
                }
            }
        }
    }

    frontier
}

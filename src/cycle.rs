//! Parent-cycle detection and recovery.
//!
//! A parent cycle is invisible to the traversal pass: nothing under the root leads into it, so
//! its rows simply go missing. The guard notices by comparing the leaves the root reaches with
//! the live row count, then finds the cycles among the unreachable rows with Tarjan's strongly
//! connected components over their parent links.
//!
//! Each member of a cycle gets a *break*: "while your parent resolves to this stale parent,
//! attach to the root instead". Breaks persist between runs so an unchanged input stays stable,
//! and they are dropped as soon as the input no longer leads back into the cycle.

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};
use std::collections::{HashMap, HashSet};

use crate::{
    diagnostic::{CycleMember, SyncDiagnostic},
    node::NodeId,
    strategy::AddressingStrategy,
    sync::RunContext,
    tree::Tree,
};

#[derive(Debug, Clone, Default)]
pub struct CycleGuard {
    breaks: HashMap<NodeId, NodeId>,
}

impl CycleGuard {
    pub fn new() -> CycleGuard {
        CycleGuard::default()
    }

    /// Rows currently re-rooted because of a cycle.
    pub fn broken(&self) -> impl Iterator<Item = &NodeId> {
        self.breaks.keys()
    }

    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    /// Parent to attach `node` to, given the parent its strategy resolved.
    pub(crate) fn redirect(&self, node: NodeId, resolved: NodeId, root: NodeId) -> NodeId {
        match self.breaks.get(&node) {
            Some(stale) if *stale == resolved => root,
            _ => resolved,
        }
    }

    pub(crate) fn forget(&mut self, node: NodeId) {
        self.breaks.remove(&node);
    }

    /// Drops breaks whose cycle the current input no longer forms.
    pub(crate) fn revalidate<R, S>(&mut self, tree: &Tree<R>, strategy: &S)
    where
        S: AddressingStrategy<R> + ?Sized,
    {
        self.breaks.retain(|node, stale| {
            let keep = tree.is_live_row(*node)
                && tree.is_live_row(*stale)
                && strategy.peek_parent(tree, *node) == Some(*stale)
                && leads_back(tree, strategy, *stale, *node);
            if !keep {
                tracing::debug!("[CycleGuard] releasing cycle break of {node}");
            }
            keep
        });
    }

    pub(crate) fn needs_recovery<R>(&self, tree: &Tree<R>) -> bool {
        tree[tree.root].leaf_descendants.len() != tree.live_leaf_count()
    }

    /// Breaks every cycle among the unreachable rows, reporting one diagnostic per cycle.
    /// Returns the number of rows re-rooted.
    pub(crate) fn recover<R>(&mut self, tree: &Tree<R>, run: &mut RunContext) -> usize {
        let mut reachable = HashSet::new();
        tree.for_each_node(|id, _| {
            reachable.insert(id);
        });
        let unreachable: HashSet<NodeId> = tree
            .leaf_order
            .iter()
            .copied()
            .filter(|id| !tree[*id].excluded && !reachable.contains(id))
            .collect();

        let mut graph = DiGraphMap::<NodeId, ()>::new();
        for &id in &unreachable {
            graph.add_node(id);
            if let Some(parent) = tree[id].parent.filter(|p| unreachable.contains(p)) {
                graph.add_edge(id, parent, ());
            }
        }

        let mut rerooted = 0;
        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .map(|id| graph.contains_edge(*id, *id))
                    .unwrap_or(false);
            if cyclic {
                rerooted += self.break_members(tree, component, run);
            }
        }

        if rerooted == 0 && !unreachable.is_empty() {
            // Not a cycle, but still cut off from the root; re-root each row on its own.
            let mut stranded: Vec<NodeId> = unreachable.into_iter().collect();
            stranded.sort_by_key(|id| tree[*id].ordinal);
            for id in stranded {
                rerooted += self.break_members(tree, vec![id], run);
            }
        }
        rerooted
    }

    fn break_members<R>(
        &mut self,
        tree: &Tree<R>,
        mut members: Vec<NodeId>,
        run: &mut RunContext,
    ) -> usize {
        members.sort_by_key(|id| tree[*id].ordinal);
        let mut reported = Vec::with_capacity(members.len());
        for &member in &members {
            let Some(stale) = tree[member].parent else {
                continue;
            };
            self.breaks.insert(member, stale);
            reported.push(CycleMember {
                row: tree[member].id.clone(),
                stale_parent: tree[stale].id.clone(),
            });
        }
        let count = reported.len();
        if count > 0 {
            run.report(SyncDiagnostic::Cycle { members: reported });
        }
        count
    }
}

/// True when following raw parent resolution up from `from` arrives at `target`.
fn leads_back<R, S>(tree: &Tree<R>, strategy: &S, from: NodeId, target: NodeId) -> bool
where
    S: AddressingStrategy<R> + ?Sized,
{
    let mut seen = HashSet::new();
    let mut current = Some(from);
    while let Some(id) = current {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        current = strategy.peek_parent(tree, id);
    }
    false
}

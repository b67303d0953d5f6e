//! Two-pass incremental synchronization.
//!
//! A run happens in three steps:
//!
//! 1. **Attach** ([attach]): every live row, in leaf order, is placed into the children array of
//!    the parent its [AddressingStrategy] resolves. Filler ancestors are attached as the walk up
//!    reaches them. A parent's children array is only written where a slot actually differs, and
//!    every node whose membership or order changed is flagged.
//! 2. **Propagate**: the ancestors of every touched node are flagged
//!    [NodeFlag::SubtreeChanged](crate::node::NodeFlag::SubtreeChanged), so the next pass can
//!    skip every clean subtree.
//! 3. **Traverse** ([traverse]): a depth-first walk that only descends into flagged subtrees (or
//!    subtrees whose level shifted). It truncates stale children, recomputes levels, groups and
//!    expansion, and rebuilds `leaf_descendants` bottom-up.
//!
//! Finally the [CycleGuard] compares the number of leaves the root can reach with the number of
//! live rows. When they differ, the rows stuck in parent cycles are re-rooted and the passes run
//! one more time.

use serde::{Deserialize, Serialize};

use crate::{
    changes::ChangedPath,
    cycle::CycleGuard,
    diagnostic::SyncDiagnostic,
    node::NodeId,
    selection::SelectionChange,
    strategy::AddressingStrategy,
    tree::Tree,
};

pub mod attach;
pub mod traverse;

pub use traverse::ExpansionPolicy;

/// Scratch state of one synchronization run, shared with the addressing strategy.
#[derive(Debug, Default)]
pub struct RunContext {
    pub(crate) full: bool,
    /// Rows added or updated by this run.
    pub(crate) changed: Vec<NodeId>,
    /// Nodes whose ancestors must be flagged during propagation.
    pub(crate) touched: Vec<NodeId>,
    /// Selected nodes found under a collapsed group during traversal.
    pub(crate) newly_hidden: Vec<NodeId>,
    pub(crate) diagnostics: Vec<SyncDiagnostic>,
    pub(crate) visited: usize,
}

impl RunContext {
    pub(crate) fn new(full: bool) -> RunContext {
        RunContext {
            full,
            ..Default::default()
        }
    }

    /// True when the whole row set was replaced.
    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn changed(&self) -> &[NodeId] {
        &self.changed
    }

    pub fn report(&mut self, diagnostic: SyncDiagnostic) {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn touch(&mut self, node: NodeId) {
        self.touched.push(node);
    }
}

/// Outcome of one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub changed_path: ChangedPath,
    pub diagnostics: Vec<SyncDiagnostic>,
    pub selection: Option<SelectionChange>,
    /// Extra passes run after re-rooting parent cycles. Never more than one.
    pub guard_reruns: usize,
    /// Nodes entered by the traversal pass, reruns included.
    pub visited: usize,
}

impl SyncReport {
    /// True when the run left the structure exactly as it found it.
    pub fn is_unchanged(&self) -> bool {
        self.changed_path.is_empty()
    }
}

/// Clears the flags of the previous run. Call before anything of the new run touches the tree.
pub(crate) fn begin<R>(tree: &mut Tree<R>) {
    attach::reset_scratch(tree, true);
}

/// Runs both passes, plus one rerun if the cycle guard had to re-root anything.
pub(crate) fn run<R, S>(
    tree: &mut Tree<R>,
    strategy: &mut S,
    guard: &mut CycleGuard,
    policy: &ExpansionPolicy<R>,
    run: &mut RunContext,
) -> usize
where
    S: AddressingStrategy<R> + ?Sized,
{
    guard.revalidate(tree, &*strategy);
    strategy.prepare(tree, run);
    passes(tree, strategy, guard, policy, run);

    if !guard.needs_recovery(tree) {
        return 0;
    }
    guard.recover(tree, run);
    attach::reset_scratch(tree, false);
    passes(tree, strategy, guard, policy, run);
    if guard.needs_recovery(tree) {
        let live = tree.live_leaf_count();
        let reached = tree[tree.root].leaf_descendants.len();
        tracing::error!(
            "[sync::run] {} of {live} rows still unreachable after re-rooting cycles",
            live.saturating_sub(reached)
        );
    }
    1
}

/// Detaches every row and leaves the root empty, for configurations that cannot build a tree.
pub(crate) fn withhold<R>(tree: &mut Tree<R>, policy: &ExpansionPolicy<R>, run: &mut RunContext) {
    for position in 0..tree.leaf_order.len() {
        let leaf = tree.leaf_order[position];
        attach::detach(tree, leaf, run);
    }
    attach::propagate(tree, run);
    traverse::traverse(tree, policy, run);
}

fn passes<R, S>(
    tree: &mut Tree<R>,
    strategy: &mut S,
    guard: &CycleGuard,
    policy: &ExpansionPolicy<R>,
    run: &mut RunContext,
) where
    S: AddressingStrategy<R> + ?Sized,
{
    attach::attach_pass(tree, strategy, guard, run);
    strategy.finish_attach(tree, run);
    attach::propagate(tree, run);
    traverse::traverse(tree, policy, run);
}

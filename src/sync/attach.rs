//! Pass 1: place every live row under its resolved parent.

use crate::{
    cycle::CycleGuard,
    node::{NodeFlag, NodeId},
    strategy::AddressingStrategy,
    sync::RunContext,
    tree::Tree,
};

/// Resets per-pass scratch state. With `clear_changes` unset (the cycle-guard rerun) the change
/// flags of the first attempt are kept so the rerun still reports them.
pub(crate) fn reset_scratch<R>(tree: &mut Tree<R>, clear_changes: bool) {
    for (_, node) in tree.arena.iter_mut() {
        node.pending_children = 0;
        if clear_changes {
            node.flags -= NodeFlag::scratch();
        } else {
            node.flags.remove(NodeFlag::Committed);
        }
    }
}

pub(crate) fn attach_pass<R, S>(
    tree: &mut Tree<R>,
    strategy: &mut S,
    guard: &CycleGuard,
    run: &mut RunContext,
) where
    S: AddressingStrategy<R> + ?Sized,
{
    let root = tree.root;
    tree[root].flags.insert(NodeFlag::Committed);

    for position in 0..tree.leaf_order.len() {
        let leaf = tree.leaf_order[position];
        if tree[leaf].excluded {
            detach(tree, leaf, run);
            continue;
        }
        let resolved = strategy.resolve_parent(tree, leaf, run);
        let parent = guard.redirect(leaf, resolved, root);
        attach(tree, leaf, parent, run);

        // Fillers have no place in leaf order; they are placed the first time a row reaches them.
        let mut current = parent;
        while tree[current].is_filler() && !tree[current].flags.contains(NodeFlag::Committed) {
            let grandparent = strategy.resolve_parent(tree, current, run);
            attach(tree, current, grandparent, run);
            current = grandparent;
        }
    }
}

/// Appends `child` to the pending children of `parent`.
pub(crate) fn attach<R>(tree: &mut Tree<R>, child: NodeId, parent: NodeId, run: &mut RunContext) {
    let previous = {
        let node = &mut tree[child];
        node.flags.insert(NodeFlag::Committed);
        node.parent
    };
    if previous != Some(parent) {
        tracing::trace!("{child} moves from {previous:?} to {parent}");
        let node = &mut tree[child];
        node.parent = Some(parent);
        node.flags.insert(NodeFlag::Moved);
        run.touch(child);
        if let Some(previous) = previous {
            mark_children_changed(tree, previous, run);
        }
        mark_children_changed(tree, parent, run);
    }

    let parent_node = &mut tree[parent];
    let slot = parent_node.pending_children;
    parent_node.pending_children += 1;
    if parent_node.children.get(slot) == Some(&child) {
        return;
    }
    if slot < parent_node.children.len() {
        parent_node.children[slot] = child;
    } else {
        parent_node.children.push(child);
    }
    mark_children_changed(tree, parent, run);
}

/// Takes a row out of the tree without placing it anywhere else.
pub(crate) fn detach<R>(tree: &mut Tree<R>, node: NodeId, run: &mut RunContext) {
    let Some(parent) = tree[node].parent.take() else {
        return;
    };
    tree[node].flags.insert(NodeFlag::Moved);
    mark_children_changed(tree, parent, run);
}

pub(crate) fn mark_children_changed<R>(tree: &mut Tree<R>, id: NodeId, run: &mut RunContext) {
    if let Some(node) = tree.arena.get_mut(id) {
        if node.flags.insert(NodeFlag::ChildrenChanged) {
            run.touch(id);
        }
    }
}

/// Flags the ancestors of every touched node (and of every renamed changed row) as
/// [NodeFlag::SubtreeChanged]. Walks stop at the first ancestor already flagged, which also
/// keeps them finite inside a cycle.
pub(crate) fn propagate<R>(tree: &mut Tree<R>, run: &mut RunContext) {
    let mut seeds = std::mem::take(&mut run.touched);
    seeds.extend(run.changed.iter().copied().filter(|id| {
        tree.arena
            .get(*id)
            .map(|node| node.flags.contains(NodeFlag::KeyChanged))
            .unwrap_or(false)
    }));

    for seed in seeds {
        let mut current = tree.arena.get(seed).and_then(|node| node.parent);
        while let Some(id) = current {
            let Some(node) = tree.arena.get_mut(id) else {
                break;
            };
            if !node.flags.insert(NodeFlag::SubtreeChanged) {
                break;
            }
            current = node.parent;
        }
    }
}

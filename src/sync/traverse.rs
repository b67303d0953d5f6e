//! Pass 2: depth-first walk over the changed part of the tree.

use std::fmt;

use crate::{
    node::{NodeFlag, NodeId, SelectionState, TreeNode},
    sync::RunContext,
    tree::Tree,
};

/// Decides the initial `expanded` state of a node the first time it needs one.
pub enum ExpansionPolicy<R> {
    /// `-1` expands everything, otherwise groups whose level is below the depth start expanded.
    DefaultDepth(i32),
    /// Caller-supplied predicate over the node and its level.
    Predicate(Box<dyn Fn(&TreeNode<R>, i32) -> bool>),
}

impl<R> ExpansionPolicy<R> {
    pub fn predicate<F>(predicate: F) -> ExpansionPolicy<R>
    where
        F: Fn(&TreeNode<R>, i32) -> bool + 'static,
    {
        ExpansionPolicy::Predicate(Box::new(predicate))
    }

    pub fn is_expanded(&self, node: &TreeNode<R>, level: i32) -> bool {
        match self {
            ExpansionPolicy::DefaultDepth(depth) => *depth == -1 || level < *depth,
            ExpansionPolicy::Predicate(predicate) => predicate(node, level),
        }
    }
}

impl<R> Default for ExpansionPolicy<R> {
    fn default() -> Self {
        ExpansionPolicy::DefaultDepth(0)
    }
}

impl<R> fmt::Debug for ExpansionPolicy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionPolicy::DefaultDepth(depth) => {
                f.debug_tuple("DefaultDepth").field(depth).finish()
            }
            ExpansionPolicy::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

enum Frame {
    Enter {
        node: NodeId,
        force: bool,
        hidden: bool,
    },
    Exit(NodeId),
}

pub(crate) fn traverse<R>(tree: &mut Tree<R>, policy: &ExpansionPolicy<R>, run: &mut RunContext) {
    let dirty = NodeFlag::structural() | NodeFlag::KeyChanged | NodeFlag::ExpansionNeedsInit;
    let limit = tree.arena.len();
    let mut entered = 0;
    let mut stack = vec![Frame::Enter {
        node: tree.root,
        force: false,
        hidden: false,
    }];

    while let Some(frame) = stack.pop() {
        let (node, force, hidden) = match frame {
            Frame::Exit(node) => {
                rebuild_leaf_descendants(tree, node);
                continue;
            }
            Frame::Enter {
                node,
                force,
                hidden,
            } => (node, force, hidden),
        };
        entered += 1;
        if entered > limit {
            tracing::error!("[traverse] entered more nodes than exist, aborting the walk");
            break;
        }
        enter(tree, node, hidden, policy, run);
        stack.push(Frame::Exit(node));

        let (level, child_hidden, count) = {
            let parent = &tree[node];
            let collapsed = !parent.is_root() && !parent.expanded;
            (parent.level, hidden || collapsed, parent.children.len())
        };
        for slot in (0..count).rev() {
            let child = tree[node].children[slot];
            let child_node = &mut tree[child];
            let level_changed = child_node.level != level + 1;
            child_node.level = level + 1;
            if force || level_changed || !child_node.flags.is_disjoint(dirty) {
                stack.push(Frame::Enter {
                    node: child,
                    force: force || level_changed,
                    hidden: child_hidden,
                });
            }
        }
    }
    run.visited += entered;
}

fn enter<R>(
    tree: &mut Tree<R>,
    node: NodeId,
    hidden: bool,
    policy: &ExpansionPolicy<R>,
    run: &mut RunContext,
) {
    let n = &mut tree[node];
    let count = n.pending_children;
    n.children.truncate(count);
    let is_group = !n.children.is_empty();
    if n.is_root() {
        n.is_group = is_group;
        return;
    }

    if is_group != n.is_group {
        n.is_group = is_group;
        if !n.flags.contains(NodeFlag::ExpansionRestored) {
            n.flags.insert(NodeFlag::ExpansionNeedsInit);
        }
    }
    if hidden {
        n.display_index = None;
        if n.selected != SelectionState::Deselected {
            run.newly_hidden.push(node);
        }
    }

    if n.flags.contains(NodeFlag::ExpansionNeedsInit) {
        let expanded = policy.is_expanded(&tree[node], tree[node].level);
        let n = &mut tree[node];
        n.expanded = expanded;
        n.flags.remove(NodeFlag::ExpansionNeedsInit);
    }
}

/// Rebuilds `leaf_descendants` in place from the (already rebuilt) children.
fn rebuild_leaf_descendants<R>(tree: &mut Tree<R>, node: NodeId) {
    let mut leaves = std::mem::take(&mut tree[node].leaf_descendants);
    leaves.clear();
    for &child_id in tree[node].children.iter() {
        let child = &tree[child_id];
        if child.is_row() {
            leaves.push(child_id);
        }
        leaves.extend_from_slice(&child.leaf_descendants);
    }
    tree[node].leaf_descendants = leaves;
}

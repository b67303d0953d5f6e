//! The forest owned by one synchronization engine.

use std::{
    collections::{HashMap, HashSet},
    ops::{Index, IndexMut},
};

use crate::{
    arena::NodeArena,
    node::{NodeFlag, NodeId, RowId, TreeNode},
};

/// Arena, row index and leaf order of a single tree.
///
/// Collaborators (renderers, selection widgets) read a `&Tree` between runs; the engine is the
/// only writer.
#[derive(Debug, Clone)]
pub struct Tree<R> {
    pub(crate) arena: NodeArena<R>,
    pub(crate) root: NodeId,
    pub(crate) rows: HashMap<RowId, NodeId>,
    pub(crate) leaf_order: Vec<NodeId>,
    pub(crate) pending_deletion: Vec<NodeId>,
    scheduled: HashSet<NodeId>,
}

impl<R> Default for Tree<R> {
    fn default() -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(TreeNode::root());
        Tree {
            arena,
            root,
            rows: HashMap::new(),
            leaf_order: Vec::new(),
            pending_deletion: Vec::new(),
            scheduled: HashSet::new(),
        }
    }
}

impl<R> Tree<R> {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode<R>> {
        self.arena.get(id)
    }

    pub fn row_node(&self, id: &RowId) -> Option<NodeId> {
        self.rows.get(id).copied()
    }

    /// Record-backed nodes in leaf order, excluded duplicates included.
    pub fn leaf_order(&self) -> &[NodeId] {
        &self.leaf_order
    }

    pub fn row_count(&self) -> usize {
        self.leaf_order.len()
    }

    /// Records that should appear in the tree: all rows minus excluded duplicates.
    pub fn live_leaf_count(&self) -> usize {
        self.leaf_order
            .iter()
            .filter(|id| !self.arena[**id].excluded)
            .count()
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn arena(&self) -> &NodeArena<R> {
        &self.arena
    }

    /// True while `id` names a record known to the row index.
    pub(crate) fn is_live_row(&self, id: NodeId) -> bool {
        self.arena
            .get(id)
            .map(|node| node.is_row() && self.rows.get(&node.id) == Some(&id))
            .unwrap_or(false)
    }

    /// Ancestors from the direct parent up to and including the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.arena.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            if ancestors.contains(&parent) {
                break;
            }
            ancestors.push(parent);
            current = self.arena.get(parent).and_then(|node| node.parent);
        }
        ancestors
    }

    /// Depth-first pre-order walk over the reachable tree, root included.
    pub fn for_each_node<F: FnMut(NodeId, &TreeNode<R>)>(&self, mut f: F) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            f(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Updates the display key, flagging the node when it actually changed.
    pub(crate) fn set_key(&mut self, id: NodeId, key: &str) {
        let node = &mut self.arena[id];
        if node.key != key {
            node.key = key.to_string();
            node.flags.insert(NodeFlag::KeyChanged);
        }
    }

    /// Queues a node for destruction once the selection cascade has seen it.
    pub(crate) fn schedule_deletion(&mut self, id: NodeId) {
        if self.arena.contains(id) && self.scheduled.insert(id) {
            self.pending_deletion.push(id);
        }
    }

    /// Empties the deletion queue, in scheduling order.
    pub(crate) fn take_pending_deletion(&mut self) -> Vec<NodeId> {
        self.scheduled.clear();
        std::mem::take(&mut self.pending_deletion)
    }
}

impl<R> Index<NodeId> for Tree<R> {
    type Output = TreeNode<R>;

    fn index(&self, id: NodeId) -> &TreeNode<R> {
        &self.arena[id]
    }
}

impl<R> IndexMut<NodeId> for Tree<R> {
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode<R> {
        &mut self.arena[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_deletion_queue_keeps_each_node_once() {
        let mut tree = Tree::<u32>::default();
        let a = tree.arena.insert(TreeNode::row(RowId::from("a"), 1, 0));
        let b = tree.arena.insert(TreeNode::row(RowId::from("b"), 2, 1));
        tree.schedule_deletion(a);
        tree.schedule_deletion(b);
        tree.schedule_deletion(a);
        assert_eq!(tree.take_pending_deletion(), vec![a, b]);

        // A drained node can be queued again.
        tree.schedule_deletion(a);
        assert_eq!(tree.take_pending_deletion(), vec![a]);
        assert!(tree.take_pending_deletion().is_empty());
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    node::{NodeFlag, NodeId, RowId},
    tree::Tree,
};

/// The reachable nodes whose children or subtree changed in a run, root first (pre-order).
///
/// Consumers re-render exactly these nodes. An empty path means the run changed nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedPath {
    nodes: Vec<NodeId>,
}

impl ChangedPath {
    pub(crate) fn collect<R>(tree: &Tree<R>) -> ChangedPath {
        let marks = NodeFlag::ChildrenChanged | NodeFlag::SubtreeChanged;
        let mut nodes = Vec::new();
        let mut stack = vec![tree.root];
        while let Some(id) = stack.pop() {
            let Some(node) = tree.node(id) else {
                continue;
            };
            if node.flags.is_disjoint(marks) {
                continue;
            }
            nodes.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        ChangedPath { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Identities of the changed nodes; the root reports as [RowId::root].
    pub fn row_ids<R>(&self, tree: &Tree<R>) -> Vec<RowId> {
        self.nodes
            .iter()
            .filter_map(|id| tree.node(*id).map(|node| node.id.clone()))
            .collect()
    }
}

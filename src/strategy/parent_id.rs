//! Parent-id addressing: each record names the identity of its parent record.
//!
//! References to identities that are not loaded resolve to the root and are reported once per
//! distinct reference. Parent cycles are possible here and are left to the
//! [CycleGuard](crate::cycle::CycleGuard).

use std::collections::HashMap;

use crate::{
    config::AddressingMode,
    diagnostic::SyncDiagnostic,
    node::{NodeId, RowId},
    strategy::{AddressingStrategy, ParentIdFn},
    sync::RunContext,
    tree::Tree,
};

pub struct ParentIdStrategy<R> {
    parent_id: ParentIdFn<R>,
    unresolved: HashMap<NodeId, RowId>,
}

impl<R> ParentIdStrategy<R> {
    pub fn new(parent_id: ParentIdFn<R>) -> ParentIdStrategy<R> {
        ParentIdStrategy {
            parent_id,
            unresolved: HashMap::new(),
        }
    }

    /// Rows currently placed under the root because their parent reference is unknown.
    pub fn unresolved(&self) -> impl Iterator<Item = (&NodeId, &RowId)> {
        self.unresolved.iter()
    }

    fn reference(&self, tree: &Tree<R>, node: NodeId) -> Option<RowId> {
        tree.node(node)
            .and_then(|node| node.data.as_ref())
            .and_then(|data| (self.parent_id)(data))
    }
}

impl<R> AddressingStrategy<R> for ParentIdStrategy<R> {
    fn mode(&self) -> AddressingMode {
        AddressingMode::ParentId
    }

    fn prepare(&mut self, tree: &mut Tree<R>, run: &mut RunContext) {
        let work = if run.full {
            tree.leaf_order.clone()
        } else {
            run.changed.clone()
        };
        for node in work {
            let id = tree[node].id.clone();
            tree.set_key(node, id.as_str());
        }
        self.unresolved.retain(|node, _| tree.is_live_row(*node));
    }

    fn resolve_parent(
        &mut self,
        tree: &mut Tree<R>,
        node: NodeId,
        run: &mut RunContext,
    ) -> NodeId {
        let Some(reference) = self.reference(tree, node) else {
            self.unresolved.remove(&node);
            return tree.root;
        };
        if let Some(parent) = tree.row_node(&reference) {
            self.unresolved.remove(&node);
            return parent;
        }
        if self.unresolved.get(&node) != Some(&reference) {
            run.report(SyncDiagnostic::UnresolvedParent {
                row: tree[node].id.clone(),
                reference: reference.to_string(),
            });
            self.unresolved.insert(node, reference);
        }
        tree.root
    }

    fn peek_parent(&self, tree: &Tree<R>, node: NodeId) -> Option<NodeId> {
        self.reference(tree, node)
            .and_then(|reference| tree.row_node(&reference))
    }

    fn forget(&mut self, _tree: &Tree<R>, node: NodeId) {
        self.unresolved.remove(&node);
    }

    fn check_invariants(&self, tree: &Tree<R>) -> Vec<String> {
        self.unresolved
            .iter()
            .filter(|(node, _)| tree.node(**node).and_then(|n| n.parent) != Some(tree.root))
            .map(|(node, reference)| {
                format!(
                    "[ParentIdStrategy] {node} references unknown '{reference}' but is not a root child"
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TreeNode;
    use test_log::test;

    type Record = (&'static str, Option<&'static str>);

    fn add(tree: &mut Tree<Record>, record: Record) -> NodeId {
        let ordinal = tree.leaf_order.len();
        let node = tree
            .arena
            .insert(TreeNode::row(RowId::from(record.0), record, ordinal));
        tree.rows.insert(RowId::from(record.0), node);
        tree.leaf_order.push(node);
        node
    }

    #[test]
    fn test_unknown_parent_is_reported_once() {
        let mut tree = Tree::default();
        let mut strategy =
            ParentIdStrategy::new(Box::new(|r: &Record| r.1.map(RowId::from)));
        let orphan = add(&mut tree, ("a", Some("missing")));

        let mut run = RunContext::new(true);
        strategy.prepare(&mut tree, &mut run);
        assert_eq!(strategy.resolve_parent(&mut tree, orphan, &mut run), tree.root);
        assert_eq!(strategy.resolve_parent(&mut tree, orphan, &mut run), tree.root);
        assert_eq!(run.diagnostics.len(), 1);
        assert_eq!(tree[orphan].key(), "a");
        assert_eq!(strategy.peek_parent(&tree, orphan), None);
    }

    #[test]
    fn test_known_parent_resolves() {
        let mut tree = Tree::default();
        let mut strategy =
            ParentIdStrategy::new(Box::new(|r: &Record| r.1.map(RowId::from)));
        let parent = add(&mut tree, ("p", None));
        let child = add(&mut tree, ("c", Some("p")));

        let mut run = RunContext::new(true);
        assert_eq!(strategy.resolve_parent(&mut tree, parent, &mut run), tree.root);
        assert_eq!(strategy.resolve_parent(&mut tree, child, &mut run), parent);
        assert_eq!(strategy.peek_parent(&tree, child), Some(parent));
        assert!(run.diagnostics.is_empty());
    }
}

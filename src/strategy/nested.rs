//! Nested-children addressing: the hierarchy is the containment of the input records.
//!
//! Records are flattened into rows at ingestion time; each row remembers the row it was nested
//! in. Removing a container removes everything nested inside it.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    config::AddressingMode,
    node::NodeId,
    strategy::{AddressingStrategy, ChildrenFn},
    sync::RunContext,
    tree::Tree,
};

pub struct NestedChildrenStrategy<R> {
    children: ChildrenFn<R>,
    containers: HashMap<NodeId, NodeId>,
    // container -> rows nested directly inside it
    contents: HashMap<NodeId, BTreeSet<NodeId>>,
}

impl<R> NestedChildrenStrategy<R> {
    pub fn new(children: ChildrenFn<R>) -> NestedChildrenStrategy<R> {
        NestedChildrenStrategy {
            children,
            containers: HashMap::new(),
            contents: HashMap::new(),
        }
    }

    pub fn container_of(&self, node: NodeId) -> Option<NodeId> {
        self.containers.get(&node).copied()
    }

    fn detach(&mut self, node: NodeId) {
        let Some(container) = self.containers.remove(&node) else {
            return;
        };
        if let Some(contents) = self.contents.get_mut(&container) {
            contents.remove(&node);
            if contents.is_empty() {
                self.contents.remove(&container);
            }
        }
    }
}

impl<R> AddressingStrategy<R> for NestedChildrenStrategy<R> {
    fn mode(&self) -> AddressingMode {
        AddressingMode::NestedChildren
    }

    fn nested_children(&self, record: &R) -> Option<Vec<R>> {
        Some((self.children)(record))
    }

    fn record_container(&mut self, node: NodeId, container: Option<NodeId>) {
        if self.containers.get(&node).copied() == container {
            return;
        }
        self.detach(node);
        if let Some(container) = container {
            self.containers.insert(node, container);
            self.contents.entry(container).or_default().insert(node);
        }
    }

    fn dependents(&self, tree: &Tree<R>, node: NodeId) -> Vec<NodeId> {
        let mut dependents = Vec::new();
        let mut seen = HashSet::new();
        let mut frontier = vec![node];
        while let Some(current) = frontier.pop() {
            let Some(contents) = self.contents.get(&current) else {
                continue;
            };
            for child in contents.iter() {
                if tree.arena.contains(*child) && seen.insert(*child) {
                    dependents.push(*child);
                    frontier.push(*child);
                }
            }
        }
        dependents
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
    }

    fn resolve_parent(
        &mut self,
        tree: &mut Tree<R>,
        node: NodeId,
        _run: &mut RunContext,
    ) -> NodeId {
        self.peek_parent(tree, node).unwrap_or(tree.root)
    }

    fn peek_parent(&self, tree: &Tree<R>, node: NodeId) -> Option<NodeId> {
        self.containers
            .get(&node)
            .copied()
            .filter(|container| tree.is_live_row(*container))
    }

    fn forget(&mut self, _tree: &Tree<R>, node: NodeId) {
        self.detach(node);
    }

    fn check_invariants(&self, tree: &Tree<R>) -> Vec<String> {
        let mut errors: Vec<String> = self
            .containers
            .iter()
            .filter(|(node, _)| tree.is_live_row(**node))
            .filter(|(node, container)| tree[**node].parent != Some(**container))
            .map(|(node, container)| {
                format!("[NestedChildrenStrategy] {node} is not attached to its container {container}")
            })
            .collect();
        let indexed: usize = self.contents.values().map(BTreeSet::len).sum();
        if indexed != self.containers.len() {
            errors.push(format!(
                "[NestedChildrenStrategy] {} contained rows but {indexed} indexed by container",
                self.containers.len()
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{RowId, TreeNode};
    use test_log::test;

    fn add(tree: &mut Tree<&'static str>, id: &'static str) -> NodeId {
        let ordinal = tree.leaf_order.len();
        let node = tree.arena.insert(TreeNode::row(RowId::from(id), id, ordinal));
        tree.rows.insert(RowId::from(id), node);
        tree.leaf_order.push(node);
        node
    }

    #[test]
    fn test_dependents_follow_recorded_containers() {
        let mut tree = Tree::default();
        let mut strategy = NestedChildrenStrategy::new(Box::new(|_: &&'static str| Vec::new()));
        let a = add(&mut tree, "a");
        let b = add(&mut tree, "b");
        let c = add(&mut tree, "c");
        let d = add(&mut tree, "d");
        strategy.record_container(b, Some(a));
        strategy.record_container(c, Some(b));
        strategy.record_container(d, Some(a));

        let mut dependents = strategy.dependents(&tree, a);
        dependents.sort();
        let mut expected = vec![b, c, d];
        expected.sort();
        assert_eq!(dependents, expected);

        // Moving d out of a drops it from a's contents.
        strategy.record_container(d, Some(c));
        assert_eq!(strategy.dependents(&tree, b), vec![c, d]);
        strategy.record_container(d, None);
        assert_eq!(strategy.dependents(&tree, b), vec![c]);

        strategy.forget(&tree, c);
        assert!(strategy.dependents(&tree, b).is_empty());
        assert_eq!(strategy.container_of(c), None);
        assert_eq!(strategy.contents.values().map(BTreeSet::len).sum::<usize>(), 1);
    }
}

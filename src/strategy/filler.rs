//! Filler Node Registry: synthetic groups for path prefixes that no record occupies.
//!
//! Fillers are keyed by their path. A filler lives exactly as long as something resolves below
//! it; once a pass ends with no children attached to it, it is evicted. Evicted fillers leave
//! their `expanded` state behind, so a filler that reappears at the same path (for example
//! after a full reload) opens the way the previous one was left.

use std::collections::HashMap;

use crate::{
    node::{NodeFlag, NodeId, TreeNode},
    tree::Tree,
};

#[derive(Debug, Clone, Default)]
pub struct FillerRegistry {
    live: HashMap<NodeId, Vec<String>>,
    expanded_memory: HashMap<Vec<String>, (bool, u64)>,
    epoch: u64,
}

impl FillerRegistry {
    pub fn new() -> FillerRegistry {
        FillerRegistry::default()
    }

    /// Creates a filler for `path`, restoring the expansion state of a previous filler there.
    pub fn create<R>(&mut self, tree: &mut Tree<R>, path: &[String]) -> NodeId {
        let mut node = TreeNode::filler(path);
        if let Some((expanded, _)) = self.expanded_memory.remove(path) {
            node.expanded = expanded;
            node.flags.remove(NodeFlag::ExpansionNeedsInit);
            node.flags.insert(NodeFlag::ExpansionRestored);
        }
        let id = tree.arena.insert(node);
        tracing::debug!("created filler {id} for path {path:?}");
        self.live.insert(id, path.to_vec());
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn path(&self, id: NodeId) -> Option<&[String]> {
        self.live.get(&id).map(|path| path.as_slice())
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Vec<String>)> {
        self.live.iter()
    }

    /// Fillers that ended the attach pass without a single child.
    pub fn empty_fillers<R>(&self, tree: &Tree<R>) -> Vec<NodeId> {
        self.live
            .keys()
            .filter(|id| {
                tree.arena
                    .get(**id)
                    .map(|node| node.pending_children == 0)
                    .unwrap_or(true)
            })
            .copied()
            .collect()
    }

    /// Unregisters a filler, returning its path.
    pub fn release(&mut self, id: NodeId) -> Option<Vec<String>> {
        self.live.remove(&id)
    }

    /// Remembers the expansion state of whatever last occupied `path`.
    pub fn remember(&mut self, path: Vec<String>, expanded: bool) {
        self.expanded_memory.insert(path, (expanded, self.epoch));
    }

    pub fn remembered(&self, path: &[String]) -> Option<bool> {
        self.expanded_memory.get(path).map(|(expanded, _)| *expanded)
    }

    /// Drops memories that predate the current full reload; call at its end.
    pub fn prune_memory(&mut self) {
        let epoch = self.epoch;
        self.expanded_memory.retain(|_, (_, seen)| *seen == epoch);
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filler_restores_remembered_expansion() {
        let mut tree = Tree::<u32>::default();
        let mut registry = FillerRegistry::new();
        registry.remember(path(&["East", "NY"]), true);

        let id = registry.create(&mut tree, &path(&["East", "NY"]));
        let node = tree.node(id).unwrap();
        assert!(node.is_filler());
        assert_eq!(node.key(), "NY");
        assert!(node.expanded());
        assert!(!node.flags().contains(NodeFlag::ExpansionNeedsInit));
        assert!(registry.remembered(&path(&["East", "NY"])).is_none());
        assert_eq!(registry.path(id), Some(&path(&["East", "NY"])[..]));
    }

    #[test]
    fn test_prune_keeps_only_current_epoch() {
        let mut registry = FillerRegistry::new();
        registry.remember(path(&["old"]), true);
        registry.prune_memory();
        assert!(registry.remembered(&path(&["old"])).is_some());
        registry.prune_memory();
        assert!(registry.remembered(&path(&["old"])).is_none());
    }
}

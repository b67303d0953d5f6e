//! Selection Coordinator: keeps selection consistent with the structure after every run.
//!
//! After a run it
//! - deselects and destroys nodes queued for deletion,
//! - deselects selected nodes that ended up under a collapsed group (when configured),
//! - recomputes the tri-state selection of groups along the change path, bottom-up,
//!
//! and reports everything it touched as a single [SelectionChange].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    changes::ChangedPath,
    config::SelectionConfig,
    node::{NodeId, RowId, SelectionState},
    tree::Tree,
};

/// One batch of selection updates, in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChange {
    pub changes: Vec<(RowId, SelectionState)>,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &RowId> {
        self.changes.iter().map(|(row, _)| row)
    }

    /// Final state of `row` within this batch, if it changed.
    pub fn state_of(&self, row: &RowId) -> Option<SelectionState> {
        self.changes
            .iter()
            .rev()
            .find(|(changed, _)| changed == row)
            .map(|(_, state)| *state)
    }

    fn push(&mut self, row: &RowId, state: SelectionState) {
        self.changes.push((row.clone(), state));
    }

    fn into_option(self) -> Option<SelectionChange> {
        (!self.is_empty()).then_some(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionCoordinator {
    config: SelectionConfig,
}

impl SelectionCoordinator {
    pub fn new(config: SelectionConfig) -> SelectionCoordinator {
        SelectionCoordinator { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Post-run cascade. Drains `tree.pending_deletion`.
    pub(crate) fn reconcile<R>(
        &self,
        tree: &mut Tree<R>,
        changed: &ChangedPath,
        newly_hidden: &[NodeId],
    ) -> Option<SelectionChange> {
        let mut change = SelectionChange::default();

        for id in tree.take_pending_deletion() {
            let Some(node) = tree.arena.get_mut(id) else {
                continue;
            };
            if node.selected != SelectionState::Deselected {
                node.selected = SelectionState::Deselected;
                change.push(&node.id, SelectionState::Deselected);
            }
            tracing::debug!("[SelectionCoordinator] destroying node {id} ({})", node.id);
            tree.arena.remove(id);
        }

        let mut dirty: Vec<NodeId> = changed.nodes().to_vec();
        if self.config.deselect_hidden {
            for &id in newly_hidden {
                if self.deselect(tree, id, &mut change) {
                    dirty.extend(tree.ancestors(id));
                }
            }
        }

        if self.config.group_selects_children {
            self.derive_groups(tree, dirty, &mut change);
        }
        change.into_option()
    }

    /// Explicit selection of one node, cascading down to its descendants and back up to its
    /// ancestors when groups select their children.
    pub(crate) fn select<R>(
        &self,
        tree: &mut Tree<R>,
        node: NodeId,
        selected: bool,
    ) -> Option<SelectionChange> {
        let target = SelectionState::from_bool(selected);
        let mut change = SelectionChange::default();
        if !self.config.group_selects_children {
            set_state(tree, node, target, &mut change);
            return change.into_option();
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            set_state(tree, id, target, &mut change);
            stack.extend(tree[id].children.iter().copied());
        }
        let ancestors = tree.ancestors(node);
        self.derive_groups(tree, ancestors, &mut change);
        change.into_option()
    }

    /// Deselects everything below the given (just collapsed) groups.
    pub(crate) fn deselect_hidden<R>(
        &self,
        tree: &mut Tree<R>,
        collapsed: &[NodeId],
    ) -> Option<SelectionChange> {
        if !self.config.deselect_hidden {
            return None;
        }
        let mut change = SelectionChange::default();
        let mut dirty = Vec::new();
        for &group in collapsed {
            let mut any = false;
            let mut stack: Vec<NodeId> = tree[group].children.clone();
            while let Some(id) = stack.pop() {
                any |= self.deselect(tree, id, &mut change);
                stack.extend(tree[id].children.iter().copied());
            }
            if any {
                dirty.push(group);
                dirty.extend(tree.ancestors(group));
            }
        }
        if self.config.group_selects_children {
            self.derive_groups(tree, dirty, &mut change);
        }
        change.into_option()
    }

    fn deselect<R>(&self, tree: &mut Tree<R>, id: NodeId, change: &mut SelectionChange) -> bool {
        set_state(tree, id, SelectionState::Deselected, change)
    }

    /// Recomputes tri-state selection of the given nodes, deepest first.
    ///
    /// A node that lost its last child keeps its own state, except that `Mixed` falls back to
    /// `Deselected`.
    fn derive_groups<R>(&self, tree: &mut Tree<R>, nodes: Vec<NodeId>, change: &mut SelectionChange) {
        let mut seen = HashSet::new();
        let mut groups: Vec<NodeId> = nodes
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter(|id| tree.node(*id).map(|node| !node.is_root()).unwrap_or(false))
            .collect();
        groups.sort_by_key(|id| std::cmp::Reverse(tree[*id].level));

        for group in groups {
            if tree[group].children.is_empty() {
                if tree[group].selected == SelectionState::Mixed {
                    set_state(tree, group, SelectionState::Deselected, change);
                }
                continue;
            }
            let mut any_selected = false;
            let mut any_deselected = false;
            for child in tree[group].children.iter() {
                match tree[*child].selected {
                    SelectionState::Selected => any_selected = true,
                    SelectionState::Deselected => any_deselected = true,
                    SelectionState::Mixed => {
                        any_selected = true;
                        any_deselected = true;
                    }
                }
            }
            let derived = match (any_selected, any_deselected) {
                (true, false) => SelectionState::Selected,
                (false, _) => SelectionState::Deselected,
                (true, true) => SelectionState::Mixed,
            };
            set_state(tree, group, derived, change);
        }
    }
}

fn set_state<R>(
    tree: &mut Tree<R>,
    id: NodeId,
    state: SelectionState,
    change: &mut SelectionChange,
) -> bool {
    let Some(node) = tree.arena.get_mut(id) else {
        return false;
    };
    if node.selected == state {
        return false;
    }
    node.selected = state;
    change.push(&node.id, state);
    true
}

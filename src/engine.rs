//! # TreeEngine
//!
//! The public facade: owns one [Tree], the active addressing strategy and everything that has to
//! survive between synchronization runs (cycle breaks, filler memory, the diagnostic log).
//!
//! ## Entry points
//!
//! - [TreeEngine::set_rows]: replace the whole record set (a full run)
//! - [TreeEngine::apply_transaction]: add, update and remove records (an incremental run)
//! - [TreeEngine::set_expanded], [TreeEngine::expand_all], [TreeEngine::collapse_all]
//! - [TreeEngine::set_selected]
//!
//! Every run returns a [SyncReport]; none of them fail. Problems in the input become
//! [SyncDiagnostic]s and the tree stays valid.
//!
//! ```rust
//! use treesync_core::{config::TreeConfig, engine::TreeEngine, node::RowId, strategy::Addressing};
//!
//! #[derive(Debug, Clone)]
//! struct Row {
//!     id: &'static str,
//!     parent: Option<&'static str>,
//! }
//!
//! let addressing = Addressing::parent_id(|r: &Row| r.parent.map(RowId::from))
//!     .with_identity(|r: &Row| Some(RowId::from(r.id)));
//! let mut engine = TreeEngine::new(addressing, TreeConfig::default());
//! let rows = vec![
//!     Row { id: "A", parent: None },
//!     Row { id: "B", parent: Some("A") },
//! ];
//! engine.set_rows(rows.clone(), false);
//!
//! let a = engine.row_node(&RowId::from("A")).unwrap();
//! assert_eq!(engine.children(a).unwrap().len(), 1);
//! assert!(engine.set_rows(rows, false).is_unchanged());
//! ```

use std::{collections::HashSet, fmt, sync::mpsc::Sender};

use crate::{
    changes::ChangedPath,
    config::{AddressingMode, TreeConfig},
    cycle::CycleGuard,
    diagnostic::SyncDiagnostic,
    error::TreeSyncError,
    event::TreeEvent,
    node::{NodeFlag, NodeId, RowId, TreeNode},
    selection::{SelectionChange, SelectionCoordinator},
    strategy::{Addressing, AddressingStrategy, IdentityFn},
    sync::{self, attach, ExpansionPolicy, RunContext, SyncReport},
    tree::Tree,
};

/// An incremental change to the record set.
///
/// Removals are applied first, then updates, then additions. Updates and removals name records
/// by identity, so updates require an identity accessor.
pub struct RowTransaction<R> {
    pub add: Vec<R>,
    /// Position in leaf order for the added records; appended when `None`.
    pub add_index: Option<usize>,
    pub update: Vec<R>,
    pub remove: Vec<RowId>,
}

impl<R> Default for RowTransaction<R> {
    fn default() -> Self {
        RowTransaction {
            add: Vec::new(),
            add_index: None,
            update: Vec::new(),
            remove: Vec::new(),
        }
    }
}

impl<R> RowTransaction<R> {
    pub fn new() -> RowTransaction<R> {
        RowTransaction::default()
    }

    pub fn adding(mut self, rows: Vec<R>) -> Self {
        self.add.extend(rows);
        self
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.add_index = Some(index);
        self
    }

    pub fn updating(mut self, rows: Vec<R>) -> Self {
        self.update.extend(rows);
        self
    }

    pub fn removing<I: IntoIterator<Item = RowId>>(mut self, rows: I) -> Self {
        self.remove.extend(rows);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }
}

struct Incoming<R> {
    id: RowId,
    data: R,
    /// Position of the containing record within the same batch.
    container: Option<usize>,
}

pub struct TreeEngine<R> {
    tree: Tree<R>,
    strategy: Box<dyn AddressingStrategy<R>>,
    identity: Option<IdentityFn<R>>,
    policy: ExpansionPolicy<R>,
    config: TreeConfig,
    guard: CycleGuard,
    selection: SelectionCoordinator,
    diagnostics: Vec<SyncDiagnostic>,
    tx: Option<Sender<TreeEvent>>,
    missing_configuration: Option<String>,
    withheld_reported: bool,
    next_auto_id: u64,
    runs: u64,
}

impl<R: fmt::Debug + 'static> TreeEngine<R> {
    pub fn new(addressing: Addressing<R>, config: TreeConfig) -> TreeEngine<R> {
        let missing_configuration = addressing.missing_configuration();
        let (identity, strategy) = addressing.into_parts();
        tracing::debug!(
            "[TreeEngine] new engine, addressing {:?}, identity accessor: {}",
            strategy.mode(),
            identity.is_some()
        );
        TreeEngine {
            tree: Tree::default(),
            strategy,
            identity,
            policy: ExpansionPolicy::DefaultDepth(config.expansion.default_expanded),
            selection: SelectionCoordinator::new(config.selection.clone()),
            config,
            guard: CycleGuard::new(),
            diagnostics: Vec::new(),
            tx: None,
            missing_configuration,
            withheld_reported: false,
            next_auto_id: 0,
            runs: 0,
        }
    }

    /// Replaces the default-depth policy built from [crate::config::ExpansionConfig].
    pub fn with_expansion_policy(mut self, policy: ExpansionPolicy<R>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_sender(mut self, tx: Sender<TreeEvent>) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Drops the event sender, closing the channel once no other sender is alive.
    pub fn close_tx(&mut self) {
        self.tx = None;
    }

    pub fn tree(&self) -> &Tree<R> {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn mode(&self) -> AddressingMode {
        self.strategy.mode()
    }

    /// True while the addressing configuration cannot build a tree and the root is kept empty.
    pub fn is_withheld(&self) -> bool {
        self.missing_configuration.is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode<R>> {
        self.tree.node(id)
    }

    pub fn row_node(&self, id: &RowId) -> Option<NodeId> {
        self.tree.row_node(id)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeSyncError> {
        Ok(self.get(id)?.children())
    }

    pub fn leaf_descendants(&self, id: NodeId) -> Result<&[NodeId], TreeSyncError> {
        Ok(self.get(id)?.leaf_descendants())
    }

    pub fn for_each_node<F: FnMut(NodeId, &TreeNode<R>)>(&self, f: F) {
        self.tree.for_each_node(f)
    }

    pub fn diagnostics(&self) -> &[SyncDiagnostic] {
        &self.diagnostics
    }

    pub fn drain_diagnostics(&mut self) -> Vec<SyncDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Rows re-rooted because they were part of a parent cycle.
    pub fn cycle_breaks(&self) -> usize {
        self.guard.len()
    }

    fn get(&self, id: NodeId) -> Result<&TreeNode<R>, TreeSyncError> {
        self.tree
            .node(id)
            .ok_or_else(|| TreeSyncError::NotFound(format!("node {id}")))
    }

    /// Replaces the whole record set.
    ///
    /// Records are matched to existing rows by identity, so unchanged records keep their nodes
    /// and UI state. Without `reorder` previously known rows keep their relative order and new
    /// rows are appended; with it the leaf order becomes the order of `rows`.
    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn set_rows(&mut self, rows: Vec<R>, reorder: bool) -> SyncReport {
        sync::begin(&mut self.tree);
        let mut run = RunContext::new(true);
        self.next_auto_id = 0;
        let incoming = self.flatten(rows, &mut run);

        let mut loaded: Vec<NodeId> = Vec::with_capacity(incoming.len());
        for entry in incoming {
            let container = entry.container.map(|position| loaded[position]);
            let node = match self.tree.row_node(&entry.id) {
                Some(existing) => {
                    self.tree[existing].data = Some(entry.data);
                    existing
                }
                None => self.create_row(entry.id, entry.data),
            };
            self.strategy.record_container(node, container);
            run.changed.push(node);
            loaded.push(node);
        }

        let kept: HashSet<NodeId> = loaded.iter().copied().collect();
        let removed: Vec<NodeId> = self
            .tree
            .leaf_order
            .iter()
            .copied()
            .filter(|id| !kept.contains(id))
            .collect();
        for node in removed {
            self.remove_row(node, &mut run);
        }
        self.prune_leaf_order();

        if reorder {
            self.tree.leaf_order = loaded;
        } else {
            let known: HashSet<NodeId> = self.tree.leaf_order.iter().copied().collect();
            self.tree
                .leaf_order
                .extend(loaded.into_iter().filter(|id| !known.contains(id)));
        }
        self.renumber();
        self.synchronize(run)
    }

    /// [TreeEngine::set_rows] with the reorder hint from [crate::config::SyncOptions].
    pub fn load_rows(&mut self, rows: Vec<R>) -> SyncReport {
        let reorder = self.config.sync.reorder_on_full_load;
        self.set_rows(rows, reorder)
    }

    #[tracing::instrument(skip(self, transaction))]
    pub fn apply_transaction(&mut self, transaction: RowTransaction<R>) -> SyncReport {
        sync::begin(&mut self.tree);
        let mut run = RunContext::new(false);
        let RowTransaction {
            add,
            add_index,
            update,
            remove,
        } = transaction;

        if !remove.is_empty() {
            for row in remove {
                match self.tree.row_node(&row) {
                    Some(node) => self.remove_row(node, &mut run),
                    None => run.report(SyncDiagnostic::UnknownRow(row)),
                }
            }
            self.prune_leaf_order();
        }

        if !update.is_empty() {
            if self.identity.is_some() {
                for record in update {
                    self.update_row(record, &mut run);
                }
            } else {
                run.report(SyncDiagnostic::MissingConfiguration(format!(
                    "{} updated records ignored, updates require an identity accessor",
                    update.len()
                )));
            }
        }

        if !add.is_empty() {
            let entries = self.flatten(add, &mut run);
            let (_, created) = self.ingest(entries, None, &HashSet::new(), &mut run);
            let len = self.tree.leaf_order.len();
            let at = add_index.unwrap_or(len).min(len);
            self.tree.leaf_order.splice(at..at, created);
        }
        self.renumber();
        self.synchronize(run)
    }

    /// Flattens nested records (pre-order), assigns identities and drops duplicate identities
    /// within the batch together with everything nested in them.
    fn flatten(&mut self, rows: Vec<R>, run: &mut RunContext) -> Vec<Incoming<R>> {
        let mut raw: Vec<(R, Option<usize>)> = Vec::with_capacity(rows.len());
        let mut stack: Vec<(R, Option<usize>)> =
            rows.into_iter().rev().map(|row| (row, None)).collect();
        while let Some((record, container)) = stack.pop() {
            let index = raw.len();
            if let Some(children) = self.strategy.nested_children(&record) {
                stack.extend(children.into_iter().rev().map(|child| (child, Some(index))));
            }
            raw.push((record, container));
        }

        let mut incoming = Vec::with_capacity(raw.len());
        let mut positions: Vec<Option<usize>> = Vec::with_capacity(raw.len());
        let mut seen = HashSet::new();
        for (ordinal, (record, container)) in raw.into_iter().enumerate() {
            let container = match container {
                Some(raw_index) => match positions[raw_index] {
                    Some(position) => Some(position),
                    None => {
                        positions.push(None);
                        continue;
                    }
                },
                None => None,
            };
            let id = self.identify(&record);
            if !seen.insert(id.clone()) {
                run.report(SyncDiagnostic::DuplicateRow {
                    row: id,
                    ordinal,
                    payload: format!("{record:?}"),
                });
                positions.push(None);
                continue;
            }
            positions.push(Some(incoming.len()));
            incoming.push(Incoming {
                id,
                data: record,
                container,
            });
        }
        incoming
    }

    fn identify(&mut self, record: &R) -> RowId {
        if let Some(id) = self.identity.as_ref().and_then(|identity| identity(record)) {
            return id;
        }
        let id = RowId::new(self.next_auto_id.to_string());
        self.next_auto_id += 1;
        id
    }

    /// Creates (or, for ids in `reusable`, refreshes) rows for flattened entries nested under
    /// `container`. Returns every ingested node and, separately, the newly created ones.
    fn ingest(
        &mut self,
        entries: Vec<Incoming<R>>,
        container: Option<NodeId>,
        reusable: &HashSet<NodeId>,
        run: &mut RunContext,
    ) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut ingested: Vec<Option<NodeId>> = Vec::with_capacity(entries.len());
        let mut created = Vec::new();
        for (ordinal, entry) in entries.into_iter().enumerate() {
            let parent = match entry.container {
                Some(position) => match ingested[position] {
                    Some(node) => Some(node),
                    None => {
                        ingested.push(None);
                        continue;
                    }
                },
                None => container,
            };
            let node = match self.tree.row_node(&entry.id) {
                Some(existing) if reusable.contains(&existing) => {
                    self.tree[existing].data = Some(entry.data);
                    existing
                }
                Some(_) => {
                    run.report(SyncDiagnostic::DuplicateRow {
                        row: entry.id,
                        ordinal,
                        payload: format!("{:?}", entry.data),
                    });
                    ingested.push(None);
                    continue;
                }
                None => {
                    let node = self.create_row(entry.id, entry.data);
                    created.push(node);
                    node
                }
            };
            self.strategy.record_container(node, parent);
            run.changed.push(node);
            ingested.push(Some(node));
        }
        (ingested.into_iter().flatten().collect(), created)
    }

    fn update_row(&mut self, record: R, run: &mut RunContext) {
        let Some(row) = self.identity.as_ref().and_then(|identity| identity(&record)) else {
            run.report(SyncDiagnostic::MissingConfiguration(format!(
                "record without identity cannot be updated: {record:?}"
            )));
            return;
        };
        let Some(node) = self.tree.row_node(&row) else {
            run.report(SyncDiagnostic::UnknownRow(row));
            return;
        };
        let nested = self.strategy.nested_children(&record);
        self.tree[node].data = Some(record);
        run.changed.push(node);
        if let Some(children) = nested {
            self.replace_nested(node, children, run);
        }
    }

    /// Re-reads the records nested in an updated container.
    fn replace_nested(&mut self, container: NodeId, children: Vec<R>, run: &mut RunContext) {
        let previous: HashSet<NodeId> = self
            .strategy
            .dependents(&self.tree, container)
            .into_iter()
            .collect();
        let entries = self.flatten(children, run);
        let (ingested, created) = self.ingest(entries, Some(container), &previous, run);

        let kept: HashSet<NodeId> = ingested.iter().copied().collect();
        let mut gone: Vec<NodeId> = previous.difference(&kept).copied().collect();
        gone.sort_by_key(|id| self.tree[*id].ordinal);
        for node in gone {
            self.remove_row(node, run);
        }
        self.prune_leaf_order();

        let anchor = self
            .tree
            .leaf_order
            .iter()
            .rposition(|id| *id == container || kept.contains(id))
            .map(|position| position + 1)
            .unwrap_or(self.tree.leaf_order.len());
        self.tree.leaf_order.splice(anchor..anchor, created);
    }

    fn create_row(&mut self, id: RowId, data: R) -> NodeId {
        let node = self.tree.arena.insert(TreeNode::row(id.clone(), data, 0));
        self.tree.rows.insert(id, node);
        node
    }

    /// Unlinks a row (and whatever exists only as part of it) from every index and queues it for
    /// deletion. Leaf order is pruned separately by [TreeEngine::prune_leaf_order].
    fn remove_row(&mut self, node: NodeId, run: &mut RunContext) {
        if !self.tree.is_live_row(node) {
            return;
        }
        let mut doomed = vec![node];
        doomed.extend(self.strategy.dependents(&self.tree, node));
        for id in doomed {
            if !self.tree.is_live_row(id) {
                continue;
            }
            let row = self.tree[id].id.clone();
            tracing::debug!("[TreeEngine] removing row {row}");
            self.tree.rows.remove(&row);
            self.strategy.forget(&self.tree, id);
            self.guard.forget(id);
            if let Some(parent) = self.tree[id].parent {
                attach::mark_children_changed(&mut self.tree, parent, run);
            }
            self.tree.schedule_deletion(id);
        }
    }

    fn prune_leaf_order(&mut self) {
        let Tree {
            arena,
            rows,
            leaf_order,
            ..
        } = &mut self.tree;
        leaf_order.retain(|id| {
            arena
                .get(*id)
                .map(|node| rows.get(&node.id) == Some(id))
                .unwrap_or(false)
        });
    }

    fn renumber(&mut self) {
        let Tree {
            arena, leaf_order, ..
        } = &mut self.tree;
        for (ordinal, id) in leaf_order.iter().enumerate() {
            arena[*id].ordinal = ordinal;
        }
    }

    fn synchronize(&mut self, mut run: RunContext) -> SyncReport {
        let guard_reruns = match &self.missing_configuration {
            Some(message) => {
                if !self.withheld_reported {
                    run.report(SyncDiagnostic::MissingConfiguration(message.clone()));
                    self.withheld_reported = true;
                }
                sync::withhold(&mut self.tree, &self.policy, &mut run);
                0
            }
            None => sync::run(
                &mut self.tree,
                self.strategy.as_mut(),
                &mut self.guard,
                &self.policy,
                &mut run,
            ),
        };

        let changed_path = ChangedPath::collect(&self.tree);
        let selection = self
            .selection
            .reconcile(&mut self.tree, &changed_path, &run.newly_hidden);
        self.runs += 1;
        tracing::info!(
            run = self.runs,
            full = run.full,
            rows = self.tree.row_count(),
            changed = changed_path.len(),
            diagnostics = run.diagnostics.len(),
            reruns = guard_reruns,
            "tree synchronized"
        );

        if !changed_path.is_empty() {
            let rows = changed_path.row_ids(&self.tree);
            self.send(TreeEvent::StructureChanged(rows));
        }
        self.publish_selection(&selection);
        self.diagnostics.extend(run.diagnostics.iter().cloned());
        SyncReport {
            changed_path,
            diagnostics: run.diagnostics,
            selection,
            guard_reruns,
            visited: run.visited,
        }
    }

    fn send(&mut self, event: TreeEvent) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        if let Err(e) = tx.send(event) {
            tracing::warn!("[TreeEngine] {}, dropping the event sender", TreeSyncError::from(e));
            self.tx = None;
        }
    }

    fn publish_selection(&mut self, change: &Option<SelectionChange>) {
        if let Some(change) = change {
            self.send(TreeEvent::SelectionChanged(change.clone()));
        }
    }

    /// Expands or collapses one node. Collapsing runs the hidden-row selection cascade.
    pub fn set_expanded(
        &mut self,
        node: NodeId,
        expanded: bool,
    ) -> Result<Option<SelectionChange>, TreeSyncError> {
        if !self.apply_expanded(node, expanded)? || expanded {
            return Ok(None);
        }
        let change = self.selection.deselect_hidden(&mut self.tree, &[node]);
        self.publish_selection(&change);
        Ok(change)
    }

    pub fn expand_all(&mut self) {
        for group in self.groups() {
            if let Err(e) = self.apply_expanded(group, true) {
                tracing::warn!("[TreeEngine::expand_all] {e}");
            }
        }
    }

    pub fn collapse_all(&mut self) -> Option<SelectionChange> {
        let mut collapsed = Vec::new();
        for group in self.groups() {
            match self.apply_expanded(group, false) {
                Ok(true) => collapsed.push(group),
                Ok(false) => {}
                Err(e) => tracing::warn!("[TreeEngine::collapse_all] {e}"),
            }
        }
        let change = self.selection.deselect_hidden(&mut self.tree, &collapsed);
        self.publish_selection(&change);
        change
    }

    fn apply_expanded(&mut self, node: NodeId, expanded: bool) -> Result<bool, TreeSyncError> {
        let target = self
            .tree
            .arena
            .get_mut(node)
            .ok_or_else(|| TreeSyncError::NotFound(format!("node {node}")))?;
        if target.is_root() {
            return Err(TreeSyncError::InvalidOperation(
                "the root is always expanded".to_string(),
            ));
        }
        target.flags.remove(NodeFlag::ExpansionNeedsInit);
        if target.expanded == expanded {
            return Ok(false);
        }
        target.expanded = expanded;
        if !expanded {
            target.display_index = None;
        }
        let row = target.id.clone();
        self.send(TreeEvent::ExpansionChanged(row, expanded));
        Ok(true)
    }

    fn groups(&self) -> Vec<NodeId> {
        let mut groups = Vec::new();
        self.tree.for_each_node(|id, node| {
            if !node.is_root() && node.is_group {
                groups.push(id);
            }
        });
        groups
    }

    pub fn set_selected(
        &mut self,
        node: NodeId,
        selected: bool,
    ) -> Result<Option<SelectionChange>, TreeSyncError> {
        if self.get(node)?.is_root() {
            return Err(TreeSyncError::InvalidOperation(
                "the root cannot be selected".to_string(),
            ));
        }
        let change = self.selection.select(&mut self.tree, node, selected);
        self.publish_selection(&change);
        Ok(change)
    }

    /// Selected record-backed rows, in leaf order.
    pub fn selected_rows(&self) -> Vec<NodeId> {
        self.tree
            .leaf_order
            .iter()
            .copied()
            .filter(|id| self.tree[*id].selected.is_selected())
            .collect()
    }

    /// Visible rows in display order: every node whose ancestors are all expanded.
    ///
    /// Assigns each returned node its [TreeNode::display_index]; every other node gets `None`.
    pub fn display_rows(&mut self) -> Vec<NodeId> {
        for (_, node) in self.tree.arena.iter_mut() {
            node.display_index = None;
        }
        let mut rows = Vec::new();
        let mut stack: Vec<NodeId> = self.tree[self.tree.root]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(id) = stack.pop() {
            let node = &mut self.tree[id];
            node.display_index = Some(rows.len());
            rows.push(id);
            if node.is_group && node.expanded {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        rows
    }

    /// Structural self-check. Returns a description of every violated invariant; empty when the
    /// tree is consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let tree = &self.tree;
        let root = tree.root;

        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                errors.push(format!("[TreeEngine::check_invariants] {id} reachable twice"));
                continue;
            }
            let Some(node) = tree.node(id) else {
                errors.push(format!("[TreeEngine::check_invariants] {id} was destroyed"));
                continue;
            };
            if node.is_group != !node.children.is_empty() {
                errors.push(format!(
                    "[TreeEngine::check_invariants] {} is_group {} with {} children",
                    node.id,
                    node.is_group,
                    node.children.len()
                ));
            }
            if node.is_filler() && node.children.is_empty() {
                errors.push(format!(
                    "[TreeEngine::check_invariants] empty filler {}",
                    node.id
                ));
            }
            if node.is_excluded() {
                errors.push(format!(
                    "[TreeEngine::check_invariants] excluded row {} is in the tree",
                    node.id
                ));
            }
            for child in node.children.iter() {
                match tree.node(*child) {
                    Some(child_node) => {
                        if child_node.parent != Some(id) {
                            errors.push(format!(
                                "[TreeEngine::check_invariants] {} listed under {} but its parent is {:?}",
                                child_node.id, node.id, child_node.parent
                            ));
                        }
                        if child_node.level != node.level + 1 {
                            errors.push(format!(
                                "[TreeEngine::check_invariants] {} at level {} under level {}",
                                child_node.id, child_node.level, node.level
                            ));
                        }
                    }
                    None => errors.push(format!(
                        "[TreeEngine::check_invariants] {} lists destroyed child {child}",
                        node.id
                    )),
                }
                stack.push(*child);
            }
        }

        let expected = if self.is_withheld() {
            0
        } else {
            tree.live_leaf_count()
        };
        let reached = tree[root].leaf_descendants.len();
        if reached != expected {
            errors.push(format!(
                "[TreeEngine::check_invariants] root reaches {reached} rows, expected {expected}"
            ));
        }
        let direct_rows = tree[root]
            .children
            .iter()
            .filter(|id| tree[**id].is_row())
            .count();
        let nested: usize = tree[root]
            .children
            .iter()
            .map(|id| tree[*id].leaf_descendants.len())
            .sum();
        if nested + direct_rows != reached {
            errors.push(format!(
                "[TreeEngine::check_invariants] top-level leaf counts sum to {}, root holds {reached}",
                nested + direct_rows
            ));
        }
        if !self.is_withheld() {
            for id in tree.leaf_order.iter() {
                if !tree[*id].excluded && !seen.contains(id) {
                    errors.push(format!(
                        "[TreeEngine::check_invariants] row {} is unreachable",
                        tree[*id].id
                    ));
                }
            }
            errors.extend(self.strategy.check_invariants(tree));
        }
        errors
    }
}

impl<R> fmt::Debug for TreeEngine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeEngine")
            .field("mode", &self.strategy.mode())
            .field("rows", &self.tree.row_count())
            .field("nodes", &self.tree.node_count())
            .field("runs", &self.runs)
            .finish()
    }
}

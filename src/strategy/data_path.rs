//! Data-path addressing: each record carries the full list of path segments leading to it.
//!
//! The strategy keeps an index from full path to the node occupying it. Prefixes that no record
//! occupies get filler nodes, created on demand while resolving parents. When a record later
//! claims a path a filler holds, the record takes over (keeping the filler's expansion state)
//! and the filler is evicted at the end of the attach pass.
//!
//! Two records claiming the same path is a conflict: the one with the lower ordinal wins, the
//! other is excluded from the tree and retried on every later run until the path frees up.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::{
    config::AddressingMode,
    diagnostic::SyncDiagnostic,
    node::{NodeFlag, NodeId},
    strategy::{filler::FillerRegistry, AddressingStrategy, PathFn},
    sync::{attach::mark_children_changed, RunContext},
    tree::Tree,
};

pub struct DataPathStrategy<R> {
    path_fn: PathFn<R>,
    paths: HashMap<Vec<String>, NodeId>,
    leaf_paths: HashMap<NodeId, Vec<String>>,
    excluded: HashSet<NodeId>,
    /// Rows without a usable path that were already reported.
    pathless: HashSet<NodeId>,
    fillers: FillerRegistry,
}

impl<R> DataPathStrategy<R> {
    pub fn new(path_fn: PathFn<R>) -> DataPathStrategy<R> {
        DataPathStrategy {
            path_fn,
            paths: HashMap::new(),
            leaf_paths: HashMap::new(),
            excluded: HashSet::new(),
            pathless: HashSet::new(),
            fillers: FillerRegistry::new(),
        }
    }

    pub fn fillers(&self) -> &FillerRegistry {
        &self.fillers
    }

    /// Node currently occupying `path`.
    pub fn occupant(&self, path: &[String]) -> Option<NodeId> {
        self.paths.get(path).copied()
    }

    pub fn path_of(&self, node: NodeId) -> Option<&[String]> {
        self.fillers
            .path(node)
            .or_else(|| self.leaf_paths.get(&node).map(|path| path.as_slice()))
    }
}

impl<R: fmt::Debug> DataPathStrategy<R> {
    /// Vacates the previous paths of every row in `work` first, so a row moving away frees its
    /// path for rows placed after it in the same run.
    fn place_all(
        &mut self,
        tree: &mut Tree<R>,
        work: Vec<(NodeId, Option<Vec<String>>)>,
        run: &mut RunContext,
    ) {
        for (node, previous) in work.iter() {
            if let Some(previous) = previous {
                if self.paths.get(previous) == Some(node) {
                    self.paths.remove(previous);
                }
            }
        }
        for (node, previous) in work {
            self.place(tree, node, previous, run);
        }
    }

    /// Claims the row's path, settling conflicts with whatever occupies it.
    fn place(
        &mut self,
        tree: &mut Tree<R>,
        node: NodeId,
        previous: Option<Vec<String>>,
        run: &mut RunContext,
    ) {
        let Some(data) = tree[node].data.as_ref() else {
            return;
        };
        let path = (self.path_fn)(data).filter(|path| !path.is_empty());

        let was_excluded = std::mem::replace(&mut tree[node].excluded, false);
        self.excluded.remove(&node);

        let Some(path) = path else {
            let id = tree[node].id.clone();
            tree.set_key(node, id.as_str());
            if self.pathless.insert(node) {
                run.report(SyncDiagnostic::UnresolvedParent {
                    row: id,
                    reference: "<empty path>".to_string(),
                });
            }
            return;
        };
        self.pathless.remove(&node);
        if let Some(key) = path.last() {
            tree.set_key(node, key);
        }

        match self.paths.get(&path).copied() {
            None => {
                self.paths.insert(path.clone(), node);
            }
            Some(occupant) if occupant == node => {}
            Some(occupant) if self.fillers.contains(occupant) => {
                promote(tree, occupant, node);
                self.paths.insert(path.clone(), node);
            }
            Some(occupant) if tree[node].ordinal < tree[occupant].ordinal => {
                self.paths.insert(path.clone(), node);
                self.exclude(tree, occupant, node, &path, false, run);
            }
            Some(occupant) => {
                let already_reported = was_excluded && previous.as_ref() == Some(&path);
                self.exclude(tree, node, occupant, &path, already_reported, run);
            }
        }
        self.leaf_paths.insert(node, path);
    }

    fn exclude(
        &mut self,
        tree: &mut Tree<R>,
        loser: NodeId,
        winner: NodeId,
        path: &[String],
        already_reported: bool,
        run: &mut RunContext,
    ) {
        tree[loser].excluded = true;
        self.excluded.insert(loser);
        if already_reported {
            return;
        }
        run.report(SyncDiagnostic::DuplicatePath {
            path: path.to_vec(),
            kept: tree[winner].id.clone(),
            excluded: tree[loser].id.clone(),
            payload: tree[loser]
                .data
                .as_ref()
                .map(|data| format!("{data:?}"))
                .unwrap_or_default(),
        });
    }

    fn lookup_parent(&self, tree: &Tree<R>, node: NodeId) -> Result<Option<NodeId>, ()> {
        let Some(path) = self.path_of(node) else {
            return Ok(None);
        };
        if path.len() <= 1 {
            return Ok(None);
        }
        let prefix = &path[..path.len() - 1];
        match self.paths.get(prefix) {
            Some(parent) if tree.arena.contains(*parent) => Ok(Some(*parent)),
            _ => Err(()),
        }
    }
}

/// Hands a filler's expansion state to the row taking over its path.
fn promote<R>(tree: &mut Tree<R>, filler: NodeId, row: NodeId) {
    let (expanded, initialized) = {
        let filler = &tree[filler];
        (
            filler.expanded,
            !filler.flags.contains(NodeFlag::ExpansionNeedsInit),
        )
    };
    tracing::debug!("[DataPathStrategy] row {} takes over filler {filler}", tree[row].id);
    if initialized {
        let row = &mut tree[row];
        row.expanded = expanded;
        row.flags.remove(NodeFlag::ExpansionNeedsInit);
        row.flags.insert(NodeFlag::ExpansionRestored);
    }
}

impl<R: fmt::Debug> AddressingStrategy<R> for DataPathStrategy<R> {
    fn mode(&self) -> AddressingMode {
        AddressingMode::DataPath
    }

    fn prepare(&mut self, tree: &mut Tree<R>, run: &mut RunContext) {
        if run.full {
            // Fillers stay indexed across a full reload so an unchanged reload resolves to the
            // same nodes; the ones nobody needs any more are evicted after attaching.
            let fillers = &self.fillers;
            self.paths.retain(|_, id| fillers.contains(*id));
            let mut previous = std::mem::take(&mut self.leaf_paths);
            self.excluded.clear();
            self.pathless.retain(|id| tree.is_live_row(*id));
            let work = tree
                .leaf_order
                .iter()
                .map(|id| (*id, previous.remove(id)))
                .collect();
            self.place_all(tree, work, run);
            return;
        }

        let mut work: Vec<NodeId> = run
            .changed
            .iter()
            .chain(self.excluded.iter())
            .copied()
            .filter(|id| tree.is_live_row(*id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        work.sort_by_key(|id| tree[*id].ordinal);
        let work = work
            .into_iter()
            .map(|id| (id, self.leaf_paths.remove(&id)))
            .collect();
        self.place_all(tree, work, run);
    }

    fn resolve_parent(
        &mut self,
        tree: &mut Tree<R>,
        node: NodeId,
        _run: &mut RunContext,
    ) -> NodeId {
        match self.lookup_parent(tree, node) {
            Ok(Some(parent)) => parent,
            Ok(None) => tree.root,
            Err(()) => {
                let prefix = match self.path_of(node) {
                    Some(path) => path[..path.len() - 1].to_vec(),
                    None => return tree.root,
                };
                let filler = self.fillers.create(tree, &prefix);
                self.paths.insert(prefix, filler);
                filler
            }
        }
    }

    fn peek_parent(&self, tree: &Tree<R>, node: NodeId) -> Option<NodeId> {
        self.lookup_parent(tree, node).ok().flatten()
    }

    fn finish_attach(&mut self, tree: &mut Tree<R>, run: &mut RunContext) {
        for filler in self.fillers.empty_fillers(tree) {
            let Some(path) = self.fillers.release(filler) else {
                continue;
            };
            if self.paths.get(&path) == Some(&filler) {
                self.paths.remove(&path);
                if let Some(node) = tree.node(filler) {
                    if !node.flags.contains(NodeFlag::ExpansionNeedsInit) {
                        let expanded = node.expanded;
                        self.fillers.remember(path, expanded);
                    }
                }
            }
            if let Some(parent) = tree.node(filler).and_then(|node| node.parent) {
                mark_children_changed(tree, parent, run);
            }
            tracing::debug!("[DataPathStrategy] evicting empty filler {filler}");
            tree.schedule_deletion(filler);
        }
        if run.full {
            self.fillers.prune_memory();
        }
    }

    fn forget(&mut self, tree: &Tree<R>, node: NodeId) {
        self.excluded.remove(&node);
        self.pathless.remove(&node);
        let Some(path) = self.leaf_paths.remove(&node) else {
            return;
        };
        if self.paths.get(&path) == Some(&node) {
            self.paths.remove(&path);
            if let Some(row) = tree.node(node).filter(|row| row.is_group) {
                self.fillers.remember(path, row.expanded);
            }
        }
    }

    fn check_invariants(&self, tree: &Tree<R>) -> Vec<String> {
        let mut errors = Vec::new();
        for (path, id) in self.paths.iter() {
            let Some(node) = tree.node(*id) else {
                errors.push(format!(
                    "[DataPathStrategy] path {path:?} indexes destroyed node {id}"
                ));
                continue;
            };
            let indexed = if node.is_filler() {
                self.fillers.path(*id)
            } else {
                self.leaf_paths.get(id).map(|p| p.as_slice())
            };
            if indexed != Some(path.as_slice()) {
                errors.push(format!(
                    "[DataPathStrategy] path {path:?} indexes {} which claims {indexed:?}",
                    node.id
                ));
            }
            if node.is_excluded() {
                errors.push(format!(
                    "[DataPathStrategy] excluded row {} occupies {path:?}",
                    node.id
                ));
            }
        }
        for (id, path) in self.fillers.iter() {
            match tree.node(*id) {
                Some(node) if node.children.is_empty() => errors.push(format!(
                    "[DataPathStrategy] filler {path:?} survived without children"
                )),
                Some(_) => {}
                None => errors.push(format!(
                    "[DataPathStrategy] filler {path:?} was destroyed but is still registered"
                )),
            }
        }
        errors
    }
}

//! Addressing strategies: how the intended parent of each record is resolved.
//!
//! ## Key Components
//!
//! - [`AddressingStrategy`] trait - the seam between the synchronizer and a scheme
//! - [`Addressing`] - caller-facing builder choosing one scheme plus the identity accessor
//! - [`nested::NestedChildrenStrategy`] - hierarchy follows record containment
//! - [`data_path::DataPathStrategy`] - hierarchy follows a per-record list of path segments,
//!   with fillers from [`filler::FillerRegistry`] for prefixes nobody occupies
//! - [`parent_id::ParentIdStrategy`] - each record names its parent's identity
//!
//! Strategies never touch children arrays. They answer "who is this node's parent" during the
//! attach pass and the synchronizer does the rest.

use std::fmt;

use crate::{
    config::AddressingMode,
    node::{NodeId, RowId},
    sync::RunContext,
    tree::Tree,
};

pub mod data_path;
pub mod filler;
pub mod nested;
pub mod parent_id;

pub use data_path::DataPathStrategy;
pub use filler::FillerRegistry;
pub use nested::NestedChildrenStrategy;
pub use parent_id::ParentIdStrategy;

pub type IdentityFn<R> = Box<dyn Fn(&R) -> Option<RowId>>;
pub type PathFn<R> = Box<dyn Fn(&R) -> Option<Vec<String>>>;
pub type ParentIdFn<R> = Box<dyn Fn(&R) -> Option<RowId>>;
pub type ChildrenFn<R> = Box<dyn Fn(&R) -> Vec<R>>;

pub trait AddressingStrategy<R> {
    fn mode(&self) -> AddressingMode;

    /// Child records nested inside `record`, for schemes where containment is the hierarchy.
    fn nested_children(&self, _record: &R) -> Option<Vec<R>> {
        None
    }

    /// Records that `node` was the nested container of when it was loaded.
    fn record_container(&mut self, _node: NodeId, _container: Option<NodeId>) {}

    /// Nodes that exist only as part of `node` and disappear along with it.
    fn dependents(&self, _tree: &Tree<R>, _node: NodeId) -> Vec<NodeId> {
        Vec::new()
    }

    /// Refreshes keys and internal indices for the rows changed in this run, before attaching.
    fn prepare(&mut self, tree: &mut Tree<R>, run: &mut RunContext);

    /// Intended parent of a row or filler. May create filler ancestors.
    fn resolve_parent(&mut self, tree: &mut Tree<R>, node: NodeId, run: &mut RunContext)
        -> NodeId;

    /// Parent the scheme currently points at, without side effects. `None` means the root.
    fn peek_parent(&self, tree: &Tree<R>, node: NodeId) -> Option<NodeId>;

    /// Called once every row is attached; evicts whatever is left without children.
    fn finish_attach(&mut self, _tree: &mut Tree<R>, _run: &mut RunContext) {}

    /// Drops everything known about a row that left the tree.
    fn forget(&mut self, _tree: &Tree<R>, _node: NodeId) {}

    /// Internal consistency checks, see [crate::engine::TreeEngine::check_invariants].
    fn check_invariants(&self, _tree: &Tree<R>) -> Vec<String> {
        Vec::new()
    }
}

pub(crate) enum AddressingKind<R> {
    NestedChildren(ChildrenFn<R>),
    DataPath(PathFn<R>),
    ParentId(ParentIdFn<R>),
}

/// Addressing configuration for records of type `R`: one scheme plus an optional identity
/// accessor.
///
/// ```rust
/// use treesync_core::{node::RowId, strategy::Addressing};
///
/// #[derive(Debug, Clone)]
/// struct Employee {
///     id: String,
///     manager: Option<String>,
/// }
///
/// let addressing = Addressing::parent_id(|e: &Employee| e.manager.as_deref().map(RowId::from))
///     .with_identity(|e: &Employee| Some(RowId::from(e.id.as_str())));
/// assert!(addressing.missing_configuration().is_none());
/// ```
pub struct Addressing<R> {
    pub(crate) identity: Option<IdentityFn<R>>,
    pub(crate) kind: AddressingKind<R>,
}

impl<R: 'static> Addressing<R> {
    pub fn nested_children<F>(children: F) -> Self
    where
        F: Fn(&R) -> Vec<R> + 'static,
    {
        Addressing {
            identity: None,
            kind: AddressingKind::NestedChildren(Box::new(children)),
        }
    }

    pub fn data_path<F>(path: F) -> Self
    where
        F: Fn(&R) -> Option<Vec<String>> + 'static,
    {
        Addressing {
            identity: None,
            kind: AddressingKind::DataPath(Box::new(path)),
        }
    }

    pub fn parent_id<F>(parent_id: F) -> Self
    where
        F: Fn(&R) -> Option<RowId> + 'static,
    {
        Addressing {
            identity: None,
            kind: AddressingKind::ParentId(Box::new(parent_id)),
        }
    }

    pub fn with_identity<F>(mut self, identity: F) -> Self
    where
        F: Fn(&R) -> Option<RowId> + 'static,
    {
        self.identity = Some(Box::new(identity));
        self
    }

    pub fn mode(&self) -> AddressingMode {
        match self.kind {
            AddressingKind::NestedChildren(_) => AddressingMode::NestedChildren,
            AddressingKind::DataPath(_) => AddressingMode::DataPath,
            AddressingKind::ParentId(_) => AddressingMode::ParentId,
        }
    }

    /// Why this configuration cannot build a tree, if it cannot.
    pub fn missing_configuration(&self) -> Option<String> {
        match (&self.kind, &self.identity) {
            (AddressingKind::ParentId(_), None) => Some(
                "parent-id addressing requires an identity accessor to resolve parent references"
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl<R: fmt::Debug + 'static> Addressing<R> {
    pub(crate) fn into_parts(self) -> (Option<IdentityFn<R>>, Box<dyn AddressingStrategy<R>>) {
        let strategy: Box<dyn AddressingStrategy<R>> = match self.kind {
            AddressingKind::NestedChildren(children) => {
                Box::new(NestedChildrenStrategy::new(children))
            }
            AddressingKind::DataPath(path) => Box::new(DataPathStrategy::new(path)),
            AddressingKind::ParentId(parent_id) => Box::new(ParentIdStrategy::new(parent_id)),
        };
        (self.identity, strategy)
    }
}

impl<R> fmt::Debug for Addressing<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            AddressingKind::NestedChildren(_) => "NestedChildren",
            AddressingKind::DataPath(_) => "DataPath",
            AddressingKind::ParentId(_) => "ParentId",
        };
        f.debug_struct("Addressing")
            .field("kind", &kind)
            .field("identity", &self.identity.is_some())
            .finish()
    }
}

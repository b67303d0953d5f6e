//! Tree node model: identities, arena handles, per-pass flags and the node itself.

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity used for the synthetic root node.
pub const ROOT_ROW_ID: &str = "ROOT_NODE_ID";

/// Prefix of the identity of every filler node; the remainder is the filler's path.
pub const FILLER_ID_PREFIX: &str = "filler-";

/// Stable, externally assigned identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new<S: Into<String>>(id: S) -> RowId {
        RowId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn root() -> RowId {
        RowId(ROOT_ROW_ID.to_string())
    }

    pub fn filler(path: &[String]) -> RowId {
        RowId(format!("{FILLER_ID_PREFIX}{}", path.join("/")))
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> RowId {
        RowId(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> RowId {
        RowId(id)
    }
}

impl From<&String> for RowId {
    fn from(id: &String) -> RowId {
        RowId(id.clone())
    }
}

/// Generational handle into a [crate::arena::NodeArena].
///
/// A handle outlives the node it names; once the slot is reused the generation no longer
/// matches and lookups return `None` instead of another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Scratch state used while a synchronization run is in progress.
///
/// Everything except [NodeFlag::ExpansionNeedsInit] is cleared at the start of each run.
#[derive(Debug, Hash, EnumSetType)]
pub enum NodeFlag {
    /// Placed into its parent's children during the current attach pass.
    Committed,
    /// The node's parent differs from the previous run.
    Moved,
    /// The node's direct children changed (membership or order).
    ChildrenChanged,
    /// Some descendant below this node changed structurally.
    SubtreeChanged,
    /// The display key changed.
    KeyChanged,
    /// `expanded` has to be computed from the expansion policy.
    ExpansionNeedsInit,
    /// `expanded` was carried over from a node previously occupying the same path.
    ExpansionRestored,
    /// Filler created during the current run.
    ProvisionalFiller,
}

impl NodeFlag {
    /// Flags reset at the start of a synchronization run.
    pub fn scratch() -> EnumSet<NodeFlag> {
        EnumSet::all() - NodeFlag::ExpansionNeedsInit
    }

    /// Flags that put a node on the change path.
    pub fn structural() -> EnumSet<NodeFlag> {
        NodeFlag::Moved | NodeFlag::ChildrenChanged | NodeFlag::SubtreeChanged
    }
}

/// What backs a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    /// Backed by an input record (a leaf in the glossary sense, whether or not it has children).
    Row,
    /// Synthetic group for a path segment without a record.
    Filler,
}

/// Tri-state selection. Groups derive theirs from their children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionState {
    #[default]
    Deselected,
    Selected,
    Mixed,
}

impl SelectionState {
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionState::Selected)
    }

    pub fn from_bool(selected: bool) -> SelectionState {
        if selected {
            SelectionState::Selected
        } else {
            SelectionState::Deselected
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode<R> {
    pub(crate) id: RowId,
    pub(crate) key: String,
    pub(crate) kind: NodeKind,
    pub(crate) data: Option<R>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) leaf_descendants: Vec<NodeId>,
    pub(crate) level: i32,
    pub(crate) is_group: bool,
    pub(crate) expanded: bool,
    pub(crate) selected: SelectionState,
    pub(crate) display_index: Option<usize>,
    pub(crate) ordinal: usize,
    pub(crate) excluded: bool,
    pub(crate) pending_children: usize,
    pub(crate) flags: EnumSet<NodeFlag>,
}

impl<R> TreeNode<R> {
    pub(crate) fn root() -> TreeNode<R> {
        let mut node = TreeNode::new(RowId::root(), NodeKind::Root, None);
        node.level = -1;
        node.expanded = true;
        node.flags.remove(NodeFlag::ExpansionNeedsInit);
        node
    }

    pub(crate) fn row(id: RowId, data: R, ordinal: usize) -> TreeNode<R> {
        let mut node = TreeNode::new(id, NodeKind::Row, Some(data));
        node.ordinal = ordinal;
        node
    }

    pub(crate) fn filler(path: &[String]) -> TreeNode<R> {
        let mut node = TreeNode::new(RowId::filler(path), NodeKind::Filler, None);
        node.key = path.last().cloned().unwrap_or_default();
        node.flags.insert(NodeFlag::ProvisionalFiller);
        node
    }

    fn new(id: RowId, kind: NodeKind, data: Option<R>) -> TreeNode<R> {
        TreeNode {
            id,
            key: String::new(),
            kind,
            data,
            parent: None,
            children: Vec::new(),
            leaf_descendants: Vec::new(),
            level: 0,
            is_group: false,
            expanded: false,
            selected: SelectionState::Deselected,
            display_index: None,
            ordinal: 0,
            excluded: false,
            pending_children: 0,
            flags: EnumSet::only(NodeFlag::ExpansionNeedsInit),
        }
    }

    pub fn id(&self) -> &RowId {
        &self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The original record, `None` for fillers and the root.
    pub fn data(&self) -> Option<&R> {
        self.data.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Every record-backed node below this one, in depth-first order.
    pub fn leaf_descendants(&self) -> &[NodeId] {
        &self.leaf_descendants
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// True iff the node has children. Holds for the root too.
    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub fn is_filler(&self) -> bool {
        self.kind == NodeKind::Filler
    }

    pub fn is_root(&self) -> bool {
        self.kind == NodeKind::Root
    }

    pub fn is_row(&self) -> bool {
        self.kind == NodeKind::Row
    }

    pub fn expanded(&self) -> bool {
        self.expanded
    }

    pub fn selected(&self) -> SelectionState {
        self.selected
    }

    /// Position among the visible rows, as of the last [crate::engine::TreeEngine::display_rows].
    pub fn display_index(&self) -> Option<usize> {
        self.display_index
    }

    /// Position of the record in the current leaf order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// True for records kept out of the tree because another record claimed their slot.
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn flags(&self) -> EnumSet<NodeFlag> {
        self.flags
    }
}

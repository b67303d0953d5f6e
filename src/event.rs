use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{node::RowId, selection::SelectionChange};

/// Notifications for collaborators (renderers, selection widgets) that sit outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeEvent {
    /// Rows whose subtree changed structurally during the last run, root first
    StructureChanged(Vec<RowId>),
    /// One batch of selection changes
    SelectionChanged(SelectionChange),
    /// Row, new expanded state
    ExpansionChanged(RowId, bool),
}

impl TreeEvent {
    /// Row identities carried by the event.
    pub fn rows(&self) -> Vec<&RowId> {
        match self {
            TreeEvent::StructureChanged(rows) => rows.iter().collect(),
            TreeEvent::SelectionChanged(change) => change.rows().collect(),
            TreeEvent::ExpansionChanged(row, _) => vec![row],
        }
    }
}

impl Display for TreeEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TreeEvent::StructureChanged(_) => write!(f, "StructureChanged"),
            TreeEvent::SelectionChanged(_) => write!(f, "SelectionChanged"),
            TreeEvent::ExpansionChanged(_, _) => write!(f, "ExpansionChanged"),
        }
    }
}

//! Diagnostics raised while synchronizing a tree.
//!
//! None of these abort a run. Each one is recovered locally (duplicates are excluded, unresolved
//! parents fall back to the root, cycles are re-rooted) and then reported here so callers can
//! surface the problem without ever observing a broken tree.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::RowId;

/// A node that was cut out of a parent cycle, and the parent it claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleMember {
    pub row: RowId,
    pub stale_parent: RowId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDiagnostic {
    /// Two records share an identity. The first one (lowest ordinal) is kept.
    DuplicateRow {
        row: RowId,
        ordinal: usize,
        payload: String,
    },
    /// Two records resolve to the same full path. `kept` occupies it, `excluded` is left out.
    DuplicatePath {
        path: Vec<String>,
        kept: RowId,
        excluded: RowId,
        payload: String,
    },
    /// The record's parent reference could not be resolved; it was placed under the root.
    UnresolvedParent { row: RowId, reference: String },
    /// A parent cycle was found and its members were re-rooted.
    Cycle { members: Vec<CycleMember> },
    /// The addressing configuration cannot produce a tree; the tree is withheld (left empty).
    MissingConfiguration(String),
    /// A transaction referenced a record identity that is not loaded.
    UnknownRow(RowId),
}

impl SyncDiagnostic {
    pub fn is_cycle(&self) -> bool {
        matches!(self, SyncDiagnostic::Cycle { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            SyncDiagnostic::DuplicateRow { .. } | SyncDiagnostic::DuplicatePath { .. }
        )
    }

    /// Row identities named by this diagnostic.
    pub fn rows(&self) -> Vec<&RowId> {
        match self {
            SyncDiagnostic::DuplicateRow { row, .. } => vec![row],
            SyncDiagnostic::DuplicatePath { kept, excluded, .. } => vec![kept, excluded],
            SyncDiagnostic::UnresolvedParent { row, .. } => vec![row],
            SyncDiagnostic::Cycle { members } => members
                .iter()
                .flat_map(|member| [&member.row, &member.stale_parent])
                .collect(),
            SyncDiagnostic::MissingConfiguration(_) => vec![],
            SyncDiagnostic::UnknownRow(row) => vec![row],
        }
    }

    /// Logs the diagnostic through `tracing`.
    pub(crate) fn emit(&self) {
        match self {
            SyncDiagnostic::MissingConfiguration(_) => tracing::error!("{self}"),
            _ => tracing::warn!("{self}"),
        }
    }
}

impl fmt::Display for SyncDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDiagnostic::DuplicateRow {
                row,
                ordinal,
                payload,
            } => write!(
                f,
                "duplicate row id '{row}' at ordinal {ordinal} ignored, record: {payload}"
            ),
            SyncDiagnostic::DuplicatePath {
                path,
                kept,
                excluded,
                payload,
            } => write!(
                f,
                "duplicate path {path:?}: '{kept}' kept, '{excluded}' excluded, record: {payload}"
            ),
            SyncDiagnostic::UnresolvedParent { row, reference } => write!(
                f,
                "row '{row}' references unresolved parent '{reference}', attached to root"
            ),
            SyncDiagnostic::Cycle { members } => {
                write!(f, "parent cycle detected, re-rooted:")?;
                for member in members {
                    write!(f, " '{}' (parent '{}')", member.row, member.stale_parent)?;
                }
                Ok(())
            }
            SyncDiagnostic::MissingConfiguration(msg) => {
                write!(f, "missing configuration, tree withheld: {msg}")
            }
            SyncDiagnostic::UnknownRow(row) => {
                write!(f, "transaction references unknown row '{row}'")
            }
        }
    }
}

use std::{fmt, io, sync::mpsc::SendError};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::event::TreeEvent;

/// Errors surfaced at the configuration, IO and API boundary.
///
/// Synchronization runs themselves never fail: everything that goes wrong inside a run is
/// recovered locally and reported as a [crate::diagnostic::SyncDiagnostic].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum TreeSyncError {
    #[error("Notification channel error: {0}")]
    Channel(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for TreeSyncError {
    fn from(src: toml::de::Error) -> TreeSyncError {
        TreeSyncError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for TreeSyncError {
    fn from(src: toml::ser::Error) -> TreeSyncError {
        TreeSyncError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for TreeSyncError {
    fn from(src: JsonError) -> TreeSyncError {
        TreeSyncError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for TreeSyncError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => TreeSyncError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => TreeSyncError::PermissionDenied,
            _ => TreeSyncError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for TreeSyncError {
    fn from(x: fmt::Error) -> Self {
        TreeSyncError::Serialization(format!("{x}"))
    }
}

impl From<SendError<TreeEvent>> for TreeSyncError {
    fn from(x: SendError<TreeEvent>) -> Self {
        TreeSyncError::Channel(format!(
            "Channel update send Error, could not transmit tree event {}",
            x.0
        ))
    }
}

//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use treesync_core::{config::TreeConfig, engine::TreeEngine, node::RowId, strategy::Addressing};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A record carrying every addressing field, so one type serves all schemes.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub parent: Option<String>,
    pub path: Vec<String>,
}

#[allow(dead_code)]
pub fn parent_row(id: &str, parent: Option<&str>) -> Row {
    Row {
        id: id.to_string(),
        parent: parent.map(str::to_string),
        path: Vec::new(),
    }
}

#[allow(dead_code)]
pub fn path_row(id: &str, path: &[&str]) -> Row {
    Row {
        id: id.to_string(),
        parent: None,
        path: path.iter().map(|s| s.to_string()).collect(),
    }
}

#[allow(dead_code)]
pub fn parent_id_engine() -> TreeEngine<Row> {
    init_logging();
    let addressing = Addressing::parent_id(|r: &Row| r.parent.as_deref().map(RowId::from))
        .with_identity(|r: &Row| Some(RowId::from(r.id.as_str())));
    TreeEngine::new(addressing, TreeConfig::default())
}

#[allow(dead_code)]
pub fn data_path_engine() -> TreeEngine<Row> {
    init_logging();
    let addressing = Addressing::data_path(|r: &Row| Some(r.path.clone()))
        .with_identity(|r: &Row| Some(RowId::from(r.id.as_str())));
    TreeEngine::new(addressing, TreeConfig::default())
}

/// The reachable tree as `level:id` lines in pre-order.
#[allow(dead_code)]
pub fn snapshot(engine: &TreeEngine<Row>) -> Vec<String> {
    let mut lines = Vec::new();
    engine.for_each_node(|_, node| lines.push(format!("{}:{}", node.level(), node.id())));
    lines
}

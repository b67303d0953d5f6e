//! Shared test utilities for tree synchronization tests

use crate::{
    config::TreeConfig,
    engine::TreeEngine,
    node::{NodeId, RowId},
    strategy::Addressing,
};
use std::fmt::Debug;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Record addressed by the identity of its parent
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: String,
    pub parent: Option<String>,
}

pub fn person(id: &str, parent: Option<&str>) -> Person {
    Person {
        id: id.to_string(),
        parent: parent.map(str::to_string),
    }
}

pub fn parent_id_engine(config: TreeConfig) -> TreeEngine<Person> {
    init_logging();
    let addressing = Addressing::parent_id(|p: &Person| p.parent.as_deref().map(RowId::from))
        .with_identity(|p: &Person| Some(RowId::from(p.id.as_str())));
    TreeEngine::new(addressing, config)
}

/// The `[{id:A},{id:B,parent:A},{id:C},{id:D,parent:C},{id:E,parent:C}]` data set
pub fn org_chart() -> Vec<Person> {
    vec![
        person("A", None),
        person("B", Some("A")),
        person("C", None),
        person("D", Some("C")),
        person("E", Some("C")),
    ]
}

/// Record addressed by a data path
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub id: String,
    pub path: Vec<String>,
}

pub fn store(id: &str, path: &[&str]) -> Store {
    Store {
        id: id.to_string(),
        path: path.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn data_path_engine(config: TreeConfig) -> TreeEngine<Store> {
    init_logging();
    let addressing = Addressing::data_path(|s: &Store| Some(s.path.clone()))
        .with_identity(|s: &Store| Some(RowId::from(s.id.as_str())));
    TreeEngine::new(addressing, config)
}

pub fn stores() -> Vec<Store> {
    vec![
        store("a", &["East", "NY", "StoreA"]),
        store("b", &["East", "NY", "StoreB"]),
        store("c", &["West", "CA", "StoreC"]),
    ]
}

/// Record whose children are nested inside it
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub id: String,
    pub children: Vec<Folder>,
}

pub fn folder(id: &str, children: Vec<Folder>) -> Folder {
    Folder {
        id: id.to_string(),
        children,
    }
}

pub fn nested_engine(config: TreeConfig) -> TreeEngine<Folder> {
    init_logging();
    let addressing = Addressing::nested_children(|f: &Folder| f.children.clone())
        .with_identity(|f: &Folder| Some(RowId::from(f.id.as_str())));
    TreeEngine::new(addressing, config)
}

/// Node of the row with identity `id`; panics when it is not loaded.
pub fn node_of<R: Debug + 'static>(engine: &TreeEngine<R>, id: &str) -> NodeId {
    engine
        .row_node(&RowId::from(id))
        .unwrap_or_else(|| panic!("row {id} is not loaded"))
}

/// Identities of the children of `node`
pub fn child_ids<R: Debug + 'static>(engine: &TreeEngine<R>, node: NodeId) -> Vec<String> {
    engine
        .children(node)
        .unwrap()
        .iter()
        .map(|id| engine.node(*id).unwrap().id().to_string())
        .collect()
}

/// Keys of the children of `node`
pub fn child_keys<R: Debug + 'static>(engine: &TreeEngine<R>, node: NodeId) -> Vec<String> {
    engine
        .children(node)
        .unwrap()
        .iter()
        .map(|id| engine.node(*id).unwrap().key().to_string())
        .collect()
}

pub fn assert_consistent<R: Debug + 'static>(engine: &TreeEngine<R>) {
    let errors = engine.check_invariants();
    assert!(errors.is_empty(), "tree should be consistent: {errors:#?}");
}

//! Tests for data-path addressing and filler groups

use super::helpers::*;
use crate::{
    config::TreeConfig, diagnostic::SyncDiagnostic, engine::RowTransaction, node::RowId,
};
use test_log::test;

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_missing_prefixes_become_fillers() {
    let mut engine = data_path_engine(TreeConfig::default());
    let report = engine.set_rows(stores(), false);
    assert!(report.diagnostics.is_empty());

    let root = engine.root();
    assert_eq!(child_keys(&engine, root), vec!["East", "West"]);
    let east = engine.children(root).unwrap()[0];
    let east_node = engine.node(east).unwrap();
    assert!(east_node.is_filler());
    assert!(east_node.is_group());
    assert_eq!(east_node.id(), &RowId::filler(&path(&["East"])));

    let ny = engine.children(east).unwrap()[0];
    assert_eq!(engine.node(ny).unwrap().key(), "NY");
    assert_eq!(child_ids(&engine, ny), vec!["a", "b"]);
    assert_eq!(child_keys(&engine, ny), vec!["StoreA", "StoreB"]);
    assert_eq!(engine.leaf_descendants(east).unwrap().len(), 2);

    let ids: Vec<String> = engine
        .leaf_descendants(root)
        .unwrap()
        .iter()
        .map(|id| engine.node(*id).unwrap().id().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    // root, 4 fillers, 3 rows
    assert_eq!(engine.tree().node_count(), 8);
    assert_consistent(&engine);
}

#[test]
fn test_unchanged_reload_keeps_fillers() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(stores(), false);
    let root = engine.root();
    let east = engine.children(root).unwrap()[0];

    let report = engine.set_rows(stores(), false);
    assert!(report.is_unchanged(), "{:?}", report.changed_path);
    assert_eq!(engine.children(root).unwrap()[0], east);
    assert_eq!(engine.tree().node_count(), 8);
    assert_consistent(&engine);
}

#[test]
fn test_duplicate_path_keeps_the_first_record() {
    let mut engine = data_path_engine(TreeConfig::default());
    let rows = vec![store("x", &["X", "Y"]), store("y", &["X", "Y"])];
    let report = engine.set_rows(rows.clone(), false);
    assert!(matches!(
        report.diagnostics.as_slice(),
        [SyncDiagnostic::DuplicatePath { kept, excluded, .. }]
            if kept.as_str() == "x" && excluded.as_str() == "y"
    ));

    let root = engine.root();
    let filler = engine.children(root).unwrap()[0];
    assert_eq!(engine.node(filler).unwrap().key(), "X");
    assert_eq!(child_ids(&engine, filler), vec!["x"]);
    let y = node_of(&engine, "y");
    assert!(engine.node(y).unwrap().is_excluded());
    assert_eq!(engine.node(y).unwrap().parent(), None);
    assert_consistent(&engine);

    // The conflict persists but is not reported again.
    let report = engine.set_rows(rows, false);
    assert!(report.diagnostics.is_empty());
    assert!(report.is_unchanged());
}

#[test]
fn test_excluded_record_takes_over_a_freed_path() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(vec![store("x", &["X", "Y"]), store("y", &["X", "Y"])], false);
    let filler = engine.children(engine.root()).unwrap()[0];

    let report =
        engine.apply_transaction(RowTransaction::new().removing(vec![RowId::from("x")]));
    assert!(report.diagnostics.is_empty());
    let y = node_of(&engine, "y");
    assert!(!engine.node(y).unwrap().is_excluded());
    assert_eq!(child_ids(&engine, filler), vec!["y"]);
    assert!(report.changed_path.contains(filler));
    assert_consistent(&engine);
}

#[test]
fn test_record_takes_over_a_filler() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(vec![store("a", &["East", "NY", "StoreA"])], false);
    let root = engine.root();
    let east = engine.children(root).unwrap()[0];
    let filler = engine.children(east).unwrap()[0];
    assert!(engine.node(filler).unwrap().is_filler());
    engine.set_expanded(filler, true).unwrap();

    let report =
        engine.apply_transaction(RowTransaction::new().adding(vec![store("ny", &["East", "NY"])]));
    assert!(report.diagnostics.is_empty());

    let ny = node_of(&engine, "ny");
    assert_eq!(engine.children(east).unwrap(), &[ny]);
    assert_eq!(child_ids(&engine, ny), vec!["a"]);
    let ny_node = engine.node(ny).unwrap();
    assert!(ny_node.is_group());
    assert!(ny_node.expanded(), "expansion carries over from the filler");
    assert_eq!(ny_node.key(), "NY");
    // The filler is gone and its handle no longer resolves.
    assert!(engine.node(filler).is_none());
    assert_consistent(&engine);
}

#[test]
fn test_fillers_without_children_are_evicted() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(stores(), false);
    let root = engine.root();
    let west = engine.children(root).unwrap()[1];

    let report =
        engine.apply_transaction(RowTransaction::new().removing(vec![RowId::from("c")]));
    assert!(report.changed_path.contains(root));
    assert_eq!(child_keys(&engine, root), vec!["East"]);
    assert!(engine.node(west).is_none());
    // root, East, NY, a, b
    assert_eq!(engine.tree().node_count(), 5);
    assert_consistent(&engine);
}

#[test]
fn test_filler_expansion_is_remembered() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(stores(), false);
    let root = engine.root();
    let west = engine.children(root).unwrap()[1];
    engine.set_expanded(west, true).unwrap();

    engine.apply_transaction(RowTransaction::new().removing(vec![RowId::from("c")]));
    assert_eq!(child_keys(&engine, root), vec!["East"]);

    engine.apply_transaction(
        RowTransaction::new().adding(vec![store("c", &["West", "CA", "StoreC"])]),
    );
    let west = engine.children(root).unwrap()[1];
    let west_node = engine.node(west).unwrap();
    assert_eq!(west_node.key(), "West");
    assert!(west_node.expanded());
    let ca = engine.children(west).unwrap()[0];
    assert!(!engine.node(ca).unwrap().expanded());
    assert_consistent(&engine);
}

#[test]
fn test_filler_expansion_survives_full_reloads() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(stores(), false);
    let root = engine.root();
    let west = engine.children(root).unwrap()[1];
    engine.set_expanded(west, true).unwrap();

    engine.set_rows(stores()[..2].to_vec(), false);
    assert_eq!(child_keys(&engine, root), vec!["East"]);
    engine.set_rows(stores(), false);
    let west = engine.children(root).unwrap()[1];
    assert!(engine.node(west).unwrap().expanded());
}

#[test]
fn test_empty_path_attaches_to_root() {
    let mut engine = data_path_engine(TreeConfig::default());
    let rows = vec![store("lost", &[]), store("a", &["East", "StoreA"])];
    let report = engine.set_rows(rows.clone(), false);
    assert!(matches!(
        report.diagnostics.as_slice(),
        [SyncDiagnostic::UnresolvedParent { row, .. }] if row.as_str() == "lost"
    ));
    let root = engine.root();
    assert_eq!(child_keys(&engine, root), vec!["lost", "East"]);
    assert_consistent(&engine);

    let report = engine.set_rows(rows, false);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_moving_a_record_between_groups() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(stores(), false);
    let b = node_of(&engine, "b");
    let ny = engine.node(b).unwrap().parent().unwrap();

    let report = engine.apply_transaction(
        RowTransaction::new().updating(vec![store("b", &["West", "CA", "StoreB"])]),
    );
    let ca = engine.node(b).unwrap().parent().unwrap();
    assert_ne!(ca, ny);
    assert_eq!(engine.node(ca).unwrap().key(), "CA");
    assert_eq!(child_ids(&engine, ca), vec!["b", "c"]);
    assert_eq!(child_ids(&engine, ny), vec!["a"]);
    assert!(report.changed_path.contains(ny));
    assert!(report.changed_path.contains(ca));
    assert_consistent(&engine);
}

#[test]
fn test_renaming_the_last_segment_changes_the_key() {
    let mut engine = data_path_engine(TreeConfig::default());
    engine.set_rows(stores(), false);
    let a = node_of(&engine, "a");
    let ny = engine.node(a).unwrap().parent().unwrap();

    let report = engine.apply_transaction(
        RowTransaction::new().updating(vec![store("a", &["East", "NY", "Flagship"])]),
    );
    assert_eq!(engine.node(a).unwrap().key(), "Flagship");
    assert_eq!(engine.node(a).unwrap().parent(), Some(ny));
    assert!(report.changed_path.contains(ny));
    assert_consistent(&engine);
}

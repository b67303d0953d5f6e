//! Tests for parent-cycle recovery

use super::helpers::*;
use crate::{config::TreeConfig, diagnostic::SyncDiagnostic, engine::RowTransaction};
use test_log::test;

fn cycle_members(diagnostics: &[SyncDiagnostic]) -> Vec<Vec<(String, String)>> {
    diagnostics
        .iter()
        .filter_map(|diagnostic| match diagnostic {
            SyncDiagnostic::Cycle { members } => Some(
                members
                    .iter()
                    .map(|m| (m.row.to_string(), m.stale_parent.to_string()))
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

fn pair(row: &str, parent: &str) -> (String, String) {
    (row.to_string(), parent.to_string())
}

#[test]
fn test_two_row_cycle_is_rerooted() {
    let mut engine = parent_id_engine(TreeConfig::default());
    let rows = vec![person("A", Some("B")), person("B", Some("A"))];
    let report = engine.set_rows(rows.clone(), false);

    assert_eq!(report.guard_reruns, 1);
    assert_eq!(
        cycle_members(&report.diagnostics),
        vec![vec![pair("A", "B"), pair("B", "A")]]
    );
    let root = engine.root();
    assert_eq!(child_ids(&engine, root), vec!["A", "B"]);
    assert!(!engine.node(node_of(&engine, "A")).unwrap().is_group());
    assert_eq!(engine.cycle_breaks(), 2);
    assert_consistent(&engine);

    // Same input, same tree, no second report.
    let report = engine.set_rows(rows, false);
    assert_eq!(report.guard_reruns, 0);
    assert!(report.diagnostics.is_empty());
    assert!(report.is_unchanged());
}

#[test]
fn test_self_parent_is_rerooted() {
    let mut engine = parent_id_engine(TreeConfig::default());
    let report = engine.set_rows(vec![person("A", Some("A")), person("B", None)], false);
    assert_eq!(cycle_members(&report.diagnostics), vec![vec![pair("A", "A")]]);
    let root = engine.root();
    assert_eq!(child_ids(&engine, root), vec!["A", "B"]);
    assert!(engine.children(node_of(&engine, "A")).unwrap().is_empty());
    assert_consistent(&engine);
}

#[test]
fn test_rows_below_a_cycle_stay_with_their_parent() {
    let mut engine = parent_id_engine(TreeConfig::default());
    let report = engine.set_rows(
        vec![
            person("A", Some("B")),
            person("B", Some("A")),
            person("C", Some("A")),
        ],
        false,
    );
    assert_eq!(cycle_members(&report.diagnostics).len(), 1);
    let root = engine.root();
    assert_eq!(child_ids(&engine, root), vec!["A", "B"]);
    assert_eq!(child_ids(&engine, node_of(&engine, "A")), vec!["C"]);
    assert_eq!(engine.leaf_descendants(root).unwrap().len(), 3);
    assert_consistent(&engine);
}

#[test]
fn test_long_cycle_is_reported_once() {
    let mut engine = parent_id_engine(TreeConfig::default());
    let rows = vec![
        person("n0", Some("n4")),
        person("n1", Some("n0")),
        person("n2", Some("n1")),
        person("n3", Some("n2")),
        person("n4", Some("n3")),
    ];
    let report = engine.set_rows(rows, false);
    let cycles = cycle_members(&report.diagnostics);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 5);
    assert_eq!(cycles[0][0], pair("n0", "n4"));
    assert_eq!(report.guard_reruns, 1);
    assert_eq!(engine.leaf_descendants(engine.root()).unwrap().len(), 5);
    assert_consistent(&engine);
}

#[test]
fn test_fixing_the_input_releases_the_break() {
    let mut engine = parent_id_engine(TreeConfig::default());
    engine.set_rows(vec![person("A", Some("B")), person("B", Some("A"))], false);
    assert_eq!(engine.cycle_breaks(), 2);

    let report =
        engine.apply_transaction(RowTransaction::new().updating(vec![person("B", None)]));
    assert_eq!(report.guard_reruns, 0);
    assert!(report.diagnostics.is_empty());
    assert_eq!(engine.cycle_breaks(), 0);
    let root = engine.root();
    assert_eq!(child_ids(&engine, root), vec!["B"]);
    assert_eq!(child_ids(&engine, node_of(&engine, "B")), vec!["A"]);
    assert_consistent(&engine);
}

#[test]
fn test_cycle_formed_by_an_update() {
    let mut engine = parent_id_engine(TreeConfig::default());
    engine.set_rows(org_chart(), false);

    // A under B while B is under A.
    let report =
        engine.apply_transaction(RowTransaction::new().updating(vec![person("A", Some("B"))]));
    assert_eq!(report.guard_reruns, 1);
    assert_eq!(cycle_members(&report.diagnostics).len(), 1);
    let root = engine.root();
    assert_eq!(engine.leaf_descendants(root).unwrap().len(), 5);
    assert!(report.changed_path.contains(root));
    assert_consistent(&engine);
}

//! Pipeline operations wired to in-memory ports.

mod common;

use archflow::EngineError;
use archflow::app::config::EngineConfig;
use archflow::app::dto::UpdateResponse;
use archflow::app::engine::KnowledgeEngine;
use archflow::domain::impact::{RiskLevel, SUMMARY_OUTPUT};
use common::fixtures::{shop_classes, shop_projects, shop_snapshot, snapshot};
use common::mock::{MemoryFingerprinter, MemorySource, MemoryStateStore};

const ORDER_FILE: &str = "src/Shop.Core/OrderAggregate/Order.cs";
const AUDIT_FILE: &str = "src/Shop.Core/Auditing/AuditEntry.cs";

struct Harness {
    engine: KnowledgeEngine,
    source: MemorySource,
    files: MemoryFingerprinter,
    store: MemoryStateStore,
}

fn harness_with(config: EngineConfig) -> Harness {
    let snapshot = shop_snapshot();
    let source = MemorySource::new(snapshot.clone());
    let paths = snapshot.source_paths();
    let files = MemoryFingerprinter::with_files(paths.iter().map(String::as_str));
    let store = MemoryStateStore::new();
    let engine = KnowledgeEngine::new(
        "/virtual/shop",
        config,
        Box::new(source.clone()),
        Box::new(files.clone()),
        Box::new(store.clone()),
    )
    .unwrap();
    Harness {
        engine,
        source,
        files,
        store,
    }
}

fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

#[test]
fn test_scan_records_state_and_outputs() {
    let h = harness();
    let result = h.engine.scan().unwrap();

    assert_eq!(result.solution, "Shop");
    assert_eq!(result.project_count, 5);
    assert_eq!(result.tracked_files, shop_classes().len());
    assert_eq!(result.flows.len(), 2);
    assert_eq!(result.aggregates.len(), 1);
    assert_eq!(result.aggregates[0].root, "Shop.Core.OrderAggregate.Order");
    assert!(result.outputs.contains(&SUMMARY_OUTPUT.to_string()));
    assert!(result.outputs.contains(&"flows/create-order.md".to_string()));

    let state = h.store.current().unwrap();
    assert_eq!(state.files.len(), shop_classes().len());
    assert!(state.last_full_scan.is_some());
    let create_order = &state.kb_outputs["flows/create-order.md"];
    assert!(create_order.contains(&ORDER_FILE.to_string()));
    assert!(!create_order.contains(&AUDIT_FILE.to_string()));
}

#[test]
fn test_update_without_state_runs_full_scan() {
    let h = harness();
    let result = h.engine.update().unwrap();
    assert!(matches!(result, UpdateResponse::FullScan(_)));
    assert!(h.store.current().is_some());
}

#[test]
fn test_update_with_no_changes_is_up_to_date() {
    let h = harness();
    h.engine.scan().unwrap();
    let saves = h.store.save_count();

    let result = h.engine.update().unwrap();
    match result {
        UpdateResponse::UpToDate { tracked_files } => assert_eq!(tracked_files, shop_classes().len()),
        other => panic!("expected up to date, got {other:?}"),
    }
    assert_eq!(h.store.save_count(), saves);
}

#[test]
fn test_update_after_edit_reports_impact() {
    let h = harness();
    h.engine.scan().unwrap();
    h.files.write(ORDER_FILE, "v2");

    let result = h.engine.update().unwrap();
    let UpdateResponse::Updated {
        changes,
        risk_level,
        stale_outputs,
        impact,
        ..
    } = result
    else {
        panic!("expected an incremental update");
    };
    assert_eq!(changes.modified, vec![ORDER_FILE]);
    assert_eq!(risk_level, RiskLevel::Medium);
    assert_eq!(impact.affected_flows.len(), 2);
    assert!(stale_outputs.contains(&SUMMARY_OUTPUT.to_string()));
    assert!(stale_outputs.contains(&"flows/create-order.md".to_string()));
    assert!(stale_outputs.contains(&"flows/get-order.md".to_string()));

    // the new digest was recorded
    assert!(matches!(h.engine.update().unwrap(), UpdateResponse::UpToDate { .. }));
}

#[test]
fn test_update_forgets_deleted_files() {
    let h = harness();
    h.engine.scan().unwrap();

    let remaining = shop_classes()
        .into_iter()
        .filter(|c| c.file_path != AUDIT_FILE)
        .collect();
    h.source.set(snapshot(shop_projects(), remaining));
    h.files.remove(AUDIT_FILE);

    let result = h.engine.update().unwrap();
    let UpdateResponse::Updated { changes, .. } = result else {
        panic!("expected an incremental update");
    };
    assert_eq!(changes.deleted, vec![AUDIT_FILE]);

    let state = h.store.current().unwrap();
    assert!(!state.files.contains_key(AUDIT_FILE));
    assert!(!state.kb_outputs[SUMMARY_OUTPUT].contains(&AUDIT_FILE.to_string()));
}

#[test]
fn test_refresh_rebuilds_state() {
    let h = harness();
    h.engine.scan().unwrap();
    h.files.write(ORDER_FILE, "v2");

    h.engine.refresh().unwrap();
    assert_eq!(h.store.save_count(), 2);
    assert!(matches!(h.engine.update().unwrap(), UpdateResponse::UpToDate { .. }));
}

#[test]
fn test_impact_never_writes_state() {
    let h = harness();
    h.engine.scan().unwrap();
    let saves = h.store.save_count();

    let report = h.engine.impact(&[ORDER_FILE.to_string()], None).unwrap();
    assert_eq!(report.affected_flows.len(), 2);
    assert!(
        report
            .affected_kb_docs
            .iter()
            .any(|d| d.name == "flows/create-order.md" && d.reason == "Source files changed")
    );
    assert_eq!(h.store.save_count(), saves);
}

#[test]
fn test_missing_projects_is_an_error() {
    let h = harness();
    h.source.set(snapshot(Vec::new(), shop_classes()));

    let err = h.engine.scan().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::NoProjects { .. })
    ));
}

#[test]
fn test_inspect_by_short_name() {
    let h = harness();
    let result = h.engine.inspect("CreateOrderHandler", None).unwrap();

    assert_eq!(result.matches.len(), 1);
    let handler = &result.matches[0];
    assert_eq!(handler.class, "Shop.UseCases.Orders.CreateOrderHandler");
    assert_eq!(handler.project, "Shop.UseCases");
    assert!(handler.dependencies.contains(&"Shop.Core.Interfaces.IRepository".to_string()));
    assert!(handler.dependencies.contains(&"Shop.UseCases.Orders.CreateOrderCommand".to_string()));
    assert!(handler.downstream.contains(&"Shop.Core.Interfaces.IRepository".to_string()));
}

#[test]
fn test_worker_pool_gives_same_scan() {
    let config = EngineConfig {
        workers: 2,
        ..EngineConfig::default()
    };
    let pooled = harness_with(config).engine.scan().unwrap();
    let direct = harness().engine.scan().unwrap();

    assert_eq!(pooled.graph.node_count, direct.graph.node_count);
    assert_eq!(pooled.graph.edge_count, direct.graph.edge_count);
    assert_eq!(pooled.outputs, direct.outputs);
}

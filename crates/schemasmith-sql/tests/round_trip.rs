//! Emitted artifacts read back as deployed DDL and compared with the graph

use pretty_assertions::assert_eq;
use schemasmith_core::model::{Attribute, Entity, Module};
use schemasmith_core::{
    BuildOptions, Config, DataType, DriftCategory, LogicalSchemaModel, ParityCheck, ProfileSnapshot, SchemaGraph,
    TighteningOptions, UnsupportedCheck,
};
use schemasmith_emit::Emitter;
use schemasmith_engine::{DecisionEngine, DriftDetector, GraphBuilder};
use schemasmith_sql::DdlReader;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Emit the fixture model into a fresh directory
fn emitted() -> (SchemaGraph, TempDir) {
    let model = LogicalSchemaModel::from_json(include_str!("fixtures/model.json")).unwrap();
    let snapshot = ProfileSnapshot::from_json(include_str!("fixtures/snapshot.json")).unwrap();
    let tightening = TighteningOptions::default();
    let build = BuildOptions::for_tightening(&tightening);

    let decisions = DecisionEngine::decide(&model, &snapshot, &tightening);
    let graph = GraphBuilder::build(&model, &decisions, &build).unwrap();
    let out = TempDir::new().unwrap();
    Emitter::new(build).emit(&graph, &decisions, out.path()).unwrap();
    (graph, out)
}

#[test]
fn test_emitted_schema_has_no_drift() {
    init_tracing();
    let (graph, out) = emitted();

    let deployed = DdlReader::from_config(&Config::default()).read_dir(out.path()).unwrap();
    let report = DriftDetector::default().compare(&graph, &deployed);

    assert_eq!(deployed.tables.len(), graph.len());
    assert!(report.is_clean(), "{}", report.render_summary());
    assert_eq!(report.summary.tables_checked, 3);
    assert_eq!(report.parity.len(), DriftCategory::ALL.len() * graph.len());

    let order = deployed.find("dbo", "Order").unwrap();
    assert_eq!(order.foreign_keys.len(), 1);
    assert_eq!(order.foreign_keys[0].on_delete.as_deref(), Some("CASCADE"));
    assert_eq!(
        report.unsupported.iter().map(|n| n.check).collect::<Vec<_>>(),
        vec![UnsupportedCheck::DataTypeCanonicalization]
    );
}

#[test]
fn test_hand_edited_deployment_drifts() {
    init_tracing();
    let (graph, out) = emitted();
    std::fs::write(
        out.path().join("Sales/Customer.sql"),
        r#"CREATE TABLE "dbo"."Customer" (
    "Id" BIGINT PRIMARY KEY,
    "Email" VARCHAR(250) NOT NULL,
    "Name" VARCHAR(100),
    "Nickname" TEXT
);
"#,
    )
    .unwrap();

    let deployed = DdlReader::postgres().read_dir(out.path()).unwrap();
    let report = DriftDetector::default().compare(&graph, &deployed);

    assert!(report.has_errors());
    let columns = |category| {
        report
            .entries(category)
            .map(|d| d.column.clone().unwrap_or_default())
            .collect::<Vec<_>>()
    };
    assert_eq!(columns(DriftCategory::MissingColumn), vec!["IsActive"]);
    assert_eq!(columns(DriftCategory::ExtraColumn), vec!["Nickname"]);
    assert_eq!(columns(DriftCategory::NullabilityMismatch), vec!["Id", "Name", "Email"]);
    assert_eq!(columns(DriftCategory::PrimaryKeyMismatch), vec!["Id"]);
    assert_eq!(report.entries(DriftCategory::ColumnOrderDifference).count(), 1);

    let customer_parity: Vec<_> = report
        .parity
        .iter()
        .filter(|p| p.table == "dbo.Customer")
        .map(|p| p.check)
        .collect();
    assert_eq!(customer_parity, vec![ParityCheck::TablePresent]);
    assert!(report
        .unsupported
        .iter()
        .any(|n| n.check == UnsupportedCheck::InlinePrimaryKey && n.column.as_deref() == Some("Id")));
}

#[test]
fn test_missing_table_is_reported_once() {
    let (graph, out) = emitted();
    std::fs::remove_file(out.path().join("Catalog/Product.sql")).unwrap();

    let deployed = DdlReader::postgres().read_dir(out.path()).unwrap();
    let report = DriftDetector::default().compare(&graph, &deployed);

    let missing: Vec<_> = report.entries(DriftCategory::MissingTable).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].table, "dbo.Product");
    assert_eq!(report.summary.total, 1);
    assert!(report.parity.iter().all(|p| p.table != "dbo.Product"));
}

#[test]
fn test_blank_defaults_round_trip() {
    let model = LogicalSchemaModel::new(vec![Module::new("Sales").with_entity(
        Entity::new("T")
            .with_attribute(Attribute::new("Id", DataType::Integer).identifier())
            .with_attribute(Attribute::new("N", DataType::Integer).with_default(""))
            .with_attribute(Attribute::new("Flag", DataType::Boolean).with_default("1")),
    )]);
    let snapshot = ProfileSnapshot::from_json(include_str!("fixtures/snapshot.json")).unwrap();
    let tightening = TighteningOptions::default();
    let build = BuildOptions::for_tightening(&tightening);
    let decisions = DecisionEngine::decide(&model, &snapshot, &tightening);
    let graph = GraphBuilder::build(&model, &decisions, &build).unwrap();
    let out = TempDir::new().unwrap();
    Emitter::new(build).emit(&graph, &decisions, out.path()).unwrap();

    let deployed = DdlReader::postgres().read_dir(out.path()).unwrap();
    let report = DriftDetector::default().compare(&graph, &deployed);

    assert!(report.is_clean(), "{}", report.render_summary());
    let table = deployed.find("dbo", "T").unwrap();
    assert_eq!(table.column("N").unwrap().default_value, None);
    assert_eq!(table.column("Flag").unwrap().default_value.as_deref(), Some("TRUE"));
}

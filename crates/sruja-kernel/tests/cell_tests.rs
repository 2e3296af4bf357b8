//! Cell Tests
//!
//! This test suite verifies the read-only cell types and the result cache.
//!
//! ## Scenarios Covered
//!
//! 1. A bare diagram cell uses the configured default format
//! 2. Scoped diagrams only see elements under the root
//! 3. Unknown formats and missing scope roots are reported
//! 4. Query cells go through the registered engine
//! 5. Read-only cells are served from the cache until the store changes
//! 6. Disabled cache never serves hits
//! 7. Validation cells summarize and report findings as diagnostics
//! 8. Validation scopes narrow the findings
//! 9. Lifecycle rules see the FSMs loaded by DSL cells
//! 10. Simulation cells replay events through the lifecycle
//! 11. Out-of-order events become warnings, unknown entities errors
//! 12. Symbols follow the cells that declare them
//! 13. A config file on disk drives the kernel

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::io::Write;

use common::{kernel, payment_source, shop_source, systems_source};
use sruja_kernel::cell::OUTPUT_SIMULATION;
use sruja_kernel::{CellType, Kernel, KernelConfig, Severity, SymbolKind};

// S1: a bare diagram cell uses the configured default format
#[test]
fn test_diagram_default_format() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    let result = k.execute_cell("d", CellType::Diagram, "");
    assert!(result.success, "{:?}", result.error);
    let output = &result.outputs[0];
    assert_eq!(output.output_type, "text/mermaid");
    assert!(output.as_text().unwrap().contains("mermaid: Shop.API"));
}

// S2: scoped diagrams only see elements under the root
#[test]
fn test_diagram_container_scope() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    let result = k.execute_cell("d", CellType::Diagram, "diagram d2 system Shop");
    let text = result.outputs[0].as_text().unwrap();
    assert_eq!(result.outputs[0].output_type, "text/d2");
    assert!(text.contains("d2: Shop.Web"));
    assert!(!text.contains("Customer"));

    let container = k.execute_cell("d", CellType::Diagram, "diagram d2 container Shop.API");
    assert_eq!(container.outputs[0].as_text().unwrap(), "d2: Shop.API");
}

// S3: unknown formats and missing scope roots are reported
#[test]
fn test_diagram_errors() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    let format = k.execute_cell("d", CellType::Diagram, "diagram plantuml");
    assert!(!format.success);
    assert_eq!(
        format.error.as_deref(),
        Some("diagram format 'plantuml' is not configured")
    );
    assert_eq!(format.diagnostics[0].code.as_deref(), Some("ERR_NOT_CONFIGURED"));

    let scope = k.execute_cell("d", CellType::Diagram, "diagram container Shop");
    assert!(!scope.success);
    assert!(scope.error.unwrap().contains("'Shop' not found"));
}

// S4: query cells go through the registered engine
#[test]
fn test_query_cell() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    let result = k.execute_cell("q", CellType::Query, "count");
    assert_eq!(result.outputs[0].as_text(), Some("5"));

    let bad = k.execute_cell("q", CellType::Query, "select *");
    assert!(!bad.success);
    assert!(bad.error.unwrap().contains("unsupported query"));

    let bare = Kernel::default().execute_cell("q", CellType::Query, "count");
    assert_eq!(bare.error.as_deref(), Some("query engine is not configured"));
}

// S5: read-only cells are served from the cache until the store changes
#[test]
fn test_result_cache_hits_and_invalidation() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    let first = k.execute_cell("d1", CellType::Diagram, "diagram");
    assert!(!first.cached);
    let second = k.execute_cell("d2", CellType::Diagram, "diagram");
    assert!(second.cached);
    assert_eq!(second.outputs[0].cell_id, "d2");
    assert_eq!(second.outputs[0].data, first.outputs[0].data);

    k.execute_cell("c2", CellType::Dsl, &systems_source(&[("Billing", "")]));
    let third = k.execute_cell("d1", CellType::Diagram, "diagram");
    assert!(!third.cached);
    assert!(third.outputs[0].as_text().unwrap().contains("mermaid: Billing"));

    let stats = k.cache_stats();
    assert_eq!(stats.hits, 1);
}

// S6: disabled cache never serves hits
#[test]
fn test_disabled_cache() {
    let config = KernelConfig::from_toml_str("[cache]\nenabled = false\n").unwrap();
    let k = Kernel::builder().config(config).build();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    k.execute_cell("v", CellType::Validation, "validate");
    assert!(!k.execute_cell("v", CellType::Validation, "validate").cached);
}

// S7: validation cells summarize and report findings as diagnostics
#[test]
fn test_validation_cell() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    let clean = k.execute_cell("v", CellType::Validation, "validate");
    assert!(clean.success);
    assert_eq!(clean.outputs[0].as_text(), Some("No issues found."));

    let ghost = r#"{"architecture": {"relations": [{"from": "Shop.API", "to": "Ghost"}]}}"#;
    k.execute_cell("c2", CellType::Dsl, ghost);
    let dirty = k.execute_cell("v", CellType::Validation, "validate");
    assert!(dirty.success);
    assert!(dirty.has_errors());
    assert_eq!(dirty.diagnostics[0].code.as_deref(), Some("dangling-relation"));
    assert_eq!(dirty.diagnostics[0].element_id.as_deref(), Some("Ghost"));
    assert!(dirty.outputs[0].as_text().unwrap().starts_with("1 error(s)"));
}

// S8: validation scopes narrow the findings
#[test]
fn test_validation_scopes() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());
    k.execute_cell("c2", CellType::Dsl, &systems_source(&[("Lonely", "")]));

    let shop = k.execute_cell("v", CellType::Validation, "validate system Shop");
    assert!(shop.diagnostics.is_empty());

    let lonely = k.execute_cell("v", CellType::Validation, "validate system Lonely");
    assert_eq!(lonely.diagnostics.len(), 1);
    assert_eq!(lonely.diagnostics[0].severity, Severity::Info);

    let missing = k.execute_cell("v", CellType::Validation, "validate container Lonely");
    assert_eq!(missing.diagnostics[0].message, "container 'Lonely' not found");

    let bad = k.execute_cell("v", CellType::Validation, "validate galaxy X");
    assert!(!bad.success);
}

// S9: lifecycle rules see the FSMs loaded by DSL cells
#[test]
fn test_validation_of_lifecycles() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &payment_source());

    let entity = k.execute_cell("v", CellType::Validation, "validate entity Payment");
    assert!(entity.diagnostics.is_empty());

    let broken = r#"{"architecture": {"events": [
        {"name": "PaymentRefunded",
         "lifecycle_effect": {"entity": "Payment", "from": "COMPLETED", "to": "REFUNDED"}}
    ]}}"#;
    k.execute_cell("c2", CellType::Dsl, broken);
    let event = k.execute_cell("v", CellType::Validation, "validate event PaymentRefunded");
    assert!(!event.diagnostics.is_empty());
    assert!(event
        .diagnostics
        .iter()
        .all(|d| d.element_id.as_deref() == Some("PaymentRefunded")));
}

// S10: simulation cells replay events through the lifecycle
#[test]
fn test_simulation_cell() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &payment_source());

    let result = k.execute_cell(
        "s",
        CellType::Simulation,
        "simulate Payment events: PaymentAuthorized, PaymentCompleted",
    );
    assert!(result.success, "{:?}", result.error);
    assert!(result.diagnostics.is_empty());
    assert_eq!(
        result.outputs[0].as_text(),
        Some("Payment: PENDING -> AUTHORIZED -> COMPLETED (final state COMPLETED)")
    );
    let report = &result.outputs[1];
    assert_eq!(report.output_type, OUTPUT_SIMULATION);
    assert_eq!(report.data["finalState"], "COMPLETED");
}

// S11: out-of-order events become warnings, unknown entities errors
#[test]
fn test_simulation_cell_problems() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &payment_source());

    let skipped = k.execute_cell("s", CellType::Simulation, "simulate Payment events: PaymentCompleted");
    assert!(skipped.success);
    assert_eq!(skipped.diagnostics[0].severity, Severity::Warning);
    assert_eq!(skipped.diagnostics[0].element_id.as_deref(), Some("Payment"));

    let unknown = k.execute_cell("s", CellType::Simulation, "simulate Order");
    assert!(!unknown.success);
    assert!(unknown.has_errors());
}

// S12: symbols follow the cells that declare them
#[test]
fn test_symbols_and_references() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());
    k.execute_cell("c2", CellType::Dsl, &payment_source());

    let api = k.lookup_symbol("Shop.API").unwrap();
    assert_eq!(api.kind, SymbolKind::Container);
    assert_eq!(api.cell_id, "c1");
    assert_eq!(k.lookup_symbol("Payment").unwrap().kind, SymbolKind::Entity);

    let names: Vec<String> = k.complete_symbols("Shop.").into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["Shop.API", "Shop.DB", "Shop.Web"]);

    let refs = k.find_references("Shop.API");
    assert_eq!(refs.len(), 2);
    assert!(refs.iter().all(|r| r.context.starts_with("relation")));
    assert!(!k.find_references("Payment").is_empty());

    k.execute_cell("c1", CellType::Dsl, "");
    assert!(k.lookup_symbol("Shop.API").is_none());
    assert!(k.symbols_in_cell("c1").is_empty());
}

// S13: a config file on disk drives the kernel
#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[diagram]\ndefault_format = \"d2\"\n\n[ir]\ndefault_architecture_name = \"Estate\"").unwrap();

    let config = KernelConfig::load(file.path()).unwrap();
    let k = Kernel::builder()
        .config(config)
        .diagram_compiler(common::ListingCompiler { format: "d2" })
        .build();

    assert_eq!(k.store().get_model().architecture.name, "Estate");
    let result = k.execute_cell("d", CellType::Diagram, "diagram");
    assert_eq!(result.outputs[0].output_type, "text/d2");
    assert_eq!(k.diagram_formats(), vec!["d2"]);
}

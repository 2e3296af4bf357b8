//! Execution Tests
//!
//! This test suite verifies DSL cell execution, history and IR exchange.
//!
//! ## Scenarios Covered
//!
//! 1. Executing the same DSL cell twice equals executing it once
//! 2. Editing a cell retracts what it used to declare
//! 3. A failing cell loses its old contributions and reports the error
//! 4. Duplicate ids are a transform error, not a panic
//! 5. DSL cells keep lifecycles in step with their source
//! 6. A configured cap bounds history per cell, and reset clears it
//! 7. By default every execution is kept until reset
//! 8. Exported IR imports back into a fresh kernel
//! 9. A malformed IR document leaves the store untouched
//! 10. Markdown and AI cells never touch the store
//! 11. Reset clears the model but keeps the configured architecture name
//! 12. Re-executing a cell any number of times equals executing it once (property)

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{element_ids, kernel, payment_source, shop_source, systems_source};
use proptest::prelude::*;
use sruja_kernel::{CellType, KernelConfig, Severity};

// S1: executing the same DSL cell twice equals executing it once
#[test]
fn test_reexecution_is_idempotent() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());
    let once = k.store().get_model().architecture;

    let result = k.execute_cell("c1", CellType::Dsl, &shop_source());
    assert!(result.success);
    let twice = k.store().get_model().architecture;
    assert_eq!(once.elements, twice.elements);
    assert_eq!(once.relations, twice.relations);
}

// S2: editing a cell retracts what it used to declare
#[test]
fn test_edited_cell_replaces_its_contributions() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &systems_source(&[("A", ""), ("B", "")]));
    k.execute_cell("c2", CellType::Dsl, &systems_source(&[("C", "")]));

    k.execute_cell("c1", CellType::Dsl, &systems_source(&[("A", "edited")]));

    assert_eq!(element_ids(&k), vec!["A", "C"]);
    assert_eq!(k.store().element("A").unwrap().description, "edited");
}

// S3: a failing cell loses its old contributions and reports the error
#[test]
fn test_failed_cell_is_retracted_and_reported() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &systems_source(&[("A", "")]));

    let result = k.execute_cell("c1", CellType::Dsl, "{\"architecture\": ");
    assert!(!result.success);
    assert!(result.ir_changed);
    assert_eq!(result.diagnostics[0].severity, Severity::Error);
    assert!(element_ids(&k).is_empty());
}

// S4: duplicate ids are a transform error, not a panic
#[test]
fn test_transform_error_is_a_diagnostic() {
    let k = kernel();
    let result = k.execute_cell("c1", CellType::Dsl, &systems_source(&[("A", ""), ("A", "")]));
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("transform error"));
    assert_eq!(
        result.diagnostics[0].code.as_deref(),
        Some("ERR_TRANSFORM_FAILED")
    );
}

// S5: DSL cells keep lifecycles in step with their source
#[test]
fn test_dsl_cell_rebuilds_lifecycles() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &payment_source());
    assert!(k.simulation().fsm("Payment").is_some());
    assert!(k.simulation().effect("PaymentAuthorized").is_some());

    k.execute_cell("c1", CellType::Dsl, &systems_source(&[("A", "")]));
    assert!(k.simulation().fsm("Payment").is_none());
    assert!(k.simulation().list_effects().is_empty());
}

// S6: a configured cap bounds history per cell, and reset clears it
#[test]
fn test_history_is_bounded_and_reset() {
    let mut config = KernelConfig::default();
    config.history.max_records_per_cell = 2;
    let k = sruja_kernel::Kernel::builder().config(config).build();

    for description in ["one", "two", "three"] {
        k.execute_cell("c1", CellType::Dsl, &systems_source(&[("A", description)]));
    }
    let history = k.cell_history("c1");
    assert_eq!(history.len(), 2);
    assert!(history[1].source.contains("three"));
    assert!(history[1].result.success);

    k.reset();
    assert!(k.cell_history("c1").is_empty());
    assert!(k.executed_cells().is_empty());
}

// S7: by default every execution is kept until reset
#[test]
fn test_history_is_unbounded_by_default() {
    let k = kernel();
    for i in 0..40 {
        k.execute_cell("c1", CellType::Dsl, &systems_source(&[("A", &i.to_string())]));
    }
    let history = k.cell_history("c1");
    assert_eq!(history.len(), 40);
    assert!(history[0].source.contains("\"0\""));
}

// S8: exported IR imports back into a fresh kernel
#[test]
fn test_export_import_round_trip() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());
    let ir = k.export_ir().unwrap();

    let other = kernel();
    other.import_ir(&ir).unwrap();
    assert_eq!(element_ids(&other), element_ids(&k));
    assert_eq!(other.store().get_model().architecture.name, "Shop");

    // Contributions keep their cell attribution across the round trip
    other.execute_cell("c1", CellType::Dsl, "");
    assert!(element_ids(&other).is_empty());
}

// S9: a malformed IR document leaves the store untouched
#[test]
fn test_invalid_import_is_rejected() {
    let k = kernel();
    k.execute_cell("c1", CellType::Dsl, &shop_source());
    let version = k.store().get_version();

    assert!(k.import_ir("{\"version\": 1}").is_err());
    assert_eq!(k.store().get_version(), version);
}

// S10: markdown and AI cells never touch the store
#[test]
fn test_markdown_and_ai_cells() {
    let k = kernel();
    let md = k.execute_cell("m", CellType::Markdown, "# Notes");
    assert!(md.success);
    assert!(!md.ir_changed);

    let ai = k.execute_cell("a", CellType::Ai, "design me a shop");
    assert!(ai.success);
    assert_eq!(ai.diagnostics[0].severity, Severity::Hint);
}

// S11: reset clears the model but keeps the configured architecture name
#[test]
fn test_reset_uses_configured_name() {
    let mut config = KernelConfig::default();
    config.ir.default_architecture_name = "Landscape".to_string();
    let k = sruja_kernel::Kernel::builder().config(config).build();
    k.execute_cell("c1", CellType::Dsl, &shop_source());

    k.reset();
    let model = k.store().get_model();
    assert!(model.is_empty());
    assert_eq!(model.architecture.name, "Landscape");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_reexecution_is_idempotent(
        systems in prop::collection::btree_map("[A-E]", "[xyz]{0,2}", 0..5),
        repeats in 1usize..4,
    ) {
        let systems: Vec<(&str, &str)> =
            systems.iter().map(|(id, d)| (id.as_str(), d.as_str())).collect();
        let source = systems_source(&systems);

        let once = kernel();
        once.execute_cell("c1", CellType::Dsl, &source);

        let many = kernel();
        for _ in 0..repeats {
            many.execute_cell("c1", CellType::Dsl, &source);
        }

        prop_assert_eq!(
            once.store().get_model().architecture.elements,
            many.store().get_model().architecture.elements
        );
    }
}

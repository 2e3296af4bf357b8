//! Logging Facility Tests
//!
//! This test suite verifies the op boundary macros and their captured fields.
//!
//! ## Scenarios Covered
//!
//! 1. `log_op_start!` emits a start event
//! 2. `log_op_end!` carries the duration
//! 3. `log_op_error!` includes the error code
//! 4. Snapshot operations emit boundary events

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use sruja_core::core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use sruja_core::errors::KernelError;
use sruja_core::logging_facility::test_capture::init_test_capture;
use sruja_core::{log_op_end, log_op_error, log_op_start};
use sruja_core::{ArchitectureStore, SnapshotManager};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let found = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    assert!(found >= 1, "Should have captured at least one start event");
}

#[test]
fn test_log_op_end_carries_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events();
    let end_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .collect();
    assert_eq!(end_events.len(), 1);
    assert_eq!(end_events[0].fields.get("duration_ms"), Some(&"42".to_string()));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = KernelError::VariantNotFound {
        name: "v1".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(
        error_event.fields.get("err.code"),
        Some(&"ERR_NOT_FOUND".to_string())
    );
}

#[test]
fn test_snapshot_operations_emit_boundary_events() {
    let capture = init_test_capture();
    let store = Arc::new(ArchitectureStore::new());
    let snapshots = SnapshotManager::new(store);

    snapshots
        .create_snapshot("logging_boundary_snapshot", "")
        .unwrap();
    assert!(snapshots.load_snapshot("logging_boundary_missing").is_err());

    let for_snapshot = |event: &str, name: &str| {
        capture.count_events(|e| {
            e.event.as_deref() == Some(event)
                && e.fields.get("snapshot").map(String::as_str) == Some(name)
        })
    };
    assert_eq!(for_snapshot(EVENT_START, "logging_boundary_snapshot"), 1);
    assert_eq!(for_snapshot(EVENT_END, "logging_boundary_snapshot"), 1);
    assert_eq!(for_snapshot(EVENT_END_ERROR, "logging_boundary_missing"), 1);
}

//! Kernel Logging Tests
//!
//! This test suite verifies the events emitted around kernel operations.
//!
//! ## Scenarios Covered
//!
//! 1. A successful execution logs start and end
//! 2. A failed execution logs an error event with its code
//! 3. IR imports are logged as their own operation

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{kernel, systems_source};
use sruja_core::core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_CELL_ID};
use sruja_core::logging_facility::test_capture::init_test_capture;
use sruja_kernel::CellType;

// S1: a successful execution logs start and end
#[test]
fn test_execute_cell_logs_start_and_end() {
    let capture = init_test_capture();
    let k = kernel();

    k.execute_cell("log-ok-cell", CellType::Dsl, &systems_source(&[("A", "")]));

    let events = capture.with_field(FIELD_CELL_ID, "log-ok-cell");
    let phases: Vec<&str> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some("execute_cell"))
        .filter_map(|e| e.event.as_deref())
        .collect();
    assert_eq!(phases, vec![EVENT_START, EVENT_END]);
}

// S2: a failed execution logs an error event with its code
#[test]
fn test_execute_cell_logs_error_code() {
    let capture = init_test_capture();
    let k = kernel();

    k.execute_cell("log-bad-cell", CellType::Dsl, "not json");

    let events = capture.with_field(FIELD_CELL_ID, "log-bad-cell");
    let error = events
        .iter()
        .find(|e| e.is("execute_cell", EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(error.field("err.code"), Some("ERR_PARSE_FAILED"));
}

// S3: IR imports are logged as their own operation
#[test]
fn test_import_ir_is_logged() {
    let capture = init_test_capture();
    let k = kernel();

    let _ = k.import_ir("{}");
    capture.assert_event_exists("import_ir", EVENT_START);
}

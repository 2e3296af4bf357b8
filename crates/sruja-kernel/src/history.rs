//! Execution history, keyed by cell id
//!
//! Retained until the kernel is reset. `max_records_per_cell = 0` (the
//! default) keeps every record; a positive cap turns each cell's history
//! into a ring where the oldest records go first.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use crate::cell::ExecutionResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub source: String,
    /// Store version after the execution
    pub store_version: u64,
    pub result: ExecutionResult,
}

#[derive(Debug)]
pub struct CellHistory {
    /// `None` keeps everything
    max_records_per_cell: Option<usize>,
    records: RwLock<BTreeMap<String, VecDeque<HistoryRecord>>>,
}

impl CellHistory {
    pub fn new(max_records_per_cell: usize) -> Self {
        Self {
            max_records_per_cell: (max_records_per_cell > 0).then_some(max_records_per_cell),
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn record(&self, record: HistoryRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let cell = records
            .entry(record.result.cell_id.clone())
            .or_default();
        cell.push_back(record);
        if let Some(max) = self.max_records_per_cell {
            while cell.len() > max {
                cell.pop_front();
            }
        }
    }

    /// Records of one cell, oldest first
    pub fn for_cell(&self, cell_id: &str) -> Vec<HistoryRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records
            .get(cell_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, cell_id: &str) -> Option<HistoryRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(cell_id).and_then(|r| r.back().cloned())
    }

    /// Ids of every cell with history, sorted
    pub fn cells(&self) -> Vec<String> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

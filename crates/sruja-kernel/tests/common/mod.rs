#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use sruja_core::model::Model;
use sruja_core::Result;
use sruja_kernel::{DiagramCompiler, DiagramScope, Kernel, QueryEngine};

/// Renders one line per element in scope, `format: id`
pub struct ListingCompiler {
    pub format: &'static str,
}

impl DiagramCompiler for ListingCompiler {
    fn format(&self) -> &str {
        self.format
    }

    fn mime_type(&self) -> &str {
        match self.format {
            "d2" => "text/d2",
            _ => "text/mermaid",
        }
    }

    fn compile(&self, model: &Model, scope: &DiagramScope) -> Result<String> {
        Ok(model
            .elements()
            .iter()
            .filter(|e| scope.contains(e))
            .map(|e| format!("{}: {}", self.format, e.id))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Answers `count` with the number of elements
pub struct CountingQueries;

impl QueryEngine for CountingQueries {
    fn evaluate(&self, model: &Model, query: &str) -> Result<String> {
        match query {
            "count" => Ok(model.elements().len().to_string()),
            other => Err(sruja_core::KernelError::InvalidCommand {
                message: format!("unsupported query '{other}'"),
            }),
        }
    }
}

#[allow(dead_code)]
pub fn kernel() -> Kernel {
    Kernel::builder()
        .diagram_compiler(ListingCompiler { format: "mermaid" })
        .diagram_compiler(ListingCompiler { format: "d2" })
        .query_engine(CountingQueries)
        .build()
}

#[allow(dead_code)]
pub fn shop_source() -> String {
    json!({
        "architecture": {
            "name": "Shop",
            "persons": [{"id": "Customer", "name": "Customer"}],
            "systems": [{
                "id": "Shop",
                "name": "Shop",
                "containers": [
                    {"id": "API", "name": "API", "technology": "Rust"},
                    {"id": "Web", "name": "Web"}
                ],
                "data_stores": [{"id": "DB", "name": "Orders DB"}]
            }],
            "relations": [
                {"from": "Customer", "to": "Shop.Web"},
                {"from": "Shop.Web", "to": "Shop.API"},
                {"from": "Shop.API", "to": "Shop.DB", "type": "writes"}
            ]
        }
    })
    .to_string()
}

#[allow(dead_code)]
pub fn payment_source() -> String {
    json!({
        "architecture": {
            "entities": [{
                "name": "Payment",
                "lifecycle": {"transitions": [
                    {"from": "PENDING", "to": "AUTHORIZED"},
                    {"from": "AUTHORIZED", "to": "COMPLETED"},
                    {"from": "AUTHORIZED", "to": "FAILED"}
                ]}
            }],
            "events": [
                {"name": "PaymentAuthorized",
                 "lifecycle_effect": {"entity": "Payment", "from": "PENDING", "to": "AUTHORIZED"}},
                {"name": "PaymentCompleted",
                 "lifecycle_effect": {"entity": "Payment", "from": "AUTHORIZED", "to": "COMPLETED"}}
            ]
        }
    })
    .to_string()
}

/// A DSL source declaring only systems with the given ids and descriptions
#[allow(dead_code)]
pub fn systems_source(systems: &[(&str, &str)]) -> String {
    let systems: Vec<_> = systems
        .iter()
        .map(|(id, description)| json!({"id": id, "name": id, "description": description}))
        .collect();
    json!({"architecture": {"systems": systems}}).to_string()
}

#[allow(dead_code)]
pub fn element_ids(kernel: &Kernel) -> Vec<String> {
    let mut ids: Vec<String> = kernel
        .store()
        .get_model()
        .elements()
        .iter()
        .map(|e| e.id.clone())
        .collect();
    ids.sort();
    ids
}

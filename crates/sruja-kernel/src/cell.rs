//! Cell execution results
//!
//! Every call to `Kernel::execute_cell` produces an [`ExecutionResult`],
//! including failed ones: recoverable errors become an `error` diagnostic
//! plus the `error` string, never a panic or an `Err` to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sruja_core::model::SourceLocation;
use sruja_core::KernelError;
use std::str::FromStr;

// Output types (mime-like)
pub const OUTPUT_TEXT: &str = "text";
pub const OUTPUT_MARKDOWN: &str = "text/markdown";
pub const OUTPUT_JSON: &str = "application/json";
pub const OUTPUT_IR: &str = "application/sruja-ir+json";
pub const OUTPUT_SIMULATION: &str = "application/sruja-simulation+json";
pub const OUTPUT_MERGE: &str = "application/sruja-merge+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Dsl,
    Query,
    Diagram,
    Validation,
    Simulation,
    Ai,
    Markdown,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Dsl => "dsl",
            CellType::Query => "query",
            CellType::Diagram => "diagram",
            CellType::Validation => "validation",
            CellType::Simulation => "simulation",
            CellType::Ai => "ai",
            CellType::Markdown => "markdown",
        }
    }

    /// Cells whose output depends only on their source and the store
    pub fn is_cacheable(&self) -> bool {
        matches!(
            self,
            CellType::Diagram | CellType::Query | CellType::Validation
        )
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dsl" | "sruja" => Ok(CellType::Dsl),
            "query" => Ok(CellType::Query),
            "diagram" => Ok(CellType::Diagram),
            "validation" | "validate" => Ok(CellType::Validation),
            "simulation" | "simulate" => Ok(CellType::Simulation),
            "ai" => Ok(CellType::Ai),
            "markdown" | "md" => Ok(CellType::Markdown),
            other => Err(KernelError::InvalidCommand {
                message: format!("unknown cell type '{other}'"),
            }),
        }
    }
}

/// Diagnostic severity; the declaration order is the display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Validation rule or error code that produced the diagnostic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            element_id: None,
            location: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn hint(message: impl Into<String>) -> Self {
        Self::new(Severity::Hint, message)
    }

    pub fn with_element(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<&KernelError> for Diagnostic {
    fn from(err: &KernelError) -> Self {
        let ex: sruja_core::ExError = err.clone().into();
        let diagnostic = Diagnostic::error(err.to_string()).with_code(ex.code());
        match err {
            KernelError::Parse { location, .. } => diagnostic.with_location(location.clone()),
            _ => match ex.entity_id() {
                Some(id) => diagnostic.with_element(id),
                None => diagnostic,
            },
        }
    }
}

/// Stable sort: error, warning, info, hint; equal severities keep their order
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| d.severity);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellOutput {
    pub cell_id: String,
    pub output_type: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    pub timestamp: DateTime<Utc>,
}

impl CellOutput {
    pub fn new(cell_id: impl Into<String>, output_type: impl Into<String>, data: Value) -> Self {
        Self {
            cell_id: cell_id.into(),
            output_type: output_type.into(),
            data,
            diagnostics: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn text(cell_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(cell_id, OUTPUT_TEXT, Value::String(text.into()))
    }

    pub fn markdown(cell_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(cell_id, OUTPUT_MARKDOWN, Value::String(text.into()))
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// The payload as text, when it is a string
    pub fn as_text(&self) -> Option<&str> {
        self.data.as_str()
    }
}

/// Outcome of one cell execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: String,
    pub cell_id: String,
    pub cell_type: CellType,
    pub success: bool,
    pub outputs: Vec<CellOutput>,
    pub diagnostics: Vec<Diagnostic>,
    pub ir_changed: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the outputs were served from the result cache
    #[serde(default)]
    pub cached: bool,
}

impl ExecutionResult {
    pub fn new(cell_id: impl Into<String>, cell_type: CellType) -> Self {
        Self {
            execution_id: uuid::Uuid::now_v7().to_string(),
            cell_id: cell_id.into(),
            cell_type,
            success: true,
            outputs: Vec::new(),
            diagnostics: Vec::new(),
            ir_changed: false,
            timestamp: Utc::now(),
            error: None,
            cached: false,
        }
    }

    pub fn push_output(&mut self, output: CellOutput) {
        self.outputs.push(output);
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        let output = CellOutput::text(self.cell_id.clone(), text);
        self.outputs.push(output);
    }

    pub fn push_json(&mut self, output_type: &str, data: Value) {
        let output = CellOutput::new(self.cell_id.clone(), output_type, data);
        self.outputs.push(output);
    }

    /// Mark the execution failed, recording the error as a diagnostic
    pub fn fail(&mut self, err: &KernelError) {
        self.success = false;
        self.diagnostics.push(Diagnostic::from(err));
        self.error = Some(err.to_string());
    }

    /// Mark the execution failed with a plain message
    pub fn fail_with(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.success = false;
        self.diagnostics.push(Diagnostic::error(message.clone()));
        self.error = Some(message);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Sort diagnostics, including those attached to outputs
    pub fn finish(mut self) -> Self {
        sort_diagnostics(&mut self.diagnostics);
        for output in &mut self.outputs {
            sort_diagnostics(&mut output.diagnostics);
        }
        self
    }
}

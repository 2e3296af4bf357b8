//! Cell execution kernel
//!
//! ## Responsibilities
//!
//! - Retract a cell's previous contributions before every execution
//! - Dispatch magic commands, then the cell type
//! - Keep simulation lifecycles and the symbol table in step with DSL cells
//! - Cache diagram, query and validation results per store version
//! - Record every execution in the cell history
//!
//! ## Non-Responsibilities
//!
//! - Parsing DSL text, rendering diagrams and evaluating queries (injected
//!   collaborators)
//! - Serializing concurrent calls for the same cell (callers do this per
//!   session)

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use sruja_core::ast::{AstTransformer, DslParser, IrTransformer, JsonAstParser};
use sruja_core::core_types::RequestContext;
use sruja_core::diff::{diff_models, render_diff_summary};
use sruja_core::logging_facility;
use sruja_core::{log_op_end, log_op_error, log_op_start};
use sruja_core::{ArchitectureStore, KernelError, Result, SimulationEngine, SnapshotManager};
use sruja_core::{MergeResult, VariantManager};

use crate::cache::{cache_key, CacheStats, CachedResult, ResultCache};
use crate::cell::{
    CellOutput, CellType, Diagnostic, ExecutionResult, Severity, OUTPUT_IR, OUTPUT_JSON,
    OUTPUT_MERGE, OUTPUT_SIMULATION,
};
use crate::collaborators::{DiagramCompiler, QueryEngine};
use crate::commands::{parse_diagram, parse_simulate, parse_validate, ValidateCommand};
use crate::config::KernelConfig;
use crate::history::{CellHistory, HistoryRecord};
use crate::magic::{self, MagicCommand, HELP};
use crate::symbols::{collect_symbols, find_references, Symbol, SymbolReference, SymbolTable};
use crate::validation::{ValidationContext, ValidationRule, Validator};

/// Assembles a [`Kernel`] from its collaborators
///
/// Without explicit collaborators the kernel parses the JSON AST form,
/// uses the reference transformer, has no diagram formats and no query
/// engine.
pub struct KernelBuilder {
    config: KernelConfig,
    parser: Box<dyn DslParser>,
    transformer: Box<dyn IrTransformer>,
    compilers: BTreeMap<String, Box<dyn DiagramCompiler>>,
    query_engine: Option<Box<dyn QueryEngine>>,
    validator: Validator,
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self {
            config: KernelConfig::default(),
            parser: Box::new(JsonAstParser),
            transformer: Box::new(AstTransformer),
            compilers: BTreeMap::new(),
            query_engine: None,
            validator: Validator::new(),
        }
    }
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn parser(mut self, parser: impl DslParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn transformer(mut self, transformer: impl IrTransformer + 'static) -> Self {
        self.transformer = Box::new(transformer);
        self
    }

    /// Register a diagram format; a later compiler for the same format wins
    pub fn diagram_compiler(mut self, compiler: impl DiagramCompiler + 'static) -> Self {
        self.compilers
            .insert(compiler.format().to_string(), Box::new(compiler));
        self
    }

    pub fn query_engine(mut self, engine: impl QueryEngine + 'static) -> Self {
        self.query_engine = Some(Box::new(engine));
        self
    }

    pub fn validation_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.validator = self.validator.with_rule(Box::new(rule));
        self
    }

    pub fn build(self) -> Kernel {
        let store = Arc::new(ArchitectureStore::with_name(
            self.config.ir.default_architecture_name.clone(),
        ));
        let snapshots = Arc::new(SnapshotManager::new(Arc::clone(&store)));
        let variants = VariantManager::new(Arc::clone(&store), Arc::clone(&snapshots));

        Kernel {
            cache: ResultCache::new(&self.config.cache),
            history: CellHistory::new(self.config.history.max_records_per_cell),
            config: self.config,
            parser: self.parser,
            transformer: self.transformer,
            compilers: self.compilers,
            query_engine: self.query_engine,
            validator: self.validator,
            store,
            snapshots,
            variants,
            simulation: SimulationEngine::new(),
            symbols: SymbolTable::new(),
        }
    }
}

/// One notebook session's architecture kernel
pub struct Kernel {
    config: KernelConfig,
    parser: Box<dyn DslParser>,
    transformer: Box<dyn IrTransformer>,
    compilers: BTreeMap<String, Box<dyn DiagramCompiler>>,
    query_engine: Option<Box<dyn QueryEngine>>,
    validator: Validator,
    store: Arc<ArchitectureStore>,
    snapshots: Arc<SnapshotManager>,
    variants: VariantManager,
    simulation: SimulationEngine,
    symbols: SymbolTable,
    cache: ResultCache,
    history: CellHistory,
}

impl Default for Kernel {
    fn default() -> Self {
        KernelBuilder::new().build()
    }
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    /// Install the tracing subscriber for the configured logging profile
    ///
    /// Only the first call in a process has an effect.
    pub fn init_logging(&self) {
        logging_facility::init(self.config.logging.profile);
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ArchitectureStore> {
        &self.store
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    pub fn variants(&self) -> &VariantManager {
        &self.variants
    }

    pub fn simulation(&self) -> &SimulationEngine {
        &self.simulation
    }

    pub fn diagram_formats(&self) -> Vec<&str> {
        self.compilers.keys().map(String::as_str).collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ===== Cell execution =====

    /// Execute one cell
    ///
    /// The cell's previous contributions are retracted first, so executing
    /// the same source twice leaves the store as executing it once. Never
    /// fails: errors are reported in the result.
    pub fn execute_cell(&self, cell_id: &str, cell_type: CellType, source: &str) -> ExecutionResult {
        self.execute_cell_with_context(cell_id, cell_type, source, &RequestContext::new())
    }

    /// [`Kernel::execute_cell`] under a caller-supplied correlation context
    pub fn execute_cell_with_context(
        &self,
        cell_id: &str,
        cell_type: CellType,
        source: &str,
        ctx: &RequestContext,
    ) -> ExecutionResult {
        let span = tracing::info_span!(
            "execute_cell",
            request_id = %ctx.request_id,
            trace_id = ctx.trace_id.as_ref().map(|t| t.as_str())
        );
        let _entered = span.enter();

        log_op_start!(
            "execute_cell",
            cell_id = cell_id,
            cell_type = cell_type.as_str()
        );
        let start = std::time::Instant::now();
        let version_before = self.store.get_version();

        let mut result = ExecutionResult::new(cell_id, cell_type);
        self.retract_cell(cell_id);

        let outcome = if cell_type != CellType::Markdown && magic::is_magic(source) {
            self.execute_magic(cell_id, source, &mut result)
        } else if cell_type.is_cacheable() {
            self.execute_cached(cell_id, cell_type, source, &mut result)
        } else {
            self.dispatch(cell_id, cell_type, source, &mut result)
        };

        let store_version = self.store.get_version();
        result.ir_changed = store_version != version_before;

        match outcome {
            Ok(()) => {
                log_op_end!(
                    "execute_cell",
                    duration_ms = start.elapsed().as_millis() as u64,
                    cell_id = cell_id,
                    store_version = store_version,
                    success = result.success
                );
            }
            Err(e) => {
                log_op_error!(
                    "execute_cell",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    cell_id = cell_id
                );
                result.fail(&e);
            }
        }

        let result = result.finish();
        self.history.record(HistoryRecord {
            source: source.to_string(),
            store_version,
            result: result.clone(),
        });
        result
    }

    /// Remove everything `cell_id` contributed to the store, the
    /// simulation engine and the symbol table
    fn retract_cell(&self, cell_id: &str) {
        let removed = self.store.remove_elements_by_cell(cell_id);
        let lifecycles = self.simulation.retract_cell(cell_id);
        let symbols = self.symbols.remove_cell(cell_id);
        if lifecycles > 0 {
            // Validation results also depend on lifecycles, which the store
            // version does not track
            self.cache.clear();
        }
        tracing::debug!(
            cell_id = cell_id,
            removed,
            lifecycles,
            symbols,
            "retracted cell contributions"
        );
    }

    fn execute_cached(
        &self,
        cell_id: &str,
        cell_type: CellType,
        source: &str,
        result: &mut ExecutionResult,
    ) -> Result<()> {
        let key = cache_key(cell_type, source);
        let version = self.store.get_version();

        if let Some(hit) = self.cache.get(&key, version) {
            tracing::debug!(cell_id = cell_id, key = %key, "result cache hit");
            result.success = hit.success;
            result.error = hit.error;
            result.diagnostics = hit.diagnostics;
            result.outputs = hit
                .outputs
                .into_iter()
                .map(|mut o| {
                    o.cell_id = cell_id.to_string();
                    o
                })
                .collect();
            result.cached = true;
            return Ok(());
        }

        self.dispatch(cell_id, cell_type, source, result)?;
        self.cache.put(
            key,
            CachedResult {
                store_version: version,
                success: result.success,
                outputs: result.outputs.clone(),
                diagnostics: result.diagnostics.clone(),
                error: result.error.clone(),
            },
        );
        Ok(())
    }

    fn dispatch(
        &self,
        cell_id: &str,
        cell_type: CellType,
        source: &str,
        result: &mut ExecutionResult,
    ) -> Result<()> {
        match cell_type {
            CellType::Dsl => self.execute_dsl(cell_id, source, result),
            CellType::Query => self.execute_query(source, result),
            CellType::Diagram => self.execute_diagram(source, result),
            CellType::Validation => {
                let command = parse_validate(source)?;
                self.run_validation(&command, result);
                Ok(())
            }
            CellType::Simulation => self.execute_simulation(source, result),
            CellType::Ai => {
                result.diagnostics.push(Diagnostic::hint(
                    "AI cells are not evaluated by this kernel",
                ));
                Ok(())
            }
            CellType::Markdown => Ok(()),
        }
    }

    fn execute_dsl(&self, cell_id: &str, source: &str, result: &mut ExecutionResult) -> Result<()> {
        let mut ast = self.parser.parse(cell_id, source)?;
        ast.stamp_file(cell_id);
        let mut partial = self.transformer.transform(&ast)?;
        partial.stamp_source_file(cell_id);

        let version = self.store.update_model(&partial);
        let (lifecycles, effects) = self.simulation.load_ast(&ast);
        self.symbols
            .replace_cell(cell_id, collect_symbols(cell_id, &partial, &ast));

        let a = &partial.architecture;
        result.push_text(format!(
            "{} elements, {} relations, {} requirements; {} lifecycles, {} event effects (store version {})",
            a.elements.len(),
            a.relations.len(),
            a.requirements.len(),
            lifecycles,
            effects,
            version
        ));
        Ok(())
    }

    fn execute_query(&self, source: &str, result: &mut ExecutionResult) -> Result<()> {
        let engine = self
            .query_engine
            .as_ref()
            .ok_or_else(|| KernelError::NotConfigured {
                what: "query engine".to_string(),
            })?;
        let answer = engine.evaluate(&self.store.get_model(), source.trim())?;
        result.push_text(answer);
        Ok(())
    }

    fn execute_diagram(&self, source: &str, result: &mut ExecutionResult) -> Result<()> {
        let command = parse_diagram(source)?;
        let format = command
            .format
            .unwrap_or_else(|| self.config.diagram.default_format.clone());
        let compiler = self
            .compilers
            .get(&format)
            .ok_or_else(|| KernelError::NotConfigured {
                what: format!("diagram format '{format}'"),
            })?;

        let model = self.store.get_model();
        if let (Some(root), Some(kind)) = (command.scope.root(), command.scope.root_type()) {
            if !model.element(root).is_some_and(|e| e.kind == kind) {
                return Err(KernelError::InvalidCommand {
                    message: format!("{kind} '{root}' not found"),
                });
            }
        }

        let text = compiler.compile(&model, &command.scope)?;
        result.push_json(compiler.mime_type(), Value::String(text));
        Ok(())
    }

    fn run_validation(&self, command: &ValidateCommand, result: &mut ExecutionResult) {
        let model = self.store.get_model();
        let fsms = self.simulation.list_fsms();
        let effects = self.simulation.list_effects();
        let ctx = ValidationContext {
            model: &model,
            fsms: &fsms,
            effects: &effects,
        };
        let diagnostics = self.validator.run(command, &ctx);

        let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();
        let summary = if diagnostics.is_empty() {
            "No issues found.".to_string()
        } else {
            format!(
                "{} error(s), {} warning(s), {} info, {} hint(s)",
                count(Severity::Error),
                count(Severity::Warning),
                count(Severity::Info),
                count(Severity::Hint)
            )
        };
        result.push_text(summary);
        result.diagnostics.extend(diagnostics);
    }

    fn execute_simulation(&self, source: &str, result: &mut ExecutionResult) -> Result<()> {
        let command = parse_simulate(source)?;
        let simulation =
            self.simulation
                .simulate(&command.entity, command.from.as_deref(), &command.events)?;

        for invalid in &simulation.invalid_transitions {
            result.diagnostics.push(
                Diagnostic::warning(format!(
                    "step {}: '{}' cannot move {} from {} to {} ({})",
                    invalid.step,
                    invalid.event,
                    simulation.entity_name,
                    invalid.from_state,
                    invalid.to_state,
                    invalid.reason.as_str()
                ))
                .with_element(simulation.entity_name.clone())
                .with_code(invalid.reason.as_str()),
            );
        }
        for warning in &simulation.warnings {
            result.diagnostics.push(
                Diagnostic::warning(warning.clone()).with_element(simulation.entity_name.clone()),
            );
        }

        let path: Vec<&str> = simulation
            .state_history
            .iter()
            .map(|s| s.state.as_str())
            .collect();
        result.push_text(format!(
            "{}: {} (final state {})",
            simulation.entity_name,
            path.join(" -> "),
            simulation.final_state
        ));
        result.push_json(OUTPUT_SIMULATION, serde_json::to_value(&simulation)?);
        Ok(())
    }

    // ===== Magic commands =====

    fn execute_magic(&self, cell_id: &str, source: &str, result: &mut ExecutionResult) -> Result<()> {
        match magic::parse(source)? {
            MagicCommand::Ir => {
                let ir: Value = serde_json::from_str(&self.export_ir()?)?;
                result.push_json(OUTPUT_IR, ir);
            }
            MagicCommand::Help => result.push_text(HELP),
            MagicCommand::Reset => {
                let version = self.reset();
                result.push_text(format!("Kernel reset (store version {version})"));
            }
            MagicCommand::Validate(scope) => {
                let command = parse_validate(&format!("validate {scope}"))?;
                self.run_validation(&command, result);
            }

            MagicCommand::SnapshotCreate { name, description } => {
                let snapshot = self.snapshots.create_snapshot(&name, &description)?;
                result.push_text(format!(
                    "Snapshot '{}' created at store version {}",
                    snapshot.name, snapshot.store_version
                ));
            }
            MagicCommand::SnapshotList => {
                let snapshots = self.snapshots.list_snapshots();
                let rows: Vec<Value> = snapshots
                    .iter()
                    .map(|s| {
                        json!({
                            "id": s.id,
                            "name": s.name,
                            "description": s.description,
                            "timestamp": s.timestamp,
                            "storeVersion": s.store_version,
                        })
                    })
                    .collect();
                result.push_text(listing(
                    "snapshots",
                    snapshots.iter().map(|s| (s.name.as_str(), s.description.as_str())),
                ));
                result.push_json(OUTPUT_JSON, Value::Array(rows));
            }
            MagicCommand::SnapshotLoad(name) => {
                let version = self.snapshots.load_snapshot(&name)?;
                result.push_text(format!("Snapshot '{name}' loaded (store version {version})"));
            }
            MagicCommand::SnapshotDelete(name) => {
                self.snapshots.delete_snapshot(&name)?;
                result.push_text(format!("Snapshot '{name}' deleted"));
            }

            MagicCommand::VariantList => {
                let variants = self.variants.list_variants();
                let rows: Vec<Value> = variants
                    .iter()
                    .map(|v| {
                        json!({
                            "id": v.id,
                            "name": v.name,
                            "base": v.base,
                            "description": v.description,
                            "createdAt": v.created_at,
                        })
                    })
                    .collect();
                result.push_text(listing(
                    "variants",
                    variants.iter().map(|v| (v.name.as_str(), v.base.as_str())),
                ));
                result.push_json(OUTPUT_JSON, Value::Array(rows));
            }
            MagicCommand::VariantCreate {
                name,
                base,
                description,
            } => {
                let base = match base {
                    Some(base) => base,
                    None => self.implicit_base(&name)?,
                };
                let variant = self.variants.create_variant(&name, &base, &description)?;
                result.push_text(format!(
                    "Variant '{}' created from snapshot '{}'",
                    variant.name, variant.base
                ));
            }
            MagicCommand::VariantApply(name) => {
                let version = self.variants.apply_variant(&name)?;
                result.push_text(format!("Variant '{name}' applied (store version {version})"));
            }
            MagicCommand::VariantMerge(name) => {
                let merge = self.variants.merge_variant(&name)?;
                report_merge(cell_id, &name, &merge, result)?;
            }
            MagicCommand::VariantDiff(name) => {
                let patches = self.variants.compute_variant_diff(&name)?;
                let variant = self.variants.get_variant(&name)?;
                let diff = diff_models(&variant.base_model()?, &variant.model());
                result.push_output(CellOutput::markdown(cell_id, render_diff_summary(&diff)));
                result.push_json(OUTPUT_JSON, serde_json::to_value(&patches)?);
            }
            MagicCommand::VariantDelete(name) => {
                self.variants.delete_variant(&name)?;
                result.push_text(format!("Variant '{name}' deleted"));
            }
        }
        Ok(())
    }

    /// Snapshot of the current model backing a variant created without a base
    ///
    /// Named `<variant>@<store version>`; an existing snapshot of that name
    /// holds the same model and is reused.
    fn implicit_base(&self, variant: &str) -> Result<String> {
        let name = format!("{variant}@{}", self.store.get_version());
        if !self.snapshots.contains(&name) {
            self.snapshots
                .create_snapshot(&name, &format!("implicit base of variant '{variant}'"))?;
        }
        Ok(name)
    }

    // ===== IR persistence =====

    /// The current model as an IR JSON document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the model cannot be encoded.
    pub fn export_ir(&self) -> Result<String> {
        self.store.to_json()
    }

    /// Replace the current model with an IR JSON document
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr` for a malformed document; the store is untouched.
    pub fn import_ir(&self, json: &str) -> Result<u64> {
        log_op_start!("import_ir", bytes = json.len());
        let start = std::time::Instant::now();

        let version = self.store.from_json(json).map_err(|e| {
            log_op_error!(
                "import_ir",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "import_ir",
            duration_ms = start.elapsed().as_millis() as u64,
            store_version = version
        );
        Ok(version)
    }

    /// Clear the model, lifecycles, symbols, history and cache
    ///
    /// Snapshots and variants are kept. Returns the new store version.
    pub fn reset(&self) -> u64 {
        let version = self.store.reset();
        self.simulation.clear();
        self.symbols.clear();
        self.history.clear();
        self.cache.clear();
        tracing::info!(store_version = version, "kernel reset");
        version
    }

    // ===== Symbols & history =====

    pub fn lookup_symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols.lookup(name)
    }

    pub fn complete_symbols(&self, prefix: &str) -> Vec<Symbol> {
        self.symbols.complete(prefix)
    }

    pub fn symbols_in_cell(&self, cell_id: &str) -> Vec<Symbol> {
        self.symbols.symbols_in_cell(cell_id)
    }

    pub fn find_references(&self, name: &str) -> Vec<SymbolReference> {
        find_references(
            &self.store.get_model(),
            &self.simulation.list_effects(),
            name,
        )
    }

    /// Execution records of one cell, oldest first
    pub fn cell_history(&self, cell_id: &str) -> Vec<HistoryRecord> {
        self.history.for_cell(cell_id)
    }

    /// Ids of every cell executed since the last reset
    pub fn executed_cells(&self) -> Vec<String> {
        self.history.cells()
    }
}

fn listing<'a>(what: &str, rows: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let lines: Vec<String> = rows
        .map(|(name, detail)| {
            if detail.is_empty() {
                format!("- {name}")
            } else {
                format!("- {name}: {detail}")
            }
        })
        .collect();
    if lines.is_empty() {
        format!("No {what}.")
    } else {
        lines.join("\n")
    }
}

fn report_merge(
    cell_id: &str,
    variant: &str,
    merge: &MergeResult,
    result: &mut ExecutionResult,
) -> Result<()> {
    result.push_output(CellOutput::markdown(cell_id, merge.explanation.clone()));
    result.push_json(OUTPUT_MERGE, serde_json::to_value(merge)?);

    if !merge.success {
        for conflict in &merge.conflicts {
            result.diagnostics.push(
                Diagnostic::error(conflict.description.clone())
                    .with_element(conflict.id.clone())
                    .with_code("merge-conflict"),
            );
        }
        result.success = false;
        result.error = Some(format!(
            "merge of variant '{variant}' has {} conflict(s); nothing was applied",
            merge.conflicts.len()
        ));
    }
    Ok(())
}

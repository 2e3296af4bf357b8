use super::Ast;
use crate::errors::{KernelError, Result};
use crate::model::SourceLocation;

/// The external DSL parser contract
///
/// `file` is the cell id; implementations must report it as the `file` of
/// every declaration's location so the store can retract the cell later.
pub trait DslParser: Send + Sync {
    /// Parse one cell's source into an AST
    ///
    /// # Errors
    ///
    /// Returns `KernelError::Parse` with the failing position when the
    /// source is malformed.
    fn parse(&self, file: &str, source: &str) -> Result<Ast>;
}

/// Parser for the JSON interchange form of the AST
///
/// Lets a host run the real DSL parser out of process and submit its
/// output as the cell source.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAstParser;

impl DslParser for JsonAstParser {
    fn parse(&self, file: &str, source: &str) -> Result<Ast> {
        if source.trim().is_empty() {
            return Ok(Ast::default());
        }

        let mut ast: Ast = serde_json::from_str(source).map_err(|e| KernelError::Parse {
            message: e.to_string(),
            location: Some(SourceLocation::new(
                file,
                u32::try_from(e.line()).unwrap_or(u32::MAX),
                u32::try_from(e.column()).unwrap_or(u32::MAX),
            )),
        })?;
        ast.stamp_file(file);
        Ok(ast)
    }
}

//! Collaborators injected into the kernel
//!
//! Diagram rendering and query evaluation live outside the kernel. Each
//! kernel owns its own instances, so several kernels in one process never
//! share compiler state.

use sruja_core::model::{Element, ElementType, Model};
use sruja_core::Result;

/// Portion of the model a diagram covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiagramScope {
    /// System context: the whole model
    #[default]
    All,
    System(String),
    Container(String),
    Component(String),
}

impl DiagramScope {
    /// Element id the scope is rooted at
    pub fn root(&self) -> Option<&str> {
        match self {
            DiagramScope::All => None,
            DiagramScope::System(id) | DiagramScope::Container(id) | DiagramScope::Component(id) => {
                Some(id)
            }
        }
    }

    /// Element type the root must have
    pub fn root_type(&self) -> Option<ElementType> {
        match self {
            DiagramScope::All => None,
            DiagramScope::System(_) => Some(ElementType::System),
            DiagramScope::Container(_) => Some(ElementType::Container),
            DiagramScope::Component(_) => Some(ElementType::Component),
        }
    }

    /// True when `element` is the root or nested under it
    pub fn contains(&self, element: &Element) -> bool {
        match self.root() {
            None => true,
            Some(root) => is_within(&element.id, root),
        }
    }
}

impl std::fmt::Display for DiagramScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagramScope::All => f.write_str("all"),
            DiagramScope::System(id) => write!(f, "system {id}"),
            DiagramScope::Container(id) => write!(f, "container {id}"),
            DiagramScope::Component(id) => write!(f, "component {id}"),
        }
    }
}

/// True when `id` equals `root` or is a qualified child id of it
pub fn is_within(id: &str, root: &str) -> bool {
    id == root
        || id
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Renders the model as diagram source text
pub trait DiagramCompiler: Send + Sync {
    /// Format name used in `diagram <format>` commands, e.g. `mermaid`
    fn format(&self) -> &str;

    /// Output type of the rendered text, e.g. `text/mermaid`
    fn mime_type(&self) -> &str;

    /// # Errors
    ///
    /// Returns `KernelError::Compile` when the model cannot be rendered.
    fn compile(&self, model: &Model, scope: &DiagramScope) -> Result<String>;
}

/// Evaluates query cells against the model
pub trait QueryEngine: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the query is malformed or cannot be evaluated.
    fn evaluate(&self, model: &Model, query: &str) -> Result<String>;
}

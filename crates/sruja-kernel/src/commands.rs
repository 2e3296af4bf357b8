//! Mini-command grammars of diagram, validation and simulation cells
//!
//! ```text
//! diagram [mermaid|d2] [system|container|component <id>]
//! validate [all|system|container|component|entity|event <id>|rule <name>]
//! simulate <Entity> [from <State>] [events: E1, E2, ...]
//! ```
//!
//! Commands are space-tokenized; keywords are case-sensitive.

use sruja_core::{KernelError, Result};

use crate::collaborators::DiagramScope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramCommand {
    /// Requested format; `None` means the configured default
    pub format: Option<String>,
    pub scope: DiagramScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidateCommand {
    #[default]
    All,
    System(String),
    Container(String),
    Component(String),
    Entity(String),
    Event(String),
    Rule(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulateCommand {
    pub entity: String,
    pub from: Option<String>,
    pub events: Vec<String>,
}

fn invalid(message: impl Into<String>) -> KernelError {
    KernelError::InvalidCommand {
        message: message.into(),
    }
}

/// Split off the leading keyword; blank source is the bare keyword
fn strip_keyword<'a>(source: &'a str, keyword: &str) -> Result<Vec<&'a str>> {
    let mut tokens = source.split_whitespace();
    match tokens.next() {
        None => Ok(Vec::new()),
        Some(first) if first == keyword => Ok(tokens.collect()),
        Some(first) => Err(invalid(format!(
            "expected '{keyword}', found '{first}'"
        ))),
    }
}

fn scope_id<'a>(tokens: &[&'a str], keyword: &str) -> Result<&'a str> {
    match tokens {
        [id] => Ok(*id),
        [] => Err(invalid(format!("'{keyword}' needs an id"))),
        _ => Err(invalid(format!(
            "unexpected arguments after '{keyword} {}'",
            tokens[0]
        ))),
    }
}

/// Parse `diagram [format] [system|container|component <id>]`
///
/// # Errors
///
/// Returns `InvalidCommand` when the keyword is wrong or a scope lacks its id.
pub fn parse_diagram(source: &str) -> Result<DiagramCommand> {
    let tokens = strip_keyword(source, "diagram")?;
    let mut rest = tokens.as_slice();

    let mut format = None;
    if let Some(first) = rest.first() {
        if !matches!(*first, "system" | "container" | "component" | "all") {
            format = Some(first.to_string());
            rest = &rest[1..];
        }
    }

    let scope = match rest {
        [] | ["all"] => DiagramScope::All,
        ["system", args @ ..] => DiagramScope::System(scope_id(args, "system")?.to_string()),
        ["container", args @ ..] => {
            DiagramScope::Container(scope_id(args, "container")?.to_string())
        }
        ["component", args @ ..] => {
            DiagramScope::Component(scope_id(args, "component")?.to_string())
        }
        [other, ..] => return Err(invalid(format!("unknown diagram scope '{other}'"))),
    };

    Ok(DiagramCommand { format, scope })
}

/// Parse `validate [all|<scope> <id>|rule <name>]`
///
/// # Errors
///
/// Returns `InvalidCommand` for an unknown scope or a scope without its id.
pub fn parse_validate(source: &str) -> Result<ValidateCommand> {
    let tokens = strip_keyword(source, "validate")?;
    let command = match tokens.as_slice() {
        [] | ["all"] => ValidateCommand::All,
        [scope, args @ ..] => {
            let id = scope_id(args, scope)?.to_string();
            match *scope {
                "system" => ValidateCommand::System(id),
                "container" => ValidateCommand::Container(id),
                "component" => ValidateCommand::Component(id),
                "entity" => ValidateCommand::Entity(id),
                "event" => ValidateCommand::Event(id),
                "rule" => ValidateCommand::Rule(id),
                other => return Err(invalid(format!("unknown validation scope '{other}'"))),
            }
        }
    };
    Ok(command)
}

/// Parse `simulate <Entity> [from <State>] [events: E1, E2, ...]`
///
/// Events may be separated by commas, whitespace or both.
///
/// # Errors
///
/// Returns `InvalidCommand` when the entity is missing, `from` lacks a
/// state, or unexpected words appear before `events:`.
pub fn parse_simulate(source: &str) -> Result<SimulateCommand> {
    let source = source.trim();
    let (head, events) = match source.find("events:") {
        Some(at) => (&source[..at], Some(&source[at + "events:".len()..])),
        None => (source, None),
    };

    let tokens = strip_keyword(head, "simulate")?;
    let (entity, from) = match tokens.as_slice() {
        [] => return Err(invalid("'simulate' needs an entity name")),
        [entity] => (entity.to_string(), None),
        [entity, "from", state] => (entity.to_string(), Some(state.to_string())),
        [_, "from"] => return Err(invalid("'from' needs a state")),
        [_, other, ..] => return Err(invalid(format!("unexpected '{other}' in simulate command"))),
    };

    let events = events
        .map(|list| {
            list.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(SimulateCommand {
        entity,
        from,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_defaults() {
        let cmd = parse_diagram("diagram").unwrap();
        assert_eq!(cmd.format, None);
        assert_eq!(cmd.scope, DiagramScope::All);
        assert_eq!(parse_diagram("").unwrap(), cmd);
    }

    #[test]
    fn test_diagram_format_and_scope() {
        let cmd = parse_diagram("diagram d2 container S1.API").unwrap();
        assert_eq!(cmd.format.as_deref(), Some("d2"));
        assert_eq!(cmd.scope, DiagramScope::Container("S1.API".into()));

        let cmd = parse_diagram("diagram system S1").unwrap();
        assert_eq!(cmd.format, None);
        assert_eq!(cmd.scope, DiagramScope::System("S1".into()));
    }

    #[test]
    fn test_diagram_scope_without_id_is_invalid() {
        assert!(matches!(
            parse_diagram("diagram mermaid component"),
            Err(KernelError::InvalidCommand { .. })
        ));
        assert!(parse_diagram("render mermaid").is_err());
    }

    #[test]
    fn test_validate_forms() {
        assert_eq!(parse_validate("validate").unwrap(), ValidateCommand::All);
        assert_eq!(parse_validate("validate all").unwrap(), ValidateCommand::All);
        assert_eq!(
            parse_validate("validate entity Payment").unwrap(),
            ValidateCommand::Entity("Payment".into())
        );
        assert_eq!(
            parse_validate("validate rule self-relation").unwrap(),
            ValidateCommand::Rule("self-relation".into())
        );
        assert!(parse_validate("validate galaxy X").is_err());
        assert!(parse_validate("validate event").is_err());
    }

    #[test]
    fn test_simulate_full_form() {
        let cmd =
            parse_simulate("simulate Payment from PENDING events: PaymentAuthorized, PaymentCompleted")
                .unwrap();
        assert_eq!(cmd.entity, "Payment");
        assert_eq!(cmd.from.as_deref(), Some("PENDING"));
        assert_eq!(cmd.events, vec!["PaymentAuthorized", "PaymentCompleted"]);
    }

    #[test]
    fn test_simulate_minimal_form() {
        let cmd = parse_simulate("simulate Payment").unwrap();
        assert_eq!(cmd.from, None);
        assert!(cmd.events.is_empty());

        let cmd = parse_simulate("simulate Payment events:A B,C").unwrap();
        assert_eq!(cmd.events, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_simulate_errors() {
        assert!(parse_simulate("simulate").is_err());
        assert!(parse_simulate("simulate Payment from").is_err());
        assert!(parse_simulate("simulate Payment to DONE").is_err());
    }
}

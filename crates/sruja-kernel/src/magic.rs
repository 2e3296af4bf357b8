//! Magic commands
//!
//! A cell whose source starts with `%` is a magic command, whatever its
//! declared type (Markdown excepted). The keyword is case-sensitive.

use sruja_core::{KernelError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicCommand {
    /// `%ir`
    Ir,
    /// `%snapshot <name> [description...]`
    SnapshotCreate { name: String, description: String },
    /// `%snapshot list`
    SnapshotList,
    /// `%snapshot load <name>`
    SnapshotLoad(String),
    /// `%snapshot delete <name>`
    SnapshotDelete(String),
    /// `%variant list`
    VariantList,
    /// `%variant create <name> [baseSnapshot] [description...]`
    VariantCreate {
        name: String,
        base: Option<String>,
        description: String,
    },
    /// `%variant apply <name>`
    VariantApply(String),
    /// `%variant merge <name>`
    VariantMerge(String),
    /// `%variant diff <name>`
    VariantDiff(String),
    /// `%variant delete <name>`
    VariantDelete(String),
    /// `%validate [scope...]`
    Validate(String),
    /// `%reset`
    Reset,
    /// `%help`
    Help,
}

pub const HELP: &str = "\
Available magic commands:
  %ir                                   show the current IR
  %snapshot <name> [description]        capture the current model
  %snapshot list                        list snapshots
  %snapshot load <name>                 replace the model with a snapshot
  %snapshot delete <name>               delete a snapshot
  %variant list                         list variants
  %variant create <name> [base] [desc]  branch from a snapshot (current model if no base)
  %variant apply <name>                 overwrite the model with a variant
  %variant merge <name>                 three-way merge a variant into the model
  %variant diff <name>                  show a variant's changes as patches
  %variant delete <name>                delete a variant
  %validate [scope]                     run validation rules
  %reset                                clear the model, symbols and history
  %help                                 show this help";

/// True when the cell source is a magic command
pub fn is_magic(source: &str) -> bool {
    source.trim_start().starts_with('%')
}

fn unknown(what: &str) -> KernelError {
    KernelError::InvalidCommand {
        message: format!("unknown magic command '{what}'\n{HELP}"),
    }
}

fn needs_name(command: &str) -> KernelError {
    KernelError::InvalidCommand {
        message: format!("'{command}' needs a name"),
    }
}

fn one_name(command: &str, args: &[&str]) -> Result<String> {
    match args {
        [name] => Ok(name.to_string()),
        [] => Err(needs_name(command)),
        _ => Err(KernelError::InvalidCommand {
            message: format!("'{command}' takes exactly one name"),
        }),
    }
}

/// Parse a magic command
///
/// # Errors
///
/// Returns `InvalidCommand` for an unknown command or sub-command, or a
/// missing name; the message lists the available commands.
pub fn parse(source: &str) -> Result<MagicCommand> {
    let source = source.trim();
    let body = source.strip_prefix('%').ok_or_else(|| unknown(source))?;
    let tokens: Vec<&str> = body.split_whitespace().collect();

    match tokens.as_slice() {
        ["ir"] => Ok(MagicCommand::Ir),
        ["reset"] => Ok(MagicCommand::Reset),
        ["help"] => Ok(MagicCommand::Help),
        ["validate", rest @ ..] => Ok(MagicCommand::Validate(rest.join(" "))),

        ["snapshot"] => Err(needs_name("%snapshot")),
        ["snapshot", "list"] => Ok(MagicCommand::SnapshotList),
        ["snapshot", "load", args @ ..] => {
            Ok(MagicCommand::SnapshotLoad(one_name("%snapshot load", args)?))
        }
        ["snapshot", "delete", args @ ..] => {
            Ok(MagicCommand::SnapshotDelete(one_name("%snapshot delete", args)?))
        }
        ["snapshot", name, description @ ..] => Ok(MagicCommand::SnapshotCreate {
            name: name.to_string(),
            description: description.join(" "),
        }),

        ["variant", "list"] => Ok(MagicCommand::VariantList),
        ["variant", "create"] => Err(needs_name("%variant create")),
        ["variant", "create", name, rest @ ..] => Ok(MagicCommand::VariantCreate {
            name: name.to_string(),
            base: rest.first().map(|b| b.to_string()),
            description: rest.get(1..).map(|d| d.join(" ")).unwrap_or_default(),
        }),
        ["variant", "apply", args @ ..] => {
            Ok(MagicCommand::VariantApply(one_name("%variant apply", args)?))
        }
        ["variant", "merge", args @ ..] => {
            Ok(MagicCommand::VariantMerge(one_name("%variant merge", args)?))
        }
        ["variant", "diff", args @ ..] => {
            Ok(MagicCommand::VariantDiff(one_name("%variant diff", args)?))
        }
        ["variant", "delete", args @ ..] => {
            Ok(MagicCommand::VariantDelete(one_name("%variant delete", args)?))
        }
        ["variant", sub, ..] => Err(unknown(&format!("%variant {sub}"))),
        ["variant"] => Err(unknown("%variant")),

        [] => Err(unknown("%")),
        [other, ..] => Err(unknown(&format!("%{other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("%ir").unwrap(), MagicCommand::Ir);
        assert_eq!(parse("  %reset \n").unwrap(), MagicCommand::Reset);
        assert_eq!(parse("%help").unwrap(), MagicCommand::Help);
        assert_eq!(
            parse("%validate entity Payment").unwrap(),
            MagicCommand::Validate("entity Payment".into())
        );
    }

    #[test]
    fn test_snapshot_forms() {
        assert_eq!(
            parse("%snapshot base1 before the refactor").unwrap(),
            MagicCommand::SnapshotCreate {
                name: "base1".into(),
                description: "before the refactor".into()
            }
        );
        assert_eq!(parse("%snapshot list").unwrap(), MagicCommand::SnapshotList);
        assert_eq!(
            parse("%snapshot load base1").unwrap(),
            MagicCommand::SnapshotLoad("base1".into())
        );
        assert!(parse("%snapshot").is_err());
        assert!(parse("%snapshot delete").is_err());
    }

    #[test]
    fn test_variant_create_optional_parts() {
        assert_eq!(
            parse("%variant create v1").unwrap(),
            MagicCommand::VariantCreate {
                name: "v1".into(),
                base: None,
                description: String::new()
            }
        );
        assert_eq!(
            parse("%variant create v1 base1 try a cache").unwrap(),
            MagicCommand::VariantCreate {
                name: "v1".into(),
                base: Some("base1".into()),
                description: "try a cache".into()
            }
        );
    }

    #[test]
    fn test_unknown_commands_list_help() {
        for source in ["%frobnicate", "%variant rebase v1", "%IR", "%"] {
            let err = parse(source).unwrap_err();
            assert!(
                err.to_string().contains("Available magic commands"),
                "{source}"
            );
        }
    }

    #[test]
    fn test_is_magic() {
        assert!(is_magic("  %ir"));
        assert!(!is_magic("diagram mermaid"));
    }
}

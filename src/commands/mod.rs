// src/commands/mod.rs — Console command registry
//
// One process-wide table of command name -> definition. Plugins own at most
// one command each; name collisions between plugins are resolved by
// prefixing with the owning plugin id (`<id>:<name>`).

pub mod builtin;
pub mod parser;
pub mod registry;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plugins::context::PluginLog;
pub use parser::OptionValue;
pub use registry::{CommandDefinition, CommandRegistry};

/// Names only the system may register.
pub const RESERVED_COMMANDS: &[&str] = &["exit", "help", "plugin:list", "plugin:ps"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_COMMANDS.contains(&name)
}

/// Non-reserved names must match `[A-Za-z0-9_-]+`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("command name '{0}' is reserved for the system")]
    Reserved(String),

    #[error("command name '{0}' contains illegal characters (allowed: letters, digits, '-', '_')")]
    IllegalName(String),

    #[error("plugin '{owner}' already registered command '{existing}'")]
    AlreadyOwns { owner: String, existing: String },

    #[error("command '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("option {option} requires a value")]
    MissingValue { option: String },

    #[error("missing required option: --{option}")]
    MissingRequired { option: String },

    #[error("usage: {0}")]
    Usage(String),

    #[error("command '{command}' failed: {message}")]
    Failed { command: String, message: String },
}

impl CommandError {
    /// Parse errors are reported through the command's own logger before
    /// they are returned; callers should not report them again.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            CommandError::MissingValue { .. } | CommandError::MissingRequired { .. }
        )
    }
}

/// Who registered a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    System,
    Plugin(String),
}

impl Owner {
    pub fn plugin(id: impl Into<String>) -> Self {
        Self::Plugin(id.into())
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Owner::System => f.write_str("system"),
            Owner::Plugin(id) => f.write_str(id),
        }
    }
}

/// What the console loop should do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Exit,
}

/// A declared option of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<OptionValue>,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            description: None,
            required: false,
            default_value: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: OptionValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// An option together with the value resolved for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    pub spec: OptionSpec,
    pub value: OptionValue,
}

/// Everything a command callback gets for one invocation.
pub struct CommandContext<'a> {
    pub registry: &'a CommandRegistry,
    pub log: &'a PluginLog,
    pub options: &'a [ResolvedOption],
    /// Tokens nothing consumed: a non-subcommand first positional, later
    /// positionals and unresolved short options.
    pub unused: &'a [String],
    /// The full tokenized line, command name included.
    pub args: &'a [String],
}

impl CommandContext<'_> {
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|o| o.spec.name == name)
            .map(|o| &o.value)
    }
}

pub type CommandCallback =
    Arc<dyn Fn(&CommandContext<'_>) -> anyhow::Result<CommandFlow> + Send + Sync>;

/// Wrap a closure as a command callback.
pub fn callback<F>(f: F) -> CommandCallback
where
    F: Fn(&CommandContext<'_>) -> anyhow::Result<CommandFlow> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
pub struct SubCommand {
    pub name: String,
    pub description: Option<String>,
    pub example_usage: Option<String>,
    pub callback: CommandCallback,
}

impl SubCommand {
    pub fn new(name: impl Into<String>, callback: CommandCallback) -> Self {
        Self {
            name: name.into(),
            description: None,
            example_usage: None,
            callback,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn example_usage(mut self, example: impl Into<String>) -> Self {
        self.example_usage = Some(example.into());
        self
    }
}

impl std::fmt::Debug for SubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubCommand")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A command block as declared by its owner, before registration.
#[derive(Clone)]
pub struct CommandSpec {
    pub callback: CommandCallback,
    pub description: Option<String>,
    pub sub_commands: Vec<SubCommand>,
    pub options: Vec<OptionSpec>,
    pub example_usage: Option<String>,
}

impl CommandSpec {
    pub fn new(callback: CommandCallback) -> Self {
        Self {
            callback,
            description: None,
            sub_commands: Vec::new(),
            options: Vec::new(),
            example_usage: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn sub_command(mut self, sub: SubCommand) -> Self {
        self.sub_commands.push(sub);
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn example_usage(mut self, example: impl Into<String>) -> Self {
        self.example_usage = Some(example.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("download"));
        assert!(is_valid_name("dl_2-x"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a:b"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("ünï"));
    }

    #[test]
    fn test_reserved_names() {
        for name in ["exit", "help", "plugin:list", "plugin:ps"] {
            assert!(is_reserved(name));
        }
        assert!(!is_reserved("plugin"));
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(Owner::System.to_string(), "system");
        assert_eq!(Owner::plugin("pixiv").to_string(), "pixiv");
    }

    #[test]
    fn test_parse_errors_are_reported() {
        assert!(CommandError::MissingValue { option: "--x".into() }.is_reported());
        assert!(!CommandError::Unknown("x".into()).is_reported());
    }
}

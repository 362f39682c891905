// src/commands/registry.rs — Command table, registration and dispatch
//
// Entry states: unregistered -> registered(bare name) -> registered(<owner>:name).
// The prefixed state is terminal; there is no unregister.

use std::collections::{BTreeMap, HashMap};

use super::parser::{parse_args, tokenize};
use super::{
    is_reserved, is_valid_name, CommandCallback, CommandContext, CommandError, CommandFlow,
    CommandSpec, OptionSpec, Owner, SubCommand,
};
use crate::plugins::context::PluginLog;

/// A registered command.
pub struct CommandDefinition {
    /// Current table key; rewritten at most once, on the first collision.
    pub name: String,
    pub owner: Owner,
    pub log: PluginLog,
    pub callback: CommandCallback,
    pub description: Option<String>,
    pub sub_commands: Vec<SubCommand>,
    pub options: Vec<OptionSpec>,
    pub example_usage: Option<String>,
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("description", &self.description)
            .field("sub_commands", &self.sub_commands)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Process-wide table of console commands.
///
/// Built once at startup, then only read.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDefinition>,
    /// plugin id -> key of the command it owns
    ownership: HashMap<String, String>,
    /// base command name -> plugin ids that asked for it, in order
    collisions: HashMap<String, Vec<String>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` for `owner`. Returns the key the command ended up under.
    pub fn register(
        &mut self,
        name: &str,
        owner: Owner,
        log: PluginLog,
        spec: CommandSpec,
    ) -> Result<String, CommandError> {
        let reserved = is_reserved(name);

        if reserved && owner != Owner::System {
            return Err(CommandError::Reserved(name.to_string()));
        }
        if !reserved && !is_valid_name(name) {
            return Err(CommandError::IllegalName(name.to_string()));
        }

        let key = match owner {
            Owner::System => {
                if self.commands.contains_key(name) {
                    return Err(CommandError::AlreadyRegistered(name.to_string()));
                }
                name.to_string()
            }
            Owner::Plugin(ref id) => {
                if let Some(existing) = self.ownership.get(id) {
                    return Err(CommandError::AlreadyOwns {
                        owner: id.clone(),
                        existing: existing.clone(),
                    });
                }
                self.resolve_plugin_key(name, id, &log)?
            }
        };

        if self.commands.contains_key(&key) {
            return Err(CommandError::AlreadyRegistered(key));
        }

        if let Owner::Plugin(ref id) = owner {
            self.collisions
                .entry(name.to_string())
                .or_default()
                .push(id.clone());
            self.ownership.insert(id.clone(), key.clone());
        }

        tracing::debug!("Registered command '{}' (owner: {})", key, owner);
        self.commands.insert(
            key.clone(),
            CommandDefinition {
                name: key.clone(),
                owner,
                log,
                callback: spec.callback,
                description: spec.description,
                sub_commands: spec.sub_commands,
                options: spec.options,
                example_usage: spec.example_usage,
            },
        );
        Ok(key)
    }

    /// Pick the key for a plugin command, prefixing the prior owner on the
    /// first collision.
    fn resolve_plugin_key(
        &mut self,
        name: &str,
        id: &str,
        log: &PluginLog,
    ) -> Result<String, CommandError> {
        let prior: Vec<String> = self.collisions.get(name).cloned().unwrap_or_default();

        match prior.as_slice() {
            [] => {
                // Taken by the system: plugins never displace it.
                if self.commands.contains_key(name) {
                    return Err(CommandError::AlreadyRegistered(name.to_string()));
                }
                Ok(name.to_string())
            }
            [only] => {
                self.prefix_existing(name, only)?;
                let key = format!("{id}:{name}");
                log.warn(&format!(
                    "command name '{name}' is already taken, registered as '{key}'"
                ));
                Ok(key)
            }
            _ => {
                let key = format!("{id}:{name}");
                log.warn(&format!(
                    "command name '{name}' is already taken, registered as '{key}'"
                ));
                Ok(key)
            }
        }
    }

    /// Move the bare-named entry of `owner` to `<owner>:<name>`.
    fn prefix_existing(&mut self, name: &str, owner: &str) -> Result<(), CommandError> {
        // Phase 1: compute the new key and check it is free.
        let new_key = format!("{owner}:{name}");
        if self.commands.contains_key(&new_key) {
            return Err(CommandError::AlreadyRegistered(new_key));
        }
        let Some(mut def) = self.commands.remove(name) else {
            return Err(CommandError::Unknown(name.to_string()));
        };

        // Phase 2: move the value and update both indices.
        def.log.warn(&format!(
            "command name '{name}' registered more than once, renamed to '{new_key}'"
        ));
        def.name = new_key.clone();
        self.commands.insert(new_key.clone(), def);
        self.ownership.insert(owner.to_string(), new_key);

        debug_assert!(!self.commands.contains_key(name));
        Ok(())
    }

    /// Tokenize, parse and run one console line.
    ///
    /// Exactly one callback runs: the subcommand's when the first positional
    /// names one, the main command's otherwise.
    pub fn execute(&self, line: &str) -> Result<CommandFlow, CommandError> {
        let tokens = tokenize(line);
        let Some(name) = tokens.first() else {
            return Ok(CommandFlow::Continue);
        };

        let def = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::Unknown(name.clone()))?;

        let parsed = parse_args(&tokens[1..], &def.options, &def.sub_commands, &def.log)?;

        let callback = match parsed.sub_command {
            Some(idx) => &def.sub_commands[idx].callback,
            None => &def.callback,
        };

        let ctx = CommandContext {
            registry: self,
            log: &def.log,
            options: &parsed.options,
            unused: &parsed.unused,
            args: &tokens,
        };

        callback(&ctx).map_err(|e| CommandError::Failed {
            command: name.clone(),
            message: format!("{e:#}"),
        })
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// All registered keys, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    /// Key of the command owned by plugin `id`.
    pub fn command_of(&self, id: &str) -> Option<&str> {
        self.ownership.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Lines of the command overview printed by `help`.
    pub fn help_lines(&self) -> Vec<String> {
        let mut lines = vec!["Available commands:".to_string()];
        for (name, def) in &self.commands {
            match def.description {
                Some(ref d) => lines.push(format!("- {name}: {d}")),
                None => lines.push(format!("- {name}")),
            }
        }
        lines.push("Use \"help <command>\" for details on one command".to_string());
        lines
    }

    /// Lines of the detailed help for one command.
    pub fn command_help_lines(&self, name: &str) -> Result<Vec<String>, CommandError> {
        let def = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;

        let mut lines = vec![format!("Command: {name}")];
        if let Some(ref d) = def.description {
            lines.push(format!("Description: {d}"));
        }
        if let Some(ref ex) = def.example_usage {
            lines.push(format!("Example: {ex}"));
        }
        if !def.options.is_empty() {
            lines.push("Options:".to_string());
            for opt in &def.options {
                let mut line = format!("  --{}", opt.name);
                if let Some(ref alias) = opt.alias {
                    line.push_str(&format!(" (-{alias})"));
                }
                if opt.required {
                    line.push_str(" [required]");
                }
                if let Some(ref default) = opt.default_value {
                    line.push_str(&format!(" [default: {default}]"));
                }
                line.push_str(&format!(
                    " - {}",
                    opt.description.as_deref().unwrap_or("no description")
                ));
                lines.push(line);
            }
        }
        if !def.sub_commands.is_empty() {
            lines.push("Subcommands:".to_string());
            for sub in &def.sub_commands {
                lines.push(format!(
                    "  {} - {}",
                    sub.name,
                    sub.description.as_deref().unwrap_or("no description")
                ));
                if let Some(ref ex) = sub.example_usage {
                    lines.push(format!("    Example: {ex}"));
                }
            }
        }
        Ok(lines)
    }
}

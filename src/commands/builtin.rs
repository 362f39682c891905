// src/commands/builtin.rs — System-owned console commands

use std::sync::Arc;

use super::{callback, CommandError, CommandFlow, CommandRegistry, CommandSpec, Owner};
use crate::plugins::context::PluginLog;
use crate::plugins::loader::LoadOutcome;

/// Register `exit`, `help`, `plugin:list` and `plugin:ps`.
///
/// Must run before any plugin command is registered.
pub fn register_defaults(
    registry: &mut CommandRegistry,
    catalog: Arc<LoadOutcome>,
) -> Result<(), CommandError> {
    let server_log = PluginLog::system("server");
    let plugin_log = PluginLog::system("plugin");

    registry.register(
        "exit",
        Owner::System,
        server_log.clone(),
        CommandSpec::new(callback(|ctx| {
            ctx.log.info("shutting down");
            Ok(CommandFlow::Exit)
        }))
        .description("Stop the server"),
    )?;

    registry.register(
        "help",
        Owner::System,
        server_log,
        CommandSpec::new(callback(|ctx| {
            match ctx.args.len() {
                1 => {
                    for line in ctx.registry.help_lines() {
                        ctx.log.info(&line);
                    }
                }
                2 => match ctx.registry.command_help_lines(&ctx.args[1]) {
                    Ok(lines) => {
                        for line in lines {
                            ctx.log.info(&line);
                        }
                    }
                    Err(e) => ctx.log.error(&e.to_string()),
                },
                _ => ctx.log.error("usage: help [command]"),
            }
            Ok(CommandFlow::Continue)
        }))
        .description("Show all commands, or details for one")
        .example_usage("help plugin:list"),
    )?;

    let list_catalog = catalog.clone();
    registry.register(
        "plugin:list",
        Owner::System,
        plugin_log.clone(),
        CommandSpec::new(callback(move |ctx| {
            ctx.log.info("All plugins:");
            for line in list_catalog.loaded_lines() {
                ctx.log.info(&line);
            }
            for line in list_catalog.inactive_lines() {
                ctx.log.info(&line);
            }
            Ok(CommandFlow::Continue)
        }))
        .description("List loaded and inactive plugins"),
    )?;

    registry.register(
        "plugin:ps",
        Owner::System,
        plugin_log,
        CommandSpec::new(callback(move |ctx| {
            ctx.log.info("Loaded plugins:");
            for line in catalog.loaded_lines() {
                ctx.log.info(&line);
            }
            Ok(CommandFlow::Continue)
        }))
        .description("List loaded plugins"),
    )?;

    Ok(())
}

// src/plugins/lifecycle.rs — Command registration and init/teardown hooks

use crate::commands::{CommandRegistry, Owner};
use crate::plugins::context::LoadContext;
use crate::plugins::loader::PluginDescriptor;

/// Register each plugin's command and run its init hook, in load order.
///
/// Each `on_load` is awaited before the next plugin is touched, so a hook
/// always sees every earlier plugin fully initialized. Failures are logged
/// and never stop later plugins.
pub async fn start(plugins: &[PluginDescriptor], registry: &mut CommandRegistry) {
    for plugin in plugins {
        register_command(plugin, registry);

        if !plugin.capabilities.on_load {
            continue;
        }
        let ctx = LoadContext {
            plugin_id: plugin.id.clone(),
            plugin_dir: plugin.dir.clone(),
        };
        if let Err(e) = plugin.handler.on_load(plugin.log.clone(), ctx).await {
            plugin.log.error(&format!("on_load failed: {e:#}"));
        }
    }
}

fn register_command(plugin: &PluginDescriptor, registry: &mut CommandRegistry) {
    let Some(spec) = plugin.handler.command() else {
        return;
    };
    let Some(ref name) = plugin.command_name else {
        plugin
            .log
            .warn("declares a command but the manifest has no commandName, not registered");
        return;
    };

    match registry.register(name, Owner::plugin(&plugin.id), plugin.log.clone(), spec) {
        Ok(key) => plugin.log.debug(&format!("registered command '{key}'")),
        Err(e) => plugin
            .log
            .error(&format!("registering command {name} failed: {e}")),
    }
}

/// Run every teardown hook once, in registration order.
pub async fn shutdown(plugins: &[PluginDescriptor]) {
    for plugin in plugins {
        if !plugin.capabilities.on_unload {
            continue;
        }
        if let Err(e) = plugin.handler.on_unload(plugin.log.clone()).await {
            plugin.log.error(&format!("on_unload failed: {e:#}"));
        }
    }
    tracing::info!("Plugins shut down");
}

// src/cli/serve.rs — Startup, steady state and shutdown of the relay

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{self, ApiState};
use crate::cli::console;
use crate::commands::{builtin, CommandFlow, CommandRegistry};
use crate::infra::config::Config;
use crate::infra::paths::display_relative;
use crate::plugins::{lifecycle, Dispatcher, LoadOutcome, PluginLoader};
use crate::utils::{LocaleTable, Utils};

/// Everything built before the server starts accepting requests.
pub struct Runtime {
    pub catalog: Arc<LoadOutcome>,
    pub registry: Arc<CommandRegistry>,
    pub dispatcher: Dispatcher,
}

pub fn build_utils(config: &Config) -> Utils {
    let locale = match config.utils.locale_table {
        Some(ref path) => LocaleTable::load_from(path).unwrap_or_else(|e| {
            tracing::warn!("Locale table not loaded: {}", e);
            LocaleTable::default()
        }),
        None => LocaleTable::default(),
    };
    Utils::new(locale)
}

/// Discover plugins on the blocking pool.
pub async fn load_plugins(config: &Config) -> anyhow::Result<LoadOutcome> {
    let loader = PluginLoader::new(config.plugins.resolved_dir());
    Ok(tokio::task::spawn_blocking(move || loader.load()).await?)
}

/// Load plugins, register commands and run init hooks.
pub async fn prepare(config: &Config) -> anyhow::Result<Runtime> {
    let catalog = Arc::new(load_plugins(config).await?);

    let mut registry = CommandRegistry::new();
    builtin::register_defaults(&mut registry, catalog.clone())?;
    lifecycle::start(&catalog.plugins, &mut registry).await;

    Ok(Runtime {
        dispatcher: Dispatcher::new(catalog.clone(), build_utils(config)),
        registry: Arc::new(registry),
        catalog,
    })
}

/// Run the relay until ctrl-c or the `exit` console command.
pub async fn run_serve(config: &Config) -> anyhow::Result<()> {
    let runtime = prepare(config).await?;
    let (stop_tx, mut stop_rx) = watch::channel(false);

    if config.console.enabled {
        let registry = runtime.registry.clone();
        let lines = console::spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
        tokio::spawn(async move {
            if console::run_console(registry, lines).await == CommandFlow::Exit {
                let _ = stop_tx.send(true);
            }
        });
    }

    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
            }
            // A closed console (stdin EOF) disables this branch.
            Ok(()) = stop_rx.changed() => {}
        }
    };

    let state = ApiState {
        dispatcher: runtime.dispatcher.clone(),
    };
    let served = api::start_server(&config.server, state, shutdown).await;

    lifecycle::shutdown(&runtime.catalog.plugins).await;
    served
}

/// `siterelay plugins`: print the discovery result and exit.
pub async fn run_list(config: &Config) -> anyhow::Result<()> {
    let dir = config.plugins.resolved_dir();
    let outcome = load_plugins(config).await?;

    println!("Plugins in {}", display_relative(&dir));
    println!("Loaded ({}):", outcome.plugins.len());
    for line in outcome.loaded_lines() {
        println!("  {line}");
    }
    println!("Inactive ({}):", outcome.inactive.len());
    for line in outcome.inactive_lines() {
        println!("  {line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prepare_with_empty_plugins_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.plugins.dir = Some(tmp.path().to_path_buf());

        let runtime = prepare(&config).await.unwrap();
        assert!(runtime.catalog.plugins.is_empty());
        assert_eq!(runtime.registry.len(), 4);
    }

    #[test]
    fn test_missing_locale_table_falls_back() {
        let mut config = Config::default();
        config.utils.locale_table = Some("/nonexistent/table.json".into());
        let utils = build_utils(&config);
        assert_eq!(utils.to_simplified("abc"), "abc");
    }
}

// src/plugins/handler.rs — Plugin capability trait and module loaders

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commands::CommandSpec;
use crate::plugins::context::{LoadContext, PluginLog, RequestContext};

/// Which optional members a plugin module actually provides.
///
/// Read once when the module is imported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub on_request: bool,
    pub on_load: bool,
    pub on_unload: bool,
    pub command: bool,
    pub scripts: bool,
}

impl Capabilities {
    pub fn request_only() -> Self {
        Self {
            on_request: true,
            ..Self::default()
        }
    }
}

/// One UI control of a plugin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptControl {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    /// Plugin-local channel name; the HTTP layer qualifies it.
    pub channel: String,
}

/// Declarative panel a plugin exposes to the browser agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPanel {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub controls: Vec<ScriptControl>,
}

impl ScriptPanel {
    pub fn control(&self, channel: &str) -> Option<&ScriptControl> {
        self.controls.iter().find(|c| c.channel == channel)
    }
}

/// What every plugin implementation provides.
///
/// Only `on_request` is required; the rest default to no-ops and should be
/// reflected in `capabilities`.
#[async_trait]
pub trait PluginHandler: Send + Sync {
    fn capabilities(&self) -> Capabilities {
        Capabilities::request_only()
    }

    async fn on_request(&self, ctx: RequestContext, log: PluginLog) -> anyhow::Result<()>;

    async fn on_load(&self, _log: PluginLog, _ctx: LoadContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_unload(&self, _log: PluginLog) -> anyhow::Result<()> {
        Ok(())
    }

    /// Console command block, registered under the manifest's `commandName`.
    fn command(&self) -> Option<CommandSpec> {
        None
    }

    fn scripts(&self) -> Option<ScriptPanel> {
        None
    }

    /// Run the trigger behind one panel control.
    async fn trigger(
        &self,
        channel: &str,
        _log: PluginLog,
        _ctx: RequestContext,
    ) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("plugin has no trigger for channel '{channel}'")
    }
}

/// Turns an entry file into a plugin handler.
pub trait ModuleLoader: Send + Sync {
    /// Entry file extensions this loader accepts, without the dot.
    fn extensions(&self) -> &[&str];

    /// Import the module: compile it and run its top-level code.
    fn import(&self, entry: &Path, ctx: &LoadContext) -> anyhow::Result<Arc<dyn PluginHandler>>;

    fn accepts(&self, entry: &Path) -> bool {
        entry
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }
}

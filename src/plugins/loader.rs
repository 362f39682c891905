// src/plugins/loader.rs — Plugin discovery and validation
//
// Every subdirectory of the plugins dir holding a `plugin.json` is run through
// a short-circuiting pipeline. The first failing step records the plugin as
// inactive with a reason; later steps are skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::infra::errors::RelayError;
use crate::infra::paths::display_relative;
use crate::plugins::context::{LoadContext, PluginLog};
use crate::plugins::handler::{Capabilities, ModuleLoader, PluginHandler};
use crate::plugins::manifest::{PluginManifest, MANIFEST_FILE};
use crate::plugins::rhai_host::RhaiModuleLoader;

/// Why a discovered plugin was not loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InactiveReason {
    #[error("manifest could not be parsed")]
    ManifestUnreadable,
    #[error("disabled")]
    Disabled,
    #[error("manifest missing main field")]
    MissingEntry,
    #[error("entry file missing or unrecognized extension")]
    EntryNotFound,
    #[error("entry module failed to import")]
    ImportFailed,
    #[error("missing onRequest capability")]
    MissingOnRequest,
}

/// A successfully loaded plugin.
#[derive(Clone)]
pub struct PluginDescriptor {
    /// Directory name; unique among loaded plugins.
    pub id: String,
    pub name: String,
    pub dir: PathBuf,
    pub entry: PathBuf,
    /// As declared. Trailing slashes are stripped at match time.
    pub url_prefixes: Vec<String>,
    pub command_name: Option<String>,
    pub handler: Arc<dyn PluginHandler>,
    pub capabilities: Capabilities,
    pub log: PluginLog,
}

impl PluginDescriptor {
    /// Descriptor for a compiled-in handler, bypassing discovery.
    pub fn native(id: &str, handler: Arc<dyn PluginHandler>) -> Self {
        let capabilities = handler.capabilities();
        Self {
            id: id.to_string(),
            name: id.to_string(),
            dir: PathBuf::new(),
            entry: PathBuf::new(),
            url_prefixes: Vec::new(),
            command_name: None,
            handler,
            capabilities,
            log: PluginLog::new(id, "<native>"),
        }
    }

    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.url_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_command_name(mut self, name: impl Into<String>) -> Self {
        self.command_name = Some(name.into());
        self
    }

    fn prefixes_display(&self) -> String {
        join_or_none(&self.url_prefixes)
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("url_prefixes", &self.url_prefixes)
            .field("command_name", &self.command_name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Diagnostic record of a plugin that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactivePluginRecord {
    pub name: String,
    pub plugin_id: String,
    pub reason: InactiveReason,
    pub url_prefixes: Vec<String>,
}

/// Result of one discovery pass.
#[derive(Debug, Default, Clone)]
pub struct LoadOutcome {
    pub plugins: Vec<PluginDescriptor>,
    pub inactive: Vec<InactivePluginRecord>,
}

impl LoadOutcome {
    pub fn find(&self, id: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.id == id)
    }

    pub fn inactive_reason(&self, id: &str) -> Option<InactiveReason> {
        self.inactive
            .iter()
            .find(|r| r.plugin_id == id)
            .map(|r| r.reason)
    }

    pub fn loaded_lines(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|p| format!("- {}[enabled] (tracking: {})", p.name, p.prefixes_display()))
            .collect()
    }

    pub fn inactive_lines(&self) -> Vec<String> {
        self.inactive
            .iter()
            .map(|r| {
                format!(
                    "- {}[disabled] (reason: {}) (tracking: {})",
                    r.name,
                    r.reason,
                    join_or_none(&r.url_prefixes)
                )
            })
            .collect()
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Scans a plugins directory and imports entry modules.
pub struct PluginLoader {
    dir: PathBuf,
    module_loaders: Vec<Box<dyn ModuleLoader>>,
}

impl PluginLoader {
    /// Loader for `dir` that understands Rhai entry scripts.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::without_modules(dir).with_module_loader(RhaiModuleLoader::new())
    }

    /// Loader that recognizes no entry files until one is added.
    pub fn without_modules(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            module_loaders: Vec::new(),
        }
    }

    pub fn with_module_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.module_loaders.push(Box::new(loader));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run discovery. Never fails: problems end up in `inactive` or the log.
    pub fn load(&self) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        for (id, dir) in self.plugin_dirs() {
            match self.load_one(&id, &dir) {
                None => {}
                Some(Ok(plugin)) => {
                    plugin.log.info("loaded");
                    outcome.plugins.push(plugin);
                }
                Some(Err(record)) => outcome.inactive.push(record),
            }
        }

        tracing::info!(
            "Plugins: {} loaded, {} inactive ({})",
            outcome.plugins.len(),
            outcome.inactive.len(),
            display_relative(&self.dir)
        );
        outcome
    }

    /// Subdirectories sorted by name.
    fn plugin_dirs(&self) -> Vec<(String, PathBuf)> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::info!("No plugins loaded from {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut dirs: Vec<(String, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                Some((name, entry.path()))
            })
            .collect();
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        dirs
    }

    /// `None` when the directory has no manifest.
    fn load_one(
        &self,
        id: &str,
        dir: &Path,
    ) -> Option<Result<PluginDescriptor, InactivePluginRecord>> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return None;
        }

        let dir_log = PluginLog::new(id, display_relative(dir));
        let fallback_name = dir.display().to_string();

        let reject = |log: &PluginLog,
                      name: &str,
                      prefixes: &[String],
                      reason: InactiveReason|
         -> Result<PluginDescriptor, InactivePluginRecord> {
            log.warn(&format!("not loaded: {reason}"));
            Err(InactivePluginRecord {
                name: name.to_string(),
                plugin_id: id.to_string(),
                reason,
                url_prefixes: prefixes.to_vec(),
            })
        };

        let manifest = match PluginManifest::read(id, &manifest_path) {
            Ok(m) => m,
            Err(e) => {
                dir_log.warn(&e.to_string());
                return Some(reject(
                    &dir_log,
                    &fallback_name,
                    &[],
                    InactiveReason::ManifestUnreadable,
                ));
            }
        };

        let name = manifest.name.clone().unwrap_or(fallback_name);
        let prefixes = manifest.link_with.clone();

        if !manifest.enabled {
            return Some(reject(&dir_log, &name, &prefixes, InactiveReason::Disabled));
        }

        let Some(entry_rel) = manifest.entry() else {
            return Some(reject(&dir_log, &name, &prefixes, InactiveReason::MissingEntry));
        };

        let entry = dir.join(entry_rel);
        let module_loader = self.module_loaders.iter().find(|l| l.accepts(&entry));
        let Some(module_loader) = module_loader.filter(|_| entry.is_file()) else {
            let err = RelayError::Entry {
                plugin: id.to_string(),
                message: format!("'{entry_rel}' not found or not a recognized module"),
            };
            dir_log.warn(&err.to_string());
            return Some(reject(&dir_log, &name, &prefixes, InactiveReason::EntryNotFound));
        };

        let load_ctx = LoadContext {
            plugin_id: id.to_string(),
            plugin_dir: dir.to_path_buf(),
        };
        let handler = match module_loader.import(&entry, &load_ctx) {
            Ok(h) => h,
            Err(e) => {
                let err = RelayError::Entry {
                    plugin: id.to_string(),
                    message: format!("import of '{entry_rel}' failed: {e:#}"),
                };
                dir_log.warn(&err.to_string());
                return Some(reject(&dir_log, &name, &prefixes, InactiveReason::ImportFailed));
            }
        };

        let capabilities = handler.capabilities();
        if !capabilities.on_request {
            let err = RelayError::Contract {
                plugin: id.to_string(),
                message: "no on_request(ctx, log) hook".into(),
            };
            dir_log.warn(&err.to_string());
            return Some(reject(
                &dir_log,
                &name,
                &prefixes,
                InactiveReason::MissingOnRequest,
            ));
        }

        Some(Ok(PluginDescriptor {
            id: id.to_string(),
            log: PluginLog::new(name.clone(), display_relative(&entry)),
            name,
            dir: dir.to_path_buf(),
            entry,
            url_prefixes: prefixes,
            command_name: manifest.command_name,
            handler,
            capabilities,
        }))
    }
}

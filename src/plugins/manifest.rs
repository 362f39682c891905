// src/plugins/manifest.rs — Per-directory plugin manifest (`plugin.json`)

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::infra::errors::RelayError;

pub const MANIFEST_FILE: &str = "plugin.json";

/// Parsed `plugin.json`. Unknown fields are ignored, and a field of the
/// wrong JSON type reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PluginManifest {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    /// Entry module, relative to the plugin directory.
    #[serde(default, deserialize_with = "lenient")]
    pub main: Option<String>,
    /// Only a literal `false` disables.
    #[serde(default = "default_true", deserialize_with = "not_false")]
    pub enabled: bool,
    /// URL prefixes this plugin handles. Non-string entries are dropped.
    #[serde(default, rename = "link-with", deserialize_with = "string_list")]
    pub link_with: Vec<String>,
    #[serde(default, rename = "commandName", deserialize_with = "lenient")]
    pub command_name: Option<String>,
}

fn default_true() -> bool {
    true
}

fn lenient<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(de)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn not_false<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(!matches!(Value::deserialize(de)?, Value::Bool(false)))
}

fn string_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

impl PluginManifest {
    pub fn parse(plugin: &str, raw: &str) -> Result<Self, RelayError> {
        serde_json::from_str(raw).map_err(|e| RelayError::Manifest {
            plugin: plugin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn read(plugin: &str, path: &Path) -> Result<Self, RelayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| RelayError::Manifest {
            plugin: plugin.to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        Self::parse(plugin, &raw)
    }

    /// Entry path, if declared and non-empty.
    pub fn entry(&self) -> Option<&str> {
        self.main.as_deref().filter(|m| !m.trim().is_empty())
    }
}

// src/api/types.rs

use serde::{Deserialize, Serialize};

use crate::plugins::context::{DataItem, Notification, Severity};
use crate::plugins::handler::ScriptControl;

/// Body of `POST /api/metadata/scrape`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub site: String,
    pub data: Vec<DataItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
}

/// A notification as the browser agent sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBody {
    #[serde(rename = "pluginInfo")]
    pub plugin_info: PluginInfo,
    pub info: String,
    #[serde(rename = "type")]
    pub kind: Severity,
}

impl From<Notification> for NotificationBody {
    fn from(n: Notification) -> Self {
        Self {
            plugin_info: PluginInfo { name: n.plugin },
            info: n.info,
            kind: n.severity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Vec<NotificationBody>,
}

/// `{code, message, data}` envelope used by the plugin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// One plugin panel in `GET /api/plugin/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginPanelEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub controls: Vec<ScriptControl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleContext {
    pub data: Vec<DataItem>,
    pub site: String,
}

/// Body of `POST /api/plugin/toggle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: String,
    pub id: String,
    pub context: ToggleContext,
}

/// Composite channel key `plugin:<name>:<id>:<channel>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelKey {
    pub plugin_name: String,
    pub plugin_id: String,
    pub channel: String,
}

impl ChannelKey {
    pub fn new(plugin_name: &str, plugin_id: &str, channel: &str) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            plugin_id: plugin_id.to_string(),
            channel: channel.to_string(),
        }
    }

    /// Name and id may not contain `:`; the channel may.
    pub fn parse(key: &str) -> Option<Self> {
        let rest = key.strip_prefix("plugin:")?;
        let mut parts = rest.splitn(3, ':');
        let name = parts.next().filter(|s| !s.is_empty())?;
        let id = parts.next().filter(|s| !s.is_empty())?;
        let channel = parts.next().filter(|s| !s.is_empty())?;
        Some(Self::new(name, id, channel))
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "plugin:{}:{}:{}",
            self.plugin_name, self.plugin_id, self.channel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_key_round_trip() {
        let key = ChannelKey::new("Pixiv", "pixiv", "save:all");
        assert_eq!(key.to_string(), "plugin:Pixiv:pixiv:save:all");
        assert_eq!(ChannelKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn test_channel_key_rejects_malformed() {
        for bad in ["plugin:a:b", "plugin::b:c", "plugin:a::c", "other:a:b:c", ""] {
            assert!(ChannelKey::parse(bad).is_none(), "{bad}");
        }
    }

    #[test]
    fn test_notification_body_shape() {
        let body = NotificationBody::from(Notification {
            plugin: "demo".into(),
            info: "saved".into(),
            severity: Severity::Success,
        });
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"pluginInfo": {"name": "demo"}, "info": "saved", "type": "success"})
        );
    }
}

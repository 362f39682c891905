// src/plugins/context.rs — What a plugin sees: site, payload, utils, logger

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::utils::Utils;

/// Severity of a notification pushed back to the browser agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warn,
    #[default]
    Info,
}

impl Severity {
    /// Parse a severity name; anything unrecognized is `Info`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message a plugin pushed for operator/UI display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub plugin: String,
    pub info: String,
    pub severity: Severity,
}

/// Write-only collector shared between the dispatcher and one plugin call.
#[derive(Debug, Clone, Default)]
pub struct NotificationSink {
    inner: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        if let Ok(mut items) = self.inner.lock() {
            items.push(notification);
        }
    }

    /// Take everything collected so far.
    pub fn drain(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .map(|mut items| std::mem::take(&mut *items))
            .unwrap_or_default()
    }
}

/// Leveled logger bound to one plugin (or to the system).
///
/// Lines go through `tracing` tagged with the owner and its location.
/// During dispatch the logger also carries a sink, fed by `to_web`.
#[derive(Debug, Clone)]
pub struct PluginLog {
    tag: String,
    location: String,
    sink: Option<NotificationSink>,
}

impl PluginLog {
    pub fn new(tag: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            location: location.into(),
            sink: None,
        }
    }

    /// Logger for system-owned commands and messages.
    pub fn system(tag: &str) -> Self {
        Self::new(tag, "")
    }

    /// Clone of this logger that feeds `sink` on `to_web`.
    pub fn with_sink(&self, sink: NotificationSink) -> Self {
        Self {
            sink: Some(sink),
            ..self.clone()
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!(plugin = %self.tag, "{}", msg);
    }

    pub fn info(&self, msg: &str) {
        tracing::info!(plugin = %self.tag, "{}", msg);
    }

    pub fn warn(&self, msg: &str) {
        tracing::warn!(plugin = %self.tag, at = %self.location, "{}", msg);
    }

    pub fn error(&self, msg: &str) {
        tracing::error!(plugin = %self.tag, at = %self.location, "{}", msg);
    }

    /// Push a notification back to the caller of the current dispatch.
    pub fn to_web(&self, info: &str, severity: Severity) {
        match self.sink {
            Some(ref sink) => sink.push(Notification {
                plugin: self.tag.clone(),
                info: info.to_string(),
                severity,
            }),
            None => self.debug(&format!("to_web outside a request ({}): {}", severity, info)),
        }
    }
}

/// Breakdown of the submitted page address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub url: String,
    /// Normalized match target (origin + path, one trailing slash stripped).
    pub root_url: String,
    pub origin: String,
    pub pathname: String,
}

/// One captured element from the browser agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Context handed to `on_request` and panel triggers.
#[derive(Clone)]
pub struct RequestContext {
    pub site: SiteInfo,
    pub data: Vec<DataItem>,
    pub utils: Utils,
}

/// Context handed to `on_load`.
#[derive(Debug, Clone)]
pub struct LoadContext {
    pub plugin_id: String,
    pub plugin_dir: PathBuf,
}

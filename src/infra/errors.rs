// src/infra/errors.rs — Error types for siterelay

use thiserror::Error;

use crate::commands::CommandError;

#[derive(Error, Debug)]
pub enum RelayError {
    // Loader-time errors. The loader recovers from these locally by
    // downgrading the plugin to inactive; they surface only in logs.
    #[error("Manifest error in '{plugin}': {message}")]
    Manifest { plugin: String, message: String },

    #[error("Entry error in '{plugin}': {message}")]
    Entry { plugin: String, message: String },

    #[error("Plugin '{plugin}' does not satisfy the plugin contract: {message}")]
    Contract { plugin: String, message: String },

    // Console
    #[error(transparent)]
    Command(#[from] CommandError),

    // Plugin logic
    #[error("Plugin '{plugin}' failed: {message}")]
    Handler { plugin: String, message: String },

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

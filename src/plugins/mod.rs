// src/plugins/mod.rs — Plugin system: discovery, lifecycle and dispatch

pub mod context;
pub mod dispatch;
pub mod handler;
pub mod lifecycle;
pub mod loader;
pub mod manifest;
pub mod rhai_host;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use handler::{Capabilities, ModuleLoader, PluginHandler, ScriptControl, ScriptPanel};
pub use loader::{InactivePluginRecord, InactiveReason, LoadOutcome, PluginDescriptor, PluginLoader};

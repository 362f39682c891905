// src/cli/mod.rs — CLI definition (clap derive)

pub mod console;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "siterelay",
    about = "Local relay that routes captured pages to site plugins",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Plugins directory
    #[arg(long)]
    pub plugins_dir: Option<PathBuf>,

    /// Do not read console commands from stdin
    #[arg(long)]
    pub no_console: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the relay server (default)
    Serve,
    /// Load plugins, print loaded and inactive ones, then exit
    Plugins,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref dir) = self.plugins_dir {
            config.plugins.dir = Some(dir.clone());
        }
        if self.no_console {
            config.console.enabled = false;
        }
    }
}

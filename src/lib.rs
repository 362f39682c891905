// src/lib.rs — Library root for siterelay

pub mod api;
pub mod cli;
pub mod commands;
pub mod infra;
pub mod plugins;
pub mod utils;

//! CLI module
//!
//! Subcommands for running the cache service.

pub mod serve;

use clap::{Parser, Subcommand};

/// Semantic cache service for LLM agent tool calls
#[derive(Parser)]
#[command(name = "tool-recall")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,
}

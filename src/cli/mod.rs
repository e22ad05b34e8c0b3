//! CLI module for the response cache service
//!
//! - `serve`: run the HTTP server
//! - `resolve-key`: print the key and group a template resolves to

pub mod resolve_key;
pub mod serve;

use clap::{Parser, Subcommand};

/// PMP Response Cache - two-tier read caching for HTTP endpoints
#[derive(Parser)]
#[command(name = "pmp-response-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Resolve a key template against a request description
    ResolveKey(resolve_key::ResolveKeyArgs),
}

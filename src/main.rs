use clap::Parser;
use pmp_response_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::ResolveKey(args) => cli::resolve_key::run(args),
    }
}

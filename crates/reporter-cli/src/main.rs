//! reporter-cli: read and admin client for the beyonder reporter.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod print;

#[cfg(test)]
mod tests;

use clap::Parser;

use args::Cli;
use client::{CliError, build_ctx_from_cli};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;
    handlers::handle(&ctx, cli.command).await
}

//! Evidencer CLI — one-shot acquisition of web sources into a
//! content-addressed evidence tree with a durable source registry.

mod commands;

use std::process::ExitCode;

use clap::Parser;

use commands::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Panic reports only; command errors map to explicit exit codes below.
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporting: {e}");
    }

    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

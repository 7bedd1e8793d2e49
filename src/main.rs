//! glice - graph dataset preparation CLI
//!
//! Generates k-fold split manifests, trains the token-embedding model and
//! assembles node-bounded minibatches from Joern program-dependence graphs.

use anyhow::Result;
use clap::Parser;
use glice::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("glice={}", cli.log_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli)
}

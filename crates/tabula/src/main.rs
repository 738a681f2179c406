//! Tabula command-line entry point.

use clap::Parser;
use tabula::{Cli, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing("info", cli.log_json)?;

    run(cli).await
}

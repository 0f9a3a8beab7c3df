//! pagepatch CLI: idempotent patching of static marketing pages.
//!
//! Applies the stages configured in `pagepatch.toml` to every catalog
//! document, prints one line per document and exits non-zero when any
//! document could not be written.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

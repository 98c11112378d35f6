//! autoresearch CLI: gather research results and move them in and out of XML.
//!
//! Answers a query from keyword-selected sources or a completion endpoint,
//! encodes the results as an XML document, and views or shares saved documents.

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

//! gm2-search binary entrypoint.

use clap::{Parser, Subcommand};
use gm2_search::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gm2-search", version, about = "Weighted catalog search service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the listing refresh endpoint.
    Serve {
        /// Config file path (default: ~/.gm2-search/config.json).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Bind address override.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Search the demo catalog and print matches.
    Search {
        /// Search term.
        term: String,
        /// Sort field: relevance, date, title, price, rand.
        #[arg(long)]
        orderby: Option<String>,
        /// Sort direction: asc or desc.
        #[arg(long)]
        order: Option<String>,
        /// Comma-separated category slugs.
        #[arg(long)]
        categories: Option<String>,
        /// Result page.
        #[arg(long)]
        page: Option<u32>,
        /// Results per page.
        #[arg(long)]
        per_page: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    match args.command {
        Commands::Serve { config, bind } => cli::serve::run(config, bind).await,
        Commands::Search {
            term,
            orderby,
            order,
            categories,
            page,
            per_page,
        } => cli::search_cmd::run(
            &term,
            orderby.as_deref(),
            order.as_deref(),
            categories.as_deref(),
            page,
            per_page,
        ),
    }
}

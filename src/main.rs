//! Main entry point for the Kannada news CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kannada_news::cli::{self, commands::Commands};

/// Kannada Tech News - fetch, translate and publish tech stories
#[derive(Parser, Debug)]
#[command(name = "kannada-news", version, about, long_about = None)]
struct Args {
    /// Anthropic API key (optional, defaults to ANTHROPIC_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={}", env!("CARGO_PKG_NAME").replace('-', "_"), log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Override config with CLI args if provided
    if let Some(api_key) = args.api_key {
        std::env::set_var("ANTHROPIC_API_KEY", api_key);
    }

    match args.command {
        Some(Commands::Run {
            config,
            articles_per_run,
        }) => {
            cli::commands::handle_run(config, articles_per_run).await?;
        }
        Some(Commands::Feeds { config }) => {
            cli::commands::handle_feeds(config).await?;
        }
        Some(Commands::Articles {
            limit,
            featured,
            category,
        }) => {
            cli::commands::handle_articles(limit, featured, category).await?;
        }
        Some(Commands::Server { host, port }) => {
            cli::commands::handle_server(host, port).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}

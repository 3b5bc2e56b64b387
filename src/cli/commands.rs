//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::BotConfig;

/// Commands for the Kannada news bot
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, translate and publish new articles
    Run {
        /// Bot config file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Articles to publish in this run
        #[arg(short = 'n', long)]
        articles_per_run: Option<usize>,
    },

    /// List stories the next run would pick up, without publishing
    Feeds {
        /// Bot config file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print published articles from the database
    Articles {
        /// Maximum number of articles
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Only featured articles
        #[arg(long)]
        featured: bool,

        /// Category slug
        #[arg(long)]
        category: Option<String>,
    },

    /// Start HTTP API server
    Server {
        /// Bind address (default: 0.0.0.0)
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Listen port (default: 8000)
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },
}

fn load_bot_config(path: Option<PathBuf>) -> anyhow::Result<BotConfig> {
    let config = match path {
        Some(path) => BotConfig::from_file(&path)?,
        None => BotConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}

/// Handle the publishing run
pub async fn handle_run(config: Option<PathBuf>, articles_per_run: Option<usize>) -> anyhow::Result<()> {
    use crate::core::client::AsyncTranslator;
    use crate::core::models::FeedItem;
    use crate::core::supabase::SupabaseClient;
    use crate::pipeline::bot::NewsBot;
    use crate::pipeline::feeds::FeedFetcher;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tracing::{info, warn};

    let start_time = Instant::now();

    let mut config = load_bot_config(config)?;
    if let Some(n) = articles_per_run {
        config.articles_per_run = n;
        config.validate()?;
    }

    let store = Arc::new(SupabaseClient::from_service_env()?);
    let translator = Arc::new(AsyncTranslator::from_env()?);
    let feeds = Arc::new(FeedFetcher::new(&config)?);

    info!("Starting run with {} feeds", feeds.feeds().len());
    info!("Articles per run: {}", config.articles_per_run);
    if translator.quota_is_low().await {
        warn!("Less than 10% of the daily token budget left ({} tokens)", translator.remaining_tokens().await);
    }

    let pb = ProgressBar::new(config.articles_per_run as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let hook_pb = pb.clone();
    let bot = NewsBot::new(config, feeds, translator.clone(), store).with_progress(Box::new(
        move |item: &FeedItem, ok: bool| {
            let title: String = item.title_en.chars().take(40).collect();
            hook_pb.set_message(if ok { title } else { format!("failed: {}", title) });
            hook_pb.inc(1);
        },
    ));

    let summary = bot.run().await?;
    pb.set_length(summary.attempted as u64);
    pb.finish_with_message("Completed");

    let usage = translator.get_token_usage().await;
    let model = translator.get_current_model().await;
    let duration = start_time.elapsed();
    info!(
        "Completed: {} posted, {} failed in {:?}",
        summary.posted, summary.failed, duration
    );

    println!("\n✅ Run completed!");
    println!("   Found: {} ({} new)", summary.found, summary.fresh);
    println!("   Posted: {}/{}", summary.posted, summary.attempted);
    println!("   Failed: {}", summary.failed);
    if summary.deferred > 0 {
        println!("   Deferred: {} (token quota or config problem, retried next run)", summary.deferred);
    }
    println!("   Model: {}", model);
    println!("   Tokens used today: {} ({} left)", usage.used_today, usage.remaining());
    println!("   Time: {:?}", duration);

    Ok(())
}

/// Handle listing pending feed items
pub async fn handle_feeds(config: Option<PathBuf>) -> anyhow::Result<()> {
    use crate::core::supabase::SupabaseClient;
    use crate::pipeline::bot::pending_items;
    use crate::pipeline::feeds::FeedFetcher;
    use crate::pipeline::text::{detect_category, make_slug};

    let config = load_bot_config(config)?;
    let feeds = FeedFetcher::new(&config)?;
    let store = SupabaseClient::from_service_env()?;
    let (found, pending) = pending_items(&feeds, &store).await?;
    let per_run = config.articles_per_run;
    let categories = &config.categories;

    println!("Found {} stories, {} not yet processed\n", found, pending.len());
    for (i, item) in pending.iter().enumerate() {
        let marker = if i < per_run { "*" } else { " " };
        let category = detect_category(&item.title_en, &item.summary_en, categories).unwrap_or("-");
        println!("{} [{}] {}", marker, item.source_name, item.title_en);
        println!("    {} | {}", category, make_slug(&item.title_en, &item.source_url));
    }

    Ok(())
}

/// Handle printing published articles
pub async fn handle_articles(limit: usize, featured: bool, category: Option<String>) -> anyhow::Result<()> {
    use crate::core::models::ArticleQuery;
    use crate::core::store::NewsStore;
    use crate::core::supabase;

    let client = supabase::shared()?;
    let query = ArticleQuery {
        limit: Some(limit),
        featured_only: featured,
        category,
    };

    let articles = client.list_articles(&query).await?;
    if articles.is_empty() {
        println!("No articles found");
        return Ok(());
    }

    for article in articles {
        let category = article
            .categories
            .as_ref()
            .map(|c| c.name_en.as_str())
            .unwrap_or("-");
        let star = if article.is_featured { "★" } else { " " };
        println!("{} {} ({})", star, article.title_kn, article.title_en);
        println!(
            "    /{} | {} | {} | {} views",
            article.slug, category, article.published_at, article.view_count
        );
    }

    Ok(())
}

/// Handle server command
pub async fn handle_server(host: String, port: u16) -> anyhow::Result<()> {
    use crate::core::supabase;
    use crate::server::api::run_server;
    use tracing::info;

    let store = Arc::new(supabase::shared()?.clone());

    info!("Starting HTTP server on {}:{}", host, port);
    println!("🚀 Server starting on http://{}:{}", host, port);

    run_server(host, port, store).await?;

    Ok(())
}

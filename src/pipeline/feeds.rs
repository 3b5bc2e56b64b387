//! RSS/Atom fetching and candidate extraction

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::config::BotConfig;
use crate::core::errors::{NewsError, Result};
use crate::core::models::{FeedItem, FeedSource};
use crate::pipeline::text::{strip_html, truncate_chars};

/// Source of candidate stories for a run
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// All usable, de-duplicated items across feeds
    async fn fetch_items(&self) -> Vec<FeedItem>;
}

/// Limits applied while turning feed entries into candidates
#[derive(Debug, Clone, Copy)]
pub struct EntryLimits {
    pub entries_per_feed: usize,
    pub min_summary_chars: usize,
    pub max_summary_chars: usize,
}

impl From<&BotConfig> for EntryLimits {
    fn from(config: &BotConfig) -> Self {
        Self {
            entries_per_feed: config.entries_per_feed,
            min_summary_chars: config.min_summary_chars,
            max_summary_chars: config.max_summary_chars,
        }
    }
}

/// Parse one feed document into candidate items
pub fn parse_feed(body: &[u8], source: &FeedSource, limits: EntryLimits) -> Result<Vec<FeedItem>> {
    let feed = feed_rs::parser::parse(body).map_err(|e| NewsError::FeedError {
        feed: source.name.clone(),
        message: e.to_string(),
    })?;

    let items = feed
        .entries
        .into_iter()
        .take(limits.entries_per_feed)
        .filter_map(|entry| {
            let url = entry.links.first().map(|l| l.href.trim().to_string())?;
            let title = entry
                .title
                .map(|t| strip_html(&t.content))
                .unwrap_or_default();

            let raw_summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();
            let summary = truncate_chars(&strip_html(&raw_summary), limits.max_summary_chars)
                .trim_end()
                .to_string();

            if url.is_empty() || title.is_empty() || summary.chars().count() < limits.min_summary_chars {
                return None;
            }

            let thumbnail_url = entry
                .media
                .iter()
                .flat_map(|m| m.thumbnails.iter())
                .map(|t| t.image.uri.clone())
                .next();

            Some(FeedItem {
                title_en: title,
                summary_en: summary,
                source_url: url,
                source_name: source.name.clone(),
                thumbnail_url,
                original_published_at: entry.published.or(entry.updated),
            })
        })
        .collect();

    Ok(items)
}

/// Keep the first occurrence of each source URL, preserving order
pub fn dedupe_by_url(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.source_url.clone()))
        .collect()
}

/// Fetches the configured feeds over HTTP
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    feeds: Vec<FeedSource>,
    limits: EntryLimits,
}

impl FeedFetcher {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            feeds: config.feeds.clone(),
            limits: EntryLimits::from(config),
        })
    }

    /// Sources fetched by this fetcher, in order
    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    /// Fetch and parse one feed
    pub async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<FeedItem>> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| NewsError::FeedError {
                feed: source.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::FeedError {
                feed: source.name.clone(),
                message: format!("HTTP {}", status),
            });
        }

        let body = response.bytes().await?;
        parse_feed(&body, source, self.limits)
    }
}

#[async_trait]
impl FeedProvider for FeedFetcher {
    async fn fetch_items(&self) -> Vec<FeedItem> {
        let mut items = Vec::new();
        for source in &self.feeds {
            info!("Fetching: {}", source.name);
            match self.fetch_feed(source).await {
                Ok(mut fetched) => {
                    if fetched.is_empty() {
                        warn!("No usable entries in {}", source.name);
                    }
                    items.append(&mut fetched);
                }
                Err(e) => error!("Failed to fetch {}: {}", source.name, e),
            }
        }

        let unique = dedupe_by_url(items);
        info!("Total unique articles found: {}", unique.len());
        unique
    }
}

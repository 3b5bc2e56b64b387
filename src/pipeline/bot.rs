//! One publishing run: fetch, filter, translate, classify, insert

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::client::ArticleTranslator;
use crate::core::config::BotConfig;
use crate::core::errors::Result;
use crate::core::models::{FeedItem, NewArticle, ScrapeLogEntry, TranslationRequest};
use crate::core::store::NewsStore;
use crate::pipeline::feeds::FeedProvider;
use crate::pipeline::text::{detect_category, make_slug};

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unique items found across feeds
    pub found: usize,
    /// Items not seen by an earlier run
    pub fresh: usize,
    pub attempted: usize,
    pub posted: usize,
    pub failed: usize,
    /// Left unprocessed because the run stopped early; picked up next time
    pub deferred: usize,
}

/// Items from `feeds` that `store` has not seen yet, with the total found
pub async fn pending_items(
    feeds: &dyn FeedProvider,
    store: &dyn NewsStore,
) -> Result<(usize, Vec<FeedItem>)> {
    let all = feeds.fetch_items().await;
    let found = all.len();

    let mut fresh = Vec::new();
    for item in all {
        if !store.is_scraped(&item.source_url).await? {
            fresh.push(item);
        }
    }
    Ok((found, fresh))
}

/// Called after each processed item with its title and outcome
pub type ProgressHook = Box<dyn Fn(&FeedItem, bool) + Send + Sync>;

/// Fetches, translates and publishes new stories
pub struct NewsBot {
    config: BotConfig,
    feeds: Arc<dyn FeedProvider>,
    translator: Arc<dyn ArticleTranslator>,
    store: Arc<dyn NewsStore>,
    on_progress: Option<ProgressHook>,
}

impl NewsBot {
    pub fn new(
        config: BotConfig,
        feeds: Arc<dyn FeedProvider>,
        translator: Arc<dyn ArticleTranslator>,
        store: Arc<dyn NewsStore>,
    ) -> Self {
        Self {
            config,
            feeds,
            translator,
            store,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.on_progress = Some(hook);
        self
    }

    /// Items that would be attempted by the next run
    pub async fn pending(&self) -> Result<(usize, Vec<FeedItem>)> {
        pending_items(self.feeds.as_ref(), self.store.as_ref()).await
    }

    /// Process up to `articles_per_run` fresh items, logging each outcome
    pub async fn run(&self) -> Result<RunSummary> {
        info!("Bot started at {}", chrono::Utc::now().to_rfc3339());

        let (found, fresh) = self.pending().await?;
        let mut summary = RunSummary {
            found,
            fresh: fresh.len(),
            ..Default::default()
        };
        info!("New (unscraped) articles: {}", summary.fresh);

        if fresh.is_empty() {
            info!("No new articles to process");
            return Ok(summary);
        }

        let to_process: Vec<FeedItem> = fresh.into_iter().take(self.config.articles_per_run).collect();

        for (index, item) in to_process.iter().enumerate() {
            info!("Processing: {}", item.title_en.chars().take(60).collect::<String>());

            let outcome = self.publish(item).await;
            let ok = outcome.is_ok();
            match outcome {
                Ok(title_kn) => {
                    summary.attempted += 1;
                    summary.posted += 1;
                    info!("Posted: {}", title_kn.chars().take(50).collect::<String>());
                    self.record(ScrapeLogEntry::success(&item.source_url)).await;
                }
                Err(e) if e.halts_run() => {
                    // not logged, so these stay pending for the next run
                    summary.deferred = to_process.len() - index;
                    warn!("Stopping run, {} articles deferred: {}", summary.deferred, e);
                    break;
                }
                Err(e) => {
                    summary.attempted += 1;
                    summary.failed += 1;
                    error!("Failed for {}: {}", item.source_url, e);
                    self.record(ScrapeLogEntry::failed(&item.source_url, e.to_string())).await;
                }
            }

            if let Some(hook) = &self.on_progress {
                hook(item, ok);
            }
        }

        info!("Done. Posted {}/{} articles", summary.posted, summary.attempted);
        Ok(summary)
    }

    /// Translate, classify and insert one item; returns the Kannada title
    async fn publish(&self, item: &FeedItem) -> Result<String> {
        let request = TranslationRequest::new(&item.title_en, &item.summary_en);
        let translated = self.translator.translate(&request).await?.translation;

        if self.config.translation_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.translation_delay_ms)).await;
        }

        let category_id = match detect_category(&item.title_en, &item.summary_en, &self.config.categories) {
            Some(slug) => self.store.category_id(slug).await?,
            None => None,
        };

        let article = NewArticle {
            title_kn: translated.title_kn.clone(),
            title_en: item.title_en.clone(),
            summary_kn: translated.summary_kn,
            summary_en: item.summary_en.clone(),
            source_url: item.source_url.clone(),
            source_name: item.source_name.clone(),
            thumbnail_url: item.thumbnail_url.clone(),
            category_id,
            slug: make_slug(&item.title_en, &item.source_url),
            meta_description: translated.meta_description,
            is_published: true,
            original_published_at: item.original_published_at,
        };

        self.store.insert_article(&article).await?;
        Ok(translated.title_kn)
    }

    async fn record(&self, entry: ScrapeLogEntry) {
        if let Err(e) = self.store.log_scrape(&entry).await {
            warn!("Could not record {} in scrape log: {}", entry.source_url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::default_category_rules;
    use crate::core::errors::NewsError;
    use crate::core::models::{
        Category, ScrapeStatus, TranslatedArticle, TranslationResult,
    };
    use crate::core::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFeeds(Vec<FeedItem>);

    #[async_trait]
    impl FeedProvider for FixedFeeds {
        async fn fetch_items(&self) -> Vec<FeedItem> {
            self.0.clone()
        }
    }

    /// Fails for titles containing "fail", counts calls
    #[derive(Default)]
    struct FakeTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArticleTranslator for FakeTranslator {
        async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.title_en.contains("fail") {
                return Err(NewsError::InvalidResponseError {
                    message: "No JSON found".to_string(),
                });
            }
            Ok(TranslationResult {
                translation: TranslatedArticle {
                    title_kn: format!("ಕನ್ನಡ {}", request.title_en),
                    summary_kn: "ಸಾರಾಂಶ".to_string(),
                    meta_description: "ವಿವರಣೆ".to_string(),
                },
                tokens_used: 10,
                model_used: "fake".to_string(),
                request_id: None,
            })
        }
    }

    fn item(title: &str, url: &str) -> FeedItem {
        FeedItem {
            title_en: title.to_string(),
            summary_en: "A summary long enough to pass the feed filters easily.".to_string(),
            source_url: url.to_string(),
            source_name: "Example".to_string(),
            thumbnail_url: None,
            original_published_at: None,
        }
    }

    fn config(per_run: usize) -> BotConfig {
        BotConfig {
            articles_per_run: per_run,
            translation_delay_ms: 0,
            categories: default_category_rules(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_posts_and_logs() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_category(
                "cat-space",
                Category {
                    name_kn: "ಬಾಹ್ಯಾಕಾಶ".to_string(),
                    name_en: "Space".to_string(),
                    slug: "space-tech".to_string(),
                    color: "#6366F1".to_string(),
                },
            )
            .await;

        let feeds = Arc::new(FixedFeeds(vec![
            item("NASA rocket test", "https://example.com/nasa"),
            item("Quarterly earnings", "https://example.com/earnings"),
        ]));
        let translator = Arc::new(FakeTranslator::default());

        let bot = NewsBot::new(config(5), feeds, translator.clone(), store.clone());
        let summary = bot.run().await.unwrap();

        assert_eq!(summary, RunSummary { found: 2, fresh: 2, attempted: 2, posted: 2, failed: 0, deferred: 0 });

        let inserted = store.inserted().await;
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[0].category_id.as_deref(), Some("cat-space"));
        assert!(inserted[0].is_published);
        assert_eq!(inserted[0].title_kn, "ಕನ್ನಡ NASA rocket test");
        assert!(inserted[0].slug.starts_with("nasa-rocket-test-"));
        assert_eq!(inserted[1].category_id, None);

        let log = store.scrape_log().await;
        assert!(log.iter().all(|e| e.status == ScrapeStatus::Success));
    }

    #[tokio::test]
    async fn test_run_skips_already_scraped_and_limits() {
        let store = Arc::new(MemoryStore::new());
        store
            .log_scrape(&ScrapeLogEntry::success("https://example.com/a"))
            .await
            .unwrap();

        let feeds = Arc::new(FixedFeeds(vec![
            item("A", "https://example.com/a"),
            item("B", "https://example.com/b"),
            item("C", "https://example.com/c"),
            item("D", "https://example.com/d"),
        ]));
        let translator = Arc::new(FakeTranslator::default());

        let bot = NewsBot::new(config(2), feeds, translator.clone(), store.clone());
        let summary = bot.run().await.unwrap();

        assert_eq!(summary.found, 4);
        assert_eq!(summary.fresh, 3);
        assert_eq!(summary.attempted, 2);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);

        let urls: Vec<String> = store.inserted().await.into_iter().map(|a| a.source_url).collect();
        assert_eq!(urls, vec!["https://example.com/b", "https://example.com/c"]);
    }

    #[tokio::test]
    async fn test_failure_is_logged_and_run_continues() {
        let store = Arc::new(MemoryStore::new());
        let feeds = Arc::new(FixedFeeds(vec![
            item("This will fail", "https://example.com/bad"),
            item("This works", "https://example.com/good"),
        ]));

        let bot = NewsBot::new(config(5), feeds, Arc::new(FakeTranslator::default()), store.clone());
        let summary = bot.run().await.unwrap();

        assert_eq!(summary.posted, 1);
        assert_eq!(summary.failed, 1);

        let log = store.scrape_log().await;
        let bad = log.iter().find(|e| e.source_url == "https://example.com/bad").unwrap();
        assert_eq!(bad.status, ScrapeStatus::Failed);
        assert!(bad.error_message.as_deref().unwrap().contains("No JSON found"));

        // failed URLs are not retried by the next run
        let (_, pending) = bot.pending().await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_new() {
        let store = Arc::new(MemoryStore::new());
        let translator = Arc::new(FakeTranslator::default());
        let bot = NewsBot::new(config(5), Arc::new(FixedFeeds(vec![])), translator.clone(), store);

        let summary = bot.run().await.unwrap();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_hook_sees_every_item() {
        let store = Arc::new(MemoryStore::new());
        let feeds = Arc::new(FixedFeeds(vec![
            item("fail here", "https://example.com/1"),
            item("fine", "https://example.com/2"),
        ]));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let bot = NewsBot::new(config(5), feeds, Arc::new(FakeTranslator::default()), store)
            .with_progress(Box::new(move |_: &FeedItem, _: bool| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        bot.run().await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    /// Succeeds `budget` times, then reports the daily quota as spent
    struct BudgetTranslator {
        budget: usize,
        inner: FakeTranslator,
    }

    #[async_trait]
    impl ArticleTranslator for BudgetTranslator {
        async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
            if self.inner.calls.load(Ordering::SeqCst) >= self.budget {
                return Err(NewsError::QuotaExceededError);
            }
            self.inner.translate(request).await
        }
    }

    #[tokio::test]
    async fn test_exhausted_quota_leaves_items_pending() {
        let store = Arc::new(MemoryStore::new());
        let feeds = Arc::new(FixedFeeds(vec![
            item("One", "https://example.com/1"),
            item("Two", "https://example.com/2"),
            item("Three", "https://example.com/3"),
        ]));
        let translator = Arc::new(BudgetTranslator { budget: 0, inner: FakeTranslator::default() });

        let bot = NewsBot::new(config(5), feeds, translator, store.clone());
        let summary = bot.run().await.unwrap();

        assert_eq!(
            summary,
            RunSummary { found: 3, fresh: 3, attempted: 0, posted: 0, failed: 0, deferred: 3 }
        );
        assert!(store.scrape_log().await.is_empty());

        let (_, pending) = bot.pending().await.unwrap();
        assert_eq!(pending.len(), 3);
    }

    #[tokio::test]
    async fn test_quota_mid_run_defers_the_rest() {
        let store = Arc::new(MemoryStore::new());
        let feeds = Arc::new(FixedFeeds(vec![
            item("One", "https://example.com/1"),
            item("Two", "https://example.com/2"),
            item("Three", "https://example.com/3"),
        ]));
        let translator = Arc::new(BudgetTranslator { budget: 1, inner: FakeTranslator::default() });

        let bot = NewsBot::new(config(5), feeds, translator, store.clone());
        let summary = bot.run().await.unwrap();

        assert_eq!(summary.posted, 1);
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.deferred, 2);

        let (_, pending) = bot.pending().await.unwrap();
        let urls: Vec<&str> = pending.iter().map(|i| i.source_url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/2", "https://example.com/3"]);
    }

    #[tokio::test]
    async fn test_pending_items_without_a_bot() {
        let store = MemoryStore::new();
        store.log_scrape(&ScrapeLogEntry::failed("https://example.com/a", "x")).await.unwrap();
        let feeds = FixedFeeds(vec![
            item("A", "https://example.com/a"),
            item("B", "https://example.com/b"),
        ]);

        let (found, fresh) = pending_items(&feeds, &store).await.unwrap();
        assert_eq!(found, 2);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].source_url, "https://example.com/b");
    }
}

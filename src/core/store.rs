//! Storage seam between the bot, the read API and the backend

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::errors::Result;
use crate::core::models::{
    Article, ArticleQuery, Category, NewArticle, ScrapeLogEntry,
};

#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Published articles, newest first
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>>;

    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Category id for a slug; `None` for an empty or unknown slug
    async fn category_id(&self, slug: &str) -> Result<Option<String>>;

    /// Whether this source URL was processed by an earlier run
    async fn is_scraped(&self, source_url: &str) -> Result<bool>;

    async fn log_scrape(&self, entry: &ScrapeLogEntry) -> Result<()>;

    async fn insert_article(&self, article: &NewArticle) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    articles: Vec<Article>,
    categories: Vec<(String, Category)>,
    scrape_log: Vec<ScrapeLogEntry>,
    inserted: Vec<NewArticle>,
}

/// In-process store, used for tests and local previews
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_category(&self, id: impl Into<String>, category: Category) {
        self.state.write().await.categories.push((id.into(), category));
    }

    pub async fn add_article(&self, article: Article) {
        self.state.write().await.articles.push(article);
    }

    pub async fn scrape_log(&self) -> Vec<ScrapeLogEntry> {
        self.state.read().await.scrape_log.clone()
    }

    pub async fn inserted(&self) -> Vec<NewArticle> {
        self.state.read().await.inserted.clone()
    }
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let state = self.state.read().await;
        let mut articles: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| !query.featured_only || a.is_featured)
            .filter(|a| match &query.category {
                Some(slug) => a.categories.as_ref().map(|c| &c.slug) == Some(slug),
                None => true,
            })
            .cloned()
            .collect();

        // RFC 3339 strings in one offset sort chronologically
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        if let Some(limit) = query.limit {
            articles.truncate(limit);
        }
        Ok(articles)
    }

    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let state = self.state.read().await;
        Ok(state.articles.iter().find(|a| a.slug == slug).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.iter().map(|(_, c)| c.clone()).collect())
    }

    async fn category_id(&self, slug: &str) -> Result<Option<String>> {
        if slug.is_empty() {
            return Ok(None);
        }
        let state = self.state.read().await;
        Ok(state
            .categories
            .iter()
            .find(|(_, c)| c.slug == slug)
            .map(|(id, _)| id.clone()))
    }

    async fn is_scraped(&self, source_url: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.scrape_log.iter().any(|e| e.source_url == source_url))
    }

    async fn log_scrape(&self, entry: &ScrapeLogEntry) -> Result<()> {
        self.state.write().await.scrape_log.push(entry.clone());
        Ok(())
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<()> {
        let mut state = self.state.write().await;
        let category = article.category_id.as_ref().and_then(|id| {
            state
                .categories
                .iter()
                .find(|(cid, _)| cid == id)
                .map(|(_, c)| c.clone())
        });

        let row = Article {
            id: format!("mem-{}", state.articles.len() + 1),
            title_kn: article.title_kn.clone(),
            title_en: article.title_en.clone(),
            summary_kn: article.summary_kn.clone(),
            source_url: article.source_url.clone(),
            source_name: article.source_name.clone(),
            thumbnail_url: article.thumbnail_url.clone(),
            slug: article.slug.clone(),
            meta_description: article.meta_description.clone(),
            is_featured: false,
            view_count: 0,
            published_at: chrono::Utc::now().to_rfc3339(),
            categories: category,
        };
        state.articles.push(row);
        state.inserted.push(article.clone());
        Ok(())
    }
}

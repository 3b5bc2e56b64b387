//! Supabase (PostgREST) client handle

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

use crate::core::config::SupabaseConfig;
use crate::core::errors::{NewsError, Result};
use crate::core::models::{
    Article, ArticleQuery, Category, NewArticle, ScrapeLogEntry, ARTICLE_COLUMNS, CATEGORY_COLUMNS,
};
use crate::core::store::NewsStore;

const ARTICLES_TABLE: &str = "articles";
const CATEGORIES_TABLE: &str = "categories";
const SCRAPE_LOG_TABLE: &str = "scrape_log";

static SHARED: OnceLock<SupabaseClient> = OnceLock::new();

/// Process-wide handle built from the public URL and anon key on first use
pub fn shared() -> Result<&'static SupabaseClient> {
    if let Some(client) = SHARED.get() {
        return Ok(client);
    }
    let client = SupabaseClient::from_public_env()?;
    // A concurrent first call may have won the race; either handle is equivalent
    Ok(SHARED.get_or_init(|| client))
}

/// Cheap-to-clone handle for issuing requests to the hosted database
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    config: Arc<SupabaseConfig>,
    rest_url: String,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("url", &self.config.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

impl SupabaseClient {
    /// Create a client for the given service URL and key
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        Self::with_config(SupabaseConfig::new(url, key))
    }

    /// Validate `config` and build a client sending `apikey` and bearer headers
    pub fn with_config(config: SupabaseConfig) -> Result<Self> {
        config.validate()?;

        let key = HeaderValue::from_str(&config.key)
            .map_err(|_| NewsError::config("Supabase key contains invalid header characters"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
            .map_err(|_| NewsError::config("Supabase key contains invalid header characters"))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .build()?;

        let rest_url = config.rest_url();
        Ok(Self {
            client,
            config: Arc::new(config),
            rest_url,
        })
    }

    /// Client for the site: public URL and anonymous key
    pub fn from_public_env() -> Result<Self> {
        Self::with_config(SupabaseConfig::from_public_env()?)
    }

    /// Client for the bot: service URL and service-role key
    pub fn from_service_env() -> Result<Self> {
        Self::with_config(SupabaseConfig::from_service_env()?)
    }

    /// Project URL this client talks to
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, params: &[(&str, String)]) -> Result<Vec<T>> {
        debug!("GET {} {:?}", table, params);
        let response = self
            .client
            .get(self.table_url(table))
            .query(params)
            .send()
            .await
            .map_err(|e| NewsError::NetworkError {
                message: e.to_string(),
            })?;

        let response = check_status(table, response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| NewsError::InvalidResponseError {
                message: e.to_string(),
            })
    }

    async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<()> {
        debug!("POST {}", table);
        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| NewsError::NetworkError {
                message: e.to_string(),
            })?;

        check_status(table, response).await?;
        Ok(())
    }
}

async fn check_status(table: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        return Err(NewsError::RateLimitError { retry_after: None });
    }
    Err(NewsError::DatabaseError {
        table: table.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// PostgREST `eq` filter value
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// Query string for the article read shape
pub(crate) fn article_params(query: &ArticleQuery) -> Vec<(&'static str, String)> {
    // `!inner` turns the embed into a join so the category filter drops rows
    let embed = if query.category.is_some() {
        "categories!inner"
    } else {
        "categories"
    };

    let mut params = vec![
        ("select", format!("{},{}({})", ARTICLE_COLUMNS, embed, CATEGORY_COLUMNS)),
        ("is_published", eq("true")),
        ("order", "published_at.desc".to_string()),
    ];
    if query.featured_only {
        params.push(("is_featured", eq("true")));
    }
    if let Some(category) = &query.category {
        params.push(("categories.slug", eq(category)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

#[async_trait]
impl NewsStore for SupabaseClient {
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        self.select(ARTICLES_TABLE, &article_params(query)).await
    }

    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let mut params = article_params(&ArticleQuery::default());
        params.push(("slug", eq(slug)));
        params.push(("limit", "1".to_string()));
        let rows: Vec<Article> = self.select(ARTICLES_TABLE, &params).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let params = [
            ("select", CATEGORY_COLUMNS.to_string()),
            ("order", "name_en.asc".to_string()),
        ];
        self.select(CATEGORIES_TABLE, &params).await
    }

    async fn category_id(&self, slug: &str) -> Result<Option<String>> {
        if slug.is_empty() {
            return Ok(None);
        }
        let params = [("select", "id".to_string()), ("slug", eq(slug))];
        let rows: Vec<IdRow> = self.select(CATEGORIES_TABLE, &params).await?;
        Ok(rows.into_iter().next().map(|r| r.id))
    }

    async fn is_scraped(&self, source_url: &str) -> Result<bool> {
        let params = [("select", "id".to_string()), ("source_url", eq(source_url))];
        let rows: Vec<serde_json::Value> = self.select(SCRAPE_LOG_TABLE, &params).await?;
        Ok(!rows.is_empty())
    }

    async fn log_scrape(&self, entry: &ScrapeLogEntry) -> Result<()> {
        self.insert(SCRAPE_LOG_TABLE, entry).await
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<()> {
        self.insert(ARTICLES_TABLE, article).await
    }
}

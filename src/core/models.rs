//! Core data models for articles, feeds and translation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One published article as read by the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title_kn: String,
    pub title_en: String,
    pub summary_kn: String,
    pub source_url: String,
    pub source_name: String,
    pub thumbnail_url: Option<String>,
    pub slug: String,
    pub meta_description: String,
    pub is_featured: bool,
    pub view_count: i64,
    pub published_at: String,
    /// Joined category row, absent when the article has none
    #[serde(default)]
    pub categories: Option<Category>,
}

impl Article {
    /// Parse `published_at`, which the backend hands out as text
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.published_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Category as embedded in an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name_kn: String,
    pub name_en: String,
    pub slug: String,
    pub color: String,
}

/// Columns selected for the article read shape
pub const ARTICLE_COLUMNS: &str = "id,title_kn,title_en,summary_kn,source_url,source_name,\
thumbnail_url,slug,meta_description,is_featured,view_count,published_at";

/// Columns selected for the embedded category
pub const CATEGORY_COLUMNS: &str = "name_kn,name_en,slug,color";

/// Filters for reading articles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub featured_only: bool,
    pub category: Option<String>,
}

/// Row inserted into `articles` by the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title_kn: String,
    pub title_en: String,
    pub summary_kn: String,
    pub summary_en: String,
    pub source_url: String,
    pub source_name: String,
    pub thumbnail_url: Option<String>,
    pub category_id: Option<String>,
    pub slug: String,
    pub meta_description: String,
    pub is_published: bool,
    pub original_published_at: Option<DateTime<Utc>>,
}

/// Outcome recorded for a processed source URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Failed,
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeStatus::Success => write!(f, "success"),
            ScrapeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Row of `scrape_log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeLogEntry {
    pub source_url: String,
    pub status: ScrapeStatus,
    pub error_message: Option<String>,
}

impl ScrapeLogEntry {
    /// Entry for a story that was published
    pub fn success(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            status: ScrapeStatus::Success,
            error_message: None,
        }
    }

    /// Entry for a story that failed, with the reason
    pub fn failed(source_url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            status: ScrapeStatus::Failed,
            error_message: Some(error.into()),
        }
    }
}

/// An RSS/Atom feed to pull stories from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    pub name: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// A story pulled from a feed, not yet translated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title_en: String,
    pub summary_en: String,
    pub source_url: String,
    pub source_name: String,
    pub thumbnail_url: Option<String>,
    pub original_published_at: Option<DateTime<Utc>>,
}

/// Keyword rule mapping story text to a category slug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub slug: String,
    pub keywords: Vec<String>,
}

/// Translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub title_en: String,
    pub summary_en: String,
}

impl TranslationRequest {
    pub fn new(title_en: impl Into<String>, summary_en: impl Into<String>) -> Self {
        Self {
            title_en: title_en.into(),
            summary_en: summary_en.into(),
        }
    }
}

/// JSON object the model is asked to reply with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedArticle {
    pub title_kn: String,
    pub summary_kn: String,
    #[serde(default)]
    pub meta_description: String,
}

/// Translation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translation: TranslatedArticle,
    pub tokens_used: usize,
    pub model_used: String,
    pub request_id: Option<String>,
}

/// Token usage tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub daily_limit: usize,
    pub used_today: usize,
    pub last_reset: DateTime<Utc>,
}

impl TokenUsage {
    pub fn new(daily_limit: usize) -> Self {
        Self {
            daily_limit,
            used_today: 0,
            last_reset: Utc::now(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.daily_limit.saturating_sub(self.used_today)
    }

    pub fn can_use(&self, tokens: usize) -> bool {
        self.remaining() >= tokens
    }

    pub fn use_tokens(&mut self, tokens: usize) -> anyhow::Result<()> {
        if !self.can_use(tokens) {
            return Err(anyhow::anyhow!("Token quota exceeded"));
        }
        self.used_today += tokens;
        Ok(())
    }

    pub fn reset_if_needed(&mut self) {
        let now = Utc::now();
        if now.date_naive() != self.last_reset.date_naive() {
            self.used_today = 0;
            self.last_reset = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    fn article_json() -> serde_json::Value {
        json!({
            "id": "9b2f0c1e-1111-4c3b-9a55-2f1f3c0e7d10",
            "title_kn": "ಹೊಸ ಐಫೋನ್ ಬಿಡುಗಡೆ",
            "title_en": "New iPhone launched",
            "summary_kn": "ಆಪಲ್ ಹೊಸ ಐಫೋನ್ ಬಿಡುಗಡೆ ಮಾಡಿದೆ.",
            "source_url": "https://example.com/iphone",
            "source_name": "TechCrunch",
            "thumbnail_url": null,
            "slug": "new-iphone-launched-a1b2c3",
            "meta_description": "ಹೊಸ ಐಫೋನ್",
            "is_featured": true,
            "view_count": 42,
            "published_at": "2026-03-01T10:30:00+00:00",
            "categories": {
                "name_kn": "ಸ್ಮಾರ್ಟ್‌ಫೋನ್",
                "name_en": "Smartphones",
                "slug": "smartphones",
                "color": "#3B82F6"
            }
        })
    }

    #[test]
    fn test_article_accepts_null_thumbnail_and_category() {
        let mut value = article_json();
        value["categories"] = serde_json::Value::Null;

        let article: Article = serde_json::from_value(value).unwrap();
        assert!(article.thumbnail_url.is_none());
        assert!(article.categories.is_none());
    }

    #[test]
    fn test_article_category_is_optional_when_missing() {
        let mut value = article_json();
        value.as_object_mut().unwrap().remove("categories");
        // extra columns from `select=*` must not break decoding
        value["summary_en"] = json!("Apple launched a new iPhone.");

        let article: Article = serde_json::from_value(value).unwrap();
        assert!(article.categories.is_none());
        assert_eq!(article.view_count, 42);
    }

    #[test]
    fn test_article_with_category() {
        let article: Article = serde_json::from_value(article_json()).unwrap();
        let category = article.categories.as_ref().unwrap();
        assert_eq!(category.slug, "smartphones");
        assert_eq!(category.color, "#3B82F6");
        assert!(article.published_at_utc().is_some());

        assert_json_include!(actual: serde_json::to_value(&article).unwrap(), expected: article_json());
    }

    #[test]
    fn test_scrape_log_entry_shape() {
        let entry = ScrapeLogEntry::failed("https://example.com/a", "timeout");
        assert_json_include!(
            actual: serde_json::to_value(&entry).unwrap(),
            expected: json!({"source_url": "https://example.com/a", "status": "failed", "error_message": "timeout"})
        );
        assert_eq!(ScrapeLogEntry::success("u").status.to_string(), "success");
    }

    #[test]
    fn test_translated_article_meta_description_defaults() {
        let parsed: TranslatedArticle =
            serde_json::from_str(r#"{"title_kn": "ಶೀರ್ಷಿಕೆ", "summary_kn": "ಸಾರಾಂಶ"}"#).unwrap();
        assert_eq!(parsed.meta_description, "");
    }

    #[test]
    fn test_token_usage() {
        let mut usage = TokenUsage::new(100);
        assert!(usage.use_tokens(60).is_ok());
        assert_eq!(usage.remaining(), 40);
        assert!(usage.use_tokens(50).is_err());
        assert_eq!(usage.used_today, 60);
    }
}

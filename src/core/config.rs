//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::core::errors::{NewsError, Result};
use crate::core::models::{CategoryRule, FeedSource};

/// Public (browser-safe) Supabase variables used by the site
pub const PUBLIC_URL_VAR: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const PUBLIC_KEY_VAR: &str = "NEXT_PUBLIC_SUPABASE_ANON_KEY";

/// Service-role variables used by the bot
pub const SERVICE_URL_VAR: &str = "SUPABASE_URL";
pub const SERVICE_KEY_VAR: &str = "SUPABASE_SERVICE_KEY";

const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";
const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

fn required_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(NewsError::config(format!(
            "{} environment variable is required",
            name
        ))),
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| NewsError::config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Connection settings for the hosted database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }

    /// Load from the public URL and anonymous key
    pub fn from_public_env() -> Result<Self> {
        Self::from_vars(PUBLIC_URL_VAR, PUBLIC_KEY_VAR)
    }

    /// Load from the service URL and service-role key
    pub fn from_service_env() -> Result<Self> {
        Self::from_vars(SERVICE_URL_VAR, SERVICE_KEY_VAR)
    }

    fn from_vars(url_var: &str, key_var: &str) -> Result<Self> {
        let config = Self::new(required_var(url_var)?, required_var(key_var)?);
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(NewsError::config("Supabase key is required"));
        }

        let url = url::Url::parse(&self.url)?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(NewsError::config(format!(
                "Supabase URL must be http(s), got {}",
                url.scheme()
            )));
        }

        Ok(())
    }

    /// PostgREST root, e.g. `https://xyz.supabase.co/rest/v1`
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url.trim_end_matches('/'))
    }
}

/// Configuration for the translator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub api_key: String,
    pub api_endpoint: String,
    pub api_version: String,
    pub model: String,
    pub fallback_model: Option<String>,
    pub max_tokens: u32,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            api_endpoint: DEFAULT_ANTHROPIC_ENDPOINT.to_string(),
            api_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            fallback_model: None,
            max_tokens: 1024,
            max_concurrent: 4,
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_ms: 60000,
        }
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = required_var("ANTHROPIC_API_KEY")?;

        let api_endpoint = std::env::var("ANTHROPIC_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ANTHROPIC_ENDPOINT.to_string());

        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string());

        let fallback_model = std::env::var("ANTHROPIC_FALLBACK_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty());

        Ok(Self {
            api_key,
            api_endpoint,
            api_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            model,
            fallback_model,
            max_tokens: parsed_var("TRANSLATION_MAX_TOKENS", 1024)?,
            max_concurrent: parsed_var("MAX_CONCURRENT", 4)?,
            max_retries: parsed_var("MAX_RETRIES", 3)?,
            retry_delay_ms: parsed_var("RETRY_DELAY_MS", 1000)?,
            timeout_ms: parsed_var("REQUEST_TIMEOUT_MS", 60000)?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(NewsError::config("API key is required"));
        }

        if self.api_endpoint.is_empty() {
            return Err(NewsError::config("API endpoint is required"));
        }

        if self.model.is_empty() {
            return Err(NewsError::config("model is required"));
        }

        if self.max_concurrent == 0 {
            return Err(NewsError::config("max_concurrent must be greater than 0"));
        }

        if self.fallback_model.as_deref() == Some(self.model.as_str()) {
            warn!("Fallback model is the same as the primary model");
        }

        Ok(())
    }

    /// Models to try, primary first
    pub fn models(&self) -> Vec<&str> {
        let mut models = vec![self.model.as_str()];
        if let Some(fallback) = self.fallback_model.as_deref() {
            if fallback != self.model {
                models.push(fallback);
            }
        }
        models
    }
}

/// Default feeds
const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("https://techcrunch.com/feed/", "TechCrunch"),
    ("https://feeds.wired.com/wired/index", "Wired"),
    ("https://www.theverge.com/rss/index.xml", "The Verge"),
    ("https://feeds.arstechnica.com/arstechnica/index", "Ars Technica"),
    ("https://rss.nytimes.com/services/xml/rss/nyt/Technology.xml", "NYT Tech"),
];

/// Default category rules, checked in order
const DEFAULT_CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "artificial-intelligence",
        &[
            "ai", "artificial intelligence", "machine learning", "gpt", "llm", "chatgpt",
            "gemini", "claude", "openai", "deepmind", "neural",
        ],
    ),
    (
        "smartphones",
        &["iphone", "android", "smartphone", "samsung", "pixel", "oneplus", "mobile phone"],
    ),
    (
        "startups",
        &["startup", "funding", "series a", "series b", "venture", "ipo", "unicorn", "valuation"],
    ),
    (
        "cybersecurity",
        &["hack", "breach", "ransomware", "malware", "vulnerability", "security", "phishing", "cyber"],
    ),
    (
        "space-tech",
        &["spacex", "nasa", "rocket", "satellite", "mars", "moon", "space", "orbit", "starship"],
    ),
    (
        "gaming",
        &["game", "gaming", "playstation", "xbox", "nintendo", "steam", "esports"],
    ),
    (
        "electric-vehicles",
        &["electric vehicle", "tesla", "ev ", "battery", "charging", "self-driving", "autonomous"],
    ),
    (
        "social-media",
        &["twitter", "x.com", "meta", "instagram", "tiktok", "youtube", "facebook", "linkedin"],
    ),
];

/// Settings for one bot run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub articles_per_run: usize,
    pub entries_per_feed: usize,
    pub min_summary_chars: usize,
    pub max_summary_chars: usize,
    pub translation_delay_ms: u64,
    pub fetch_timeout_ms: u64,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            articles_per_run: 5,
            entries_per_feed: 15,
            min_summary_chars: 50,
            max_summary_chars: 800,
            translation_delay_ms: 1000,
            fetch_timeout_ms: 30000,
            feeds: vec![],
            categories: vec![],
        }
    }
}

impl BotConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            articles_per_run: parsed_var("ARTICLES_PER_RUN", defaults.articles_per_run)?,
            entries_per_feed: parsed_var("ENTRIES_PER_FEED", defaults.entries_per_feed)?,
            translation_delay_ms: parsed_var("TRANSLATION_DELAY_MS", defaults.translation_delay_ms)?,
            fetch_timeout_ms: parsed_var("FETCH_TIMEOUT_MS", defaults.fetch_timeout_ms)?,
            ..defaults
        })
    }

    /// Load from the environment and fill in default feeds and categories
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env()?;
        config.fill_defaults();
        Ok(config)
    }

    fn fill_defaults(&mut self) {
        if self.feeds.is_empty() {
            self.feeds = DEFAULT_FEEDS
                .iter()
                .map(|(url, name)| FeedSource::new(*url, *name))
                .collect();
            info!("Loaded {} default feeds", self.feeds.len());
        }

        if self.categories.is_empty() {
            self.categories = default_category_rules();
        }
    }

    /// Load from a JSON or YAML file, chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.fill_defaults();
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.articles_per_run == 0 {
            return Err(NewsError::config("articles_per_run must be greater than 0"));
        }

        if self.min_summary_chars > self.max_summary_chars {
            return Err(NewsError::config(
                "min_summary_chars must not exceed max_summary_chars",
            ));
        }

        if self.feeds.is_empty() {
            warn!("No feeds configured");
        }

        for feed in &self.feeds {
            url::Url::parse(&feed.url)?;
        }

        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "yaml" || ext == "yml"
        })
        .unwrap_or(false)
}

/// The built-in keyword table
pub fn default_category_rules() -> Vec<CategoryRule> {
    DEFAULT_CATEGORY_RULES
        .iter()
        .map(|(slug, keywords)| CategoryRule {
            slug: slug.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_translator_config_validation() {
        let config = TranslatorConfig {
            api_key: "test_key".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_translator_config_validation_missing_key() {
        let config = TranslatorConfig {
            api_key: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_models_with_fallback() {
        let config = TranslatorConfig {
            model: "primary".to_string(),
            fallback_model: Some("secondary".to_string()),
            ..Default::default()
        };
        assert_eq!(config.models(), vec!["primary", "secondary"]);

        let same = TranslatorConfig {
            model: "primary".to_string(),
            fallback_model: Some("primary".to_string()),
            ..Default::default()
        };
        assert_eq!(same.models(), vec!["primary"]);
    }

    #[test]
    #[serial]
    fn test_supabase_public_env() {
        std::env::set_var(PUBLIC_URL_VAR, "https://abc.supabase.co/");
        std::env::set_var(PUBLIC_KEY_VAR, "anon-key");

        let config = SupabaseConfig::from_public_env().unwrap();
        assert_eq!(config.key, "anon-key");
        assert_eq!(config.rest_url(), "https://abc.supabase.co/rest/v1");

        std::env::remove_var(PUBLIC_KEY_VAR);
        assert!(matches!(
            SupabaseConfig::from_public_env(),
            Err(NewsError::ConfigError { .. })
        ));

        std::env::remove_var(PUBLIC_URL_VAR);
    }

    #[test]
    fn test_supabase_config_rejects_bad_url() {
        assert!(SupabaseConfig::new("not a url", "key").validate().is_err());
        assert!(SupabaseConfig::new("ftp://abc.supabase.co", "key").validate().is_err());
        assert!(SupabaseConfig::new("https://abc.supabase.co", "").validate().is_err());
    }

    #[test]
    #[serial]
    fn test_bot_config_env_override() {
        std::env::set_var("ARTICLES_PER_RUN", "3");
        let config = BotConfig::load().unwrap();
        std::env::remove_var("ARTICLES_PER_RUN");

        assert_eq!(config.articles_per_run, 3);
        assert_eq!(config.feeds.len(), 5);
        assert_eq!(config.categories.len(), 8);
        assert_eq!(config.categories[0].slug, "artificial-intelligence");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_bot_config_rejects_garbage_env() {
        std::env::set_var("ARTICLES_PER_RUN", "five");
        let result = BotConfig::from_env();
        std::env::remove_var("ARTICLES_PER_RUN");
        assert!(result.is_err());
    }

    #[test]
    fn test_bot_config_file_roundtrip_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.yaml");

        let config = BotConfig {
            articles_per_run: 2,
            feeds: vec![FeedSource::new("https://example.com/rss", "Example")],
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = BotConfig::from_file(&path).unwrap();
        assert_eq!(loaded.articles_per_run, 2);
        assert_eq!(loaded.feeds, config.feeds);
        // categories were empty on disk and get the built-in table
        assert_eq!(loaded.categories, default_category_rules());
    }

    #[test]
    fn test_bot_config_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.json");
        std::fs::write(
            &path,
            r#"{"articles_per_run": 1, "entries_per_feed": 10, "min_summary_chars": 20,
                "max_summary_chars": 400, "translation_delay_ms": 0, "fetch_timeout_ms": 1000}"#,
        )
        .unwrap();

        let loaded = BotConfig::from_file(&path).unwrap();
        assert_eq!(loaded.max_summary_chars, 400);
        assert_eq!(loaded.feeds.len(), 5);
    }
}

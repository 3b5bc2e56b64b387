//! Async Kannada translation client with retry and model fallback

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{NewsError, Result};
use crate::core::models::{TokenUsage, TranslatedArticle, TranslationRequest, TranslationResult};
use crate::core::token_tracker::TokenTracker;

/// Anything that can turn an English story into Kannada
#[async_trait]
pub trait ArticleTranslator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult>;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    id: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<ResponseUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseUsage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

/// Build the journalist prompt for one story
pub fn build_prompt(request: &TranslationRequest) -> String {
    format!(
        r#"You are a professional Kannada journalist. Translate the following tech news article title and summary into natural, readable Kannada that a general Kannada-speaking audience would enjoy reading.

Guidelines:
- Write in clear, journalistic Kannada (not overly literary or academic)
- Keep proper nouns, brand names, and tech terms in English or transliterate them naturally (e.g., AI, iPhone, ChatGPT, Samsung)
- Numbers stay as digits
- The tone should be informative and engaging
- Do NOT add your own opinions or extra information

Return ONLY a JSON object with these exact keys:
{{
  "title_kn": "Kannada translation of the title",
  "summary_kn": "Kannada translation of the summary",
  "meta_description": "A short 1-sentence Kannada SEO description (max 120 chars)"
}}

Title: {}

Summary: {}"#,
        request.title_en, request.summary_en
    )
}

/// Upper bound for a single retry wait
const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential wait before retry `attempt` (1-based), capped
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

/// Pull the JSON object out of a model reply that may carry extra prose
pub fn parse_translation(raw: &str) -> Result<TranslatedArticle> {
    let raw = raw.trim();
    let json = json_object_pattern()
        .find(raw)
        .ok_or_else(|| NewsError::InvalidResponseError {
            message: format!(
                "No JSON found in translation response: {}",
                raw.chars().take(200).collect::<String>()
            ),
        })?;

    let parsed: TranslatedArticle =
        serde_json::from_str(json.as_str()).map_err(|e| NewsError::InvalidResponseError {
            message: format!("Malformed translation JSON: {}", e),
        })?;

    if parsed.title_kn.trim().is_empty() {
        return Err(NewsError::MissingField {
            field: "title_kn".to_string(),
        });
    }
    if parsed.summary_kn.trim().is_empty() {
        return Err(NewsError::MissingField {
            field: "summary_kn".to_string(),
        });
    }

    Ok(parsed)
}

/// Async translation client backed by the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AsyncTranslator {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
    semaphore: Arc<Semaphore>,
    token_tracker: Arc<TokenTracker>,
    current_model: Arc<Mutex<String>>,
}

impl AsyncTranslator {
    /// Create a new async translator
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(4)
            .build()?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        let token_tracker = Arc::new(TokenTracker::from_env());
        let current_model = Arc::new(Mutex::new(config.model.clone()));

        Ok(Self {
            client,
            config: Arc::new(config),
            semaphore,
            token_tracker,
            current_model,
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::new(TranslatorConfig::from_env()?)
    }

    /// Replace the quota tracker, e.g. to share one across translators
    pub fn with_token_tracker(mut self, tracker: Arc<TokenTracker>) -> Self {
        self.token_tracker = tracker;
        self
    }

    /// Translate with one model, retrying transient failures
    async fn translate_with_model(
        &self,
        request: &TranslationRequest,
        model: &str,
    ) -> Result<TranslationResult> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.config.retry_delay_ms, attempt);
                debug!("Retry attempt {} for model {} in {:?}", attempt, model, delay);
                sleep(delay).await;
            }

            match self.send_request(request, model).await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("Translated after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    warn!("Attempt {} with {} failed: {}", attempt + 1, model, e);
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(NewsError::InternalError(format!(
            "no attempt made with model {}",
            model
        ))))
    }

    /// Send actual HTTP request
    async fn send_request(&self, request: &TranslationRequest, model: &str) -> Result<TranslationResult> {
        let body = MessagesRequest {
            model,
            max_tokens: self.config.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(request),
            }],
        };

        let response = self
            .client
            .post(&self.config.api_endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NewsError::TimeoutError
                } else {
                    NewsError::NetworkError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let error_text = response.text().await.unwrap_or_default();

            if status_code == 429 {
                return Err(NewsError::RateLimitError { retry_after });
            }

            return Err(NewsError::ApiError {
                status: status_code,
                message: error_text,
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| NewsError::InvalidResponseError {
                    message: e.to_string(),
                })?;

        let raw = parsed
            .content
            .iter()
            .find_map(|block| block.text.as_deref())
            .ok_or_else(|| NewsError::InvalidResponseError {
                message: "No text block in response".to_string(),
            })?;

        let translation = parse_translation(raw)?;
        let tokens_used = parsed
            .usage
            .map(|u| u.input_tokens + u.output_tokens)
            .unwrap_or(0);

        Ok(TranslationResult {
            translation,
            tokens_used,
            model_used: model.to_string(),
            request_id: parsed.id,
        })
    }

    /// Get current token usage
    pub async fn get_token_usage(&self) -> TokenUsage {
        self.token_tracker.get_stats().await
    }

    /// Tokens left in today's budget
    pub async fn remaining_tokens(&self) -> usize {
        self.token_tracker.remaining().await
    }

    /// Less than a tenth of today's budget left
    pub async fn quota_is_low(&self) -> bool {
        self.token_tracker.is_low().await
    }

    /// Model that served the last successful translation
    pub async fn get_current_model(&self) -> String {
        self.current_model.lock().await.clone()
    }
}

#[async_trait]
impl ArticleTranslator for AsyncTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        // Rough estimate: prompt plus a reply of similar size
        let estimated_tokens = (build_prompt(request).len() / 4) * 2;
        if !self.token_tracker.can_use(estimated_tokens).await {
            return Err(NewsError::QuotaExceededError);
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| NewsError::InternalError(e.to_string()))?;

        let mut first_error = None;
        for model in self.config.models() {
            match self.translate_with_model(request, model).await {
                Ok(result) => {
                    if let Err(e) = self.token_tracker.use_tokens(result.tokens_used).await {
                        warn!("Failed to track token usage: {}", e);
                    }
                    *self.current_model.lock().await = result.model_used.clone();
                    return Ok(result);
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    if matches!(e, NewsError::QuotaExceededError) {
                        return Err(e);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or_else(|| NewsError::config("No models configured")))
    }
}

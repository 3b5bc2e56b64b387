//! Daily token budget for translation calls

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::core::errors::{NewsError, Result};
use crate::core::models::TokenUsage;

/// Default daily budget when `DAILY_TOKEN_LIMIT` is unset
pub const DEFAULT_DAILY_LIMIT: usize = 2_000_000;

/// Shared tracker for the daily token quota
#[derive(Debug, Clone)]
pub struct TokenTracker {
    usage: Arc<RwLock<TokenUsage>>,
}

impl TokenTracker {
    pub fn new(daily_limit: usize) -> Self {
        Self {
            usage: Arc::new(RwLock::new(TokenUsage::new(daily_limit))),
        }
    }

    /// Create from `DAILY_TOKEN_LIMIT`, falling back to the default on bad input
    pub fn from_env() -> Self {
        let daily_limit = match std::env::var("DAILY_TOKEN_LIMIT") {
            Ok(raw) => raw.parse::<usize>().unwrap_or_else(|_| {
                warn!("Ignoring invalid DAILY_TOKEN_LIMIT: {}", raw);
                DEFAULT_DAILY_LIMIT
            }),
            Err(_) => DEFAULT_DAILY_LIMIT,
        };

        Self::new(daily_limit)
    }

    /// Check if enough tokens are available
    pub async fn can_use(&self, tokens: usize) -> bool {
        let mut usage = self.usage.write().await;
        usage.reset_if_needed();
        usage.can_use(tokens)
    }

    /// Charge tokens reported by a completed call
    pub async fn use_tokens(&self, tokens: usize) -> Result<()> {
        let mut usage = self.usage.write().await;
        usage.reset_if_needed();
        usage
            .use_tokens(tokens)
            .map_err(|_| NewsError::QuotaExceededError)?;
        debug!("Used {} tokens, remaining: {}", tokens, usage.remaining());
        Ok(())
    }

    pub async fn get_stats(&self) -> TokenUsage {
        self.usage.read().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.usage.read().await.remaining()
    }

    /// Less than 10% of the budget left
    pub async fn is_low(&self) -> bool {
        let usage = self.usage.read().await;
        usage.remaining() < usage.daily_limit / 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_tracker() {
        let tracker = TokenTracker::new(1000);

        assert!(tracker.can_use(500).await);
        tracker.use_tokens(500).await.unwrap();
        assert_eq!(tracker.remaining().await, 500);

        assert!(!tracker.can_use(600).await);
        assert!(matches!(
            tracker.use_tokens(600).await,
            Err(NewsError::QuotaExceededError)
        ));

        tracker.use_tokens(500).await.unwrap();
        assert_eq!(tracker.remaining().await, 0);
    }

    #[tokio::test]
    async fn test_low_quota_detection() {
        let tracker = TokenTracker::new(1000);
        assert!(!tracker.is_low().await);

        tracker.use_tokens(850).await.unwrap();
        assert!(!tracker.is_low().await);

        tracker.use_tokens(100).await.unwrap();
        assert!(tracker.is_low().await);
        assert_eq!(tracker.get_stats().await.used_today, 950);
    }
}

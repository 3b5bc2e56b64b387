//! Kannada Tech News - backend client, article shapes and publishing bot
//!
//! The library builds a Supabase client handle from environment variables,
//! declares the bilingual `Article` read shape, and runs the bot that turns
//! English RSS stories into published Kannada articles.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod pipeline;
pub mod server;

#[cfg(test)]
pub(crate) mod test_util;

// Re-export key types for convenience
pub use crate::core::{
    client::{ArticleTranslator, AsyncTranslator},
    config::{BotConfig, SupabaseConfig, TranslatorConfig},
    errors::{NewsError, Result},
    models::{Article, Category, FeedItem, NewArticle, ScrapeLogEntry},
    store::{MemoryStore, NewsStore},
    supabase::SupabaseClient,
};

pub use crate::pipeline::bot::{NewsBot, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

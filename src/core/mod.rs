//! Backend client, translator and shared data shapes

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod store;
pub mod supabase;
pub mod token_tracker;

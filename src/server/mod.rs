//! Read-only HTTP API over published articles

pub mod api;

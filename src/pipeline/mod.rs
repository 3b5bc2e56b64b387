//! The publishing bot: feeds in, translated articles out

pub mod bot;
pub mod feeds;
pub mod text;

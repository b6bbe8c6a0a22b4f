//! Friend Feeds - latest-post aggregator for a friend-links page
//!
//! This crate fetches a list of blog feeds concurrently, keeps the newest
//! post of each, and writes them as one JSON array sorted newest first.

pub mod aggregator;
pub mod article;
pub mod config;
pub mod domain;
pub mod error_log;
pub mod fetcher;
pub mod identity;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod sanitize;
pub mod sources;

//! # classbot
//!
//! Schedule and homework distribution pipeline for a school community bot.
//!
//! This crate implements the bot's recurring scrape-and-post pipeline: it
//! fetches the weekly lesson table from the school website, collects homework
//! from lesson-tagged chat channels, merges both into a digest per destination
//! channel, and keeps previously posted digests fresh through a reaction-driven
//! refresh flow.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`config`]: Immutable runtime configuration loaded from env or TOML
//! - [`models`]: Core data types (ids, calendar helpers, digests)
//! - [`gateway`]: Chat platform abstraction consumed by the pipeline
//! - [`db`]: Binding storage via the repository pattern
//! - [`scraper`]: HTML schedule scraping and table normalization
//! - [`services`]: Pipeline stages (collector, digest builder, distributor,
//!   refresh handler)
//!
//! The chat platform, the binding database, and the schedule website are
//! external services; each is reached through a trait seam so the whole
//! pipeline runs against in-memory implementations in tests.

pub mod config;

pub mod db;
pub mod models;

pub mod gateway;
pub mod scraper;

pub mod services;

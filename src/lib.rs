//! Steam Inventory - player lookup and market pricing
//!
//! Resolves a Steam ID, vanity name or profile URL to an account, fetches
//! its community inventory and prices every item from the Community Market.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod inventory;
pub mod market;
pub mod pipeline;
pub mod retry;
pub mod steam_id;
pub mod web;

pub use config::{ApiKey, Endpoints, PipelineConfig};
pub use error::{ErrorKind, PipelineError, Result};
pub use fetcher::{JsonFetcher, Transport};
pub use pipeline::{
    run_pipeline, run_pipeline_with_cancel, run_pipeline_with_fetcher, PipelineResult, Stage,
};
pub use retry::RetryPolicy;

//! Per-request pipeline configuration
//!
//! Everything the pipeline needs is passed in explicitly through
//! [`PipelineConfig`]; nothing is read from process-wide state.

use std::fmt;
use std::time::Duration;

use crate::fetcher::{FetchError, JsonFetcher, Transport};
use crate::retry::RetryPolicy;

/// Steam community items (trading cards, emoticons, backgrounds)
pub const DEFAULT_APP_ID: u64 = 753;
/// Context of the community items inventory
pub const DEFAULT_CONTEXT_ID: u64 = 6;
/// Market currency code 1 = USD
pub const DEFAULT_CURRENCY: u32 = 1;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Steam Web API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Base URLs of the upstream services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Steam Web API host (vanity resolution)
    pub api_base: String,
    /// Community host (inventories)
    pub community_base: String,
    /// Market host (price overview)
    pub market_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: "https://api.steampowered.com".to_string(),
            community_base: "https://steamcommunity.com".to_string(),
            market_base: "https://steamcommunity.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service at one base URL (mock servers in tests)
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            api_base: base.clone(),
            community_base: base.clone(),
            market_base: base,
        }
    }
}

/// Settings for one run of the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: ApiKey,
    /// Inventory catalog (Steam app ID)
    pub app_id: u64,
    pub context_id: u64,
    /// Market currency code used for price quotes
    pub currency: u32,
    pub transport: Transport,
    /// Maximum number of price lookups in flight
    pub enrichment_concurrency: usize,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Deadline for the whole pipeline, if any
    pub deadline: Option<Duration>,
    /// Applied to the resolution and retrieval fetches only
    pub retry: RetryPolicy,
    pub endpoints: Endpoints,
}

impl PipelineConfig {
    /// Configuration with the community inventory defaults
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            app_id: DEFAULT_APP_ID,
            context_id: DEFAULT_CONTEXT_ID,
            currency: DEFAULT_CURRENCY,
            transport: Transport::Direct,
            enrichment_concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            deadline: None,
            retry: RetryPolicy::default(),
            endpoints: Endpoints::default(),
        }
    }

    /// Concurrency clamped to at least one worker
    pub fn concurrency(&self) -> usize {
        self.enrichment_concurrency.max(1)
    }

    /// HTTP client for this configuration's transport and timeout
    pub fn build_fetcher(&self) -> Result<JsonFetcher, FetchError> {
        JsonFetcher::new(&self.transport, self.timeout)
    }
}

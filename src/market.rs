//! Community Market price enrichment
//!
//! One `priceoverview` call per distinct market hash name, fanned out over a
//! bounded set of tokio tasks. A failed lookup only affects its own items.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Endpoints;
use crate::fetcher::{FetchError, JsonFetcher};
use crate::inventory::{flag, InventoryEntry};

/// Price attached to an inventory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPrice {
    /// Not enriched yet
    Pending,
    /// Lowest current listing, formatted by the market (e.g. "$0.12")
    Listed(String),
    /// Item cannot be sold on the market
    Unmarketable,
    /// Lookup failed, timed out or was cancelled
    Unavailable,
}

impl fmt::Display for ItemPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemPrice::Pending => f.write_str("Pending"),
            ItemPrice::Listed(price) => f.write_str(price),
            ItemPrice::Unmarketable => f.write_str("Unmarketable"),
            ItemPrice::Unavailable => f.write_str("Unavailable"),
        }
    }
}

impl Serialize for ItemPrice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `priceoverview` response
#[derive(Debug, Deserialize)]
pub struct PriceQuote {
    #[serde(default, deserialize_with = "flag")]
    pub success: bool,
    #[serde(default)]
    pub lowest_price: Option<String>,
    #[serde(default)]
    pub median_price: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
}

impl PriceQuote {
    /// A quote without a usable lowest price means the item cannot be sold
    pub fn into_price(self) -> ItemPrice {
        match self.lowest_price {
            Some(price) if self.success && !price.trim().is_empty() => ItemPrice::Listed(price),
            _ => ItemPrice::Unmarketable,
        }
    }
}

/// Encode a market hash name for the query string; spaces become `+`
pub fn encode_market_hash_name(name: &str) -> String {
    urlencoding::encode(name).replace("%20", "+")
}

/// Inverse of [`encode_market_hash_name`]
pub fn decode_market_hash_name(encoded: &str) -> Option<String> {
    urlencoding::decode(&encoded.replace('+', " "))
        .ok()
        .map(|name| name.into_owned())
}

/// Client for the market price overview endpoint
#[derive(Debug, Clone)]
pub struct MarketClient {
    fetcher: JsonFetcher,
    market_base: String,
    currency: u32,
    app_id: u64,
}

impl MarketClient {
    pub fn new(fetcher: JsonFetcher, endpoints: &Endpoints, currency: u32, app_id: u64) -> Self {
        Self {
            fetcher,
            market_base: endpoints.market_base.clone(),
            currency,
            app_id,
        }
    }

    pub fn price_url(&self, market_hash_name: &str) -> String {
        format!(
            "{}/market/priceoverview/?currency={}&appid={}&market_hash_name={}",
            self.market_base,
            self.currency,
            self.app_id,
            encode_market_hash_name(market_hash_name)
        )
    }

    /// Fetch the current price overview for one item
    pub async fn fetch_price_quote(&self, market_hash_name: &str) -> Result<PriceQuote, FetchError> {
        self.fetcher
            .fetch_json(&self.price_url(market_hash_name))
            .await
    }
}

/// A price lookup that did not produce a price
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentFailure {
    pub market_hash_name: String,
    pub reason: String,
}

/// Summary of one enrichment pass
#[derive(Debug, Default)]
pub struct EnrichmentReport {
    /// Distinct price lookups scheduled
    pub lookups: usize,
    pub failures: Vec<EnrichmentFailure>,
    /// Cancellation fired before every lookup finished
    pub cancelled: bool,
}

/// Attach prices to `entries` in place.
///
/// Non-marketable entries are marked without a network call. Every other
/// entry ends up `Listed`, `Unmarketable` or `Unavailable`; nothing is left
/// `Pending`. When `cancel` fires, finished lookups are kept and the rest
/// are marked `Unavailable`.
pub async fn enrich_prices(
    client: &MarketClient,
    entries: &mut [InventoryEntry],
    concurrency: usize,
    cancel: &CancellationToken,
) -> EnrichmentReport {
    // Slot per distinct market hash name; entries point at their slot
    let mut keys: Vec<String> = Vec::new();
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    let mut entry_slots: Vec<Option<usize>> = Vec::with_capacity(entries.len());

    for entry in entries.iter_mut() {
        if !entry.marketable {
            entry.price = ItemPrice::Unmarketable;
            entry_slots.push(None);
            continue;
        }
        let slot = *slot_by_key
            .entry(entry.market_hash_name.clone())
            .or_insert_with(|| {
                keys.push(entry.market_hash_name.clone());
                keys.len() - 1
            });
        entry_slots.push(Some(slot));
    }

    log::info!(
        "Enriching {} entries with {} price lookups ({} at a time)",
        entries.len(),
        keys.len(),
        concurrency.max(1)
    );

    let mut prices: Vec<Option<ItemPrice>> = vec![None; keys.len()];
    let mut report = EnrichmentReport {
        lookups: keys.len(),
        ..EnrichmentReport::default()
    };

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (slot, key) in keys.iter().enumerate() {
        let client = client.clone();
        let key = key.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let quote = client.fetch_price_quote(&key).await;
            (slot, quote)
        });
    }

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled(), if !report.cancelled => {
                log::warn!("Price enrichment cancelled, keeping finished lookups");
                report.cancelled = true;
                tasks.abort_all();
                continue;
            }
            joined = tasks.join_next() => joined,
        };

        let Some(joined) = joined else { break };
        match joined {
            Ok((slot, Ok(quote))) => {
                if let Some(price) = prices.get_mut(slot) {
                    *price = Some(quote.into_price());
                }
            }
            Ok((slot, Err(e))) => {
                let Some(key) = keys.get(slot) else { continue };
                log::warn!("Price lookup failed for {}: {}", key, e);
                report.failures.push(EnrichmentFailure {
                    market_hash_name: key.clone(),
                    reason: e.to_string(),
                });
                if let Some(price) = prices.get_mut(slot) {
                    *price = Some(ItemPrice::Unavailable);
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => log::error!("Price lookup task failed: {}", e),
        }
    }

    for (key, price) in keys.iter().zip(prices.iter_mut()) {
        if price.is_none() {
            report.failures.push(EnrichmentFailure {
                market_hash_name: key.clone(),
                reason: "price lookup did not complete".to_string(),
            });
            *price = Some(ItemPrice::Unavailable);
        }
    }

    for (entry, slot) in entries.iter_mut().zip(entry_slots) {
        if let Some(price) = slot.and_then(|s| prices.get(s)).cloned().flatten() {
            entry.price = price;
        }
    }

    report
}

#[cfg(test)]
#[path = "market_tests.rs"]
mod tests;

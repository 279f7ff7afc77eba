//! Steam community inventory retrieval
//!
//! Fetches `/inventory/{steamid}/{appid}/{contextid}` and folds the
//! `assets`/`descriptions` pair into one entry per item definition.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Endpoints;
use crate::fetcher::{FetchError, JsonFetcher};
use crate::market::ItemPrice;
use crate::retry::RetryPolicy;
use crate::steam_id::SteamId;

/// CDN prefix for `icon_url` references
pub const ICON_CDN_BASE: &str = "https://community.cloudflare.steamstatic.com/economy/image/";

/// Raw inventory payload.
///
/// Empty and some private inventories come back without `assets` and
/// `descriptions` at all, so both default to empty. A missing `success`
/// counts as success.
#[derive(Debug, Deserialize)]
pub struct InventoryResponse {
    #[serde(default = "default_success", deserialize_with = "flag")]
    pub success: bool,
    #[serde(default, rename = "Error")]
    pub error: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub total_inventory_count: Option<u64>,
}

/// One owned copy (or stack) of an item
#[derive(Debug, Deserialize)]
pub struct Asset {
    pub classid: String,
    #[serde(default = "default_instance")]
    pub instanceid: String,
    #[serde(default)]
    pub amount: Option<String>,
}

/// Item definition shared by every asset with the same class/instance
#[derive(Debug, Deserialize)]
pub struct Description {
    pub classid: String,
    #[serde(default = "default_instance")]
    pub instanceid: String,
    pub name: String,
    pub market_hash_name: String,
    #[serde(default)]
    pub market_name: Option<String>,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub marketable: bool,
    #[serde(default, deserialize_with = "flag")]
    pub tradable: bool,
}

fn default_success() -> bool {
    true
}

fn default_instance() -> String {
    "0".to_string()
}

/// Steam encodes flags as 0/1; accept real booleans too.
pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

/// One item definition in a player's inventory, with its price once enriched
#[derive(Debug, Clone, Serialize)]
pub struct InventoryEntry {
    pub name: String,
    /// Human-readable key used for market price lookups
    pub market_hash_name: String,
    pub market_name: String,
    pub icon_url: String,
    pub item_type: Option<String>,
    pub marketable: bool,
    pub tradable: bool,
    /// Number of owned copies
    pub quantity: u64,
    pub price: ItemPrice,
}

impl InventoryEntry {
    /// Full CDN URL of the item icon
    pub fn icon_full_url(&self) -> String {
        format!("{}{}", ICON_CDN_BASE, self.icon_url)
    }
}

impl InventoryResponse {
    /// Fold assets into their descriptions, keeping description order.
    ///
    /// Descriptions with no owned asset are dropped, so an inventory with no
    /// assets is empty whatever `descriptions` holds.
    pub fn into_entries(self) -> Vec<InventoryEntry> {
        if self.assets.is_empty() {
            return Vec::new();
        }

        let mut counts: HashMap<(String, String), u64> = HashMap::new();
        for asset in &self.assets {
            let amount = asset
                .amount
                .as_deref()
                .and_then(|a| a.parse().ok())
                .unwrap_or(1);
            let count = counts
                .entry((asset.classid.clone(), asset.instanceid.clone()))
                .or_default();
            *count = count.saturating_add(amount);
        }

        self.descriptions
            .into_iter()
            .filter_map(|d| {
                let quantity = counts.remove(&(d.classid, d.instanceid))?;
                Some(InventoryEntry {
                    market_name: d.market_name.unwrap_or_else(|| d.name.clone()),
                    name: d.name,
                    market_hash_name: d.market_hash_name,
                    icon_url: d.icon_url,
                    item_type: d.item_type,
                    marketable: d.marketable,
                    tradable: d.tradable,
                    quantity,
                    price: ItemPrice::Pending,
                })
            })
            .collect()
    }
}

/// Build the inventory URL for a player/catalog/context triple
pub fn inventory_url(endpoints: &Endpoints, id: SteamId, app_id: u64, context_id: u64) -> String {
    format!(
        "{}/inventory/{}/{}/{}",
        endpoints.community_base, id, app_id, context_id
    )
}

/// Fetch and decode a player's inventory
pub async fn fetch_inventory(
    fetcher: &JsonFetcher,
    endpoints: &Endpoints,
    id: SteamId,
    app_id: u64,
    context_id: u64,
    retry: &RetryPolicy,
) -> Result<Vec<InventoryEntry>, FetchError> {
    let url = inventory_url(endpoints, id, app_id, context_id);
    log::info!("Fetching inventory {}/{} for {}", app_id, context_id, id);

    let url = url.as_str();
    let response = retry
        .run("inventory retrieval", move || {
            fetcher.fetch_json::<InventoryResponse>(url)
        })
        .await?;

    if !response.success {
        let reason = response
            .error
            .unwrap_or_else(|| "inventory request was not successful".to_string());
        log::warn!("Inventory for {} rejected upstream: {}", id, reason);
        return Err(FetchError::Rejected(reason));
    }

    log::debug!(
        "Inventory payload: {} assets, {} descriptions, total_inventory_count={:?}",
        response.assets.len(),
        response.descriptions.len(),
        response.total_inventory_count
    );

    let entries = response.into_entries();
    log::info!("Inventory for {} has {} distinct items", id, entries.len());
    Ok(entries)
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;

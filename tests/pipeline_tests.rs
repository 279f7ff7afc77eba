//! End-to-end pipeline tests against a mocked Steam.

use std::time::{Duration, Instant};

use steam_inventory::market::ItemPrice;
use steam_inventory::{run_pipeline, run_pipeline_with_cancel, ApiKey, Endpoints, PipelineConfig};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STEAM_ID: &str = "76561198012345678";
const INVENTORY_PATH: &str = "/inventory/76561198012345678/753/6";
const PRICE_PATH: &str = "/market/priceoverview/";

fn item_name(i: usize) -> String {
    format!("Item {i:02}")
}

fn item_price(i: usize) -> String {
    format!("$0.{i:02}")
}

/// Inventory with `count` single-copy items; `unmarketable` lists indexes
/// flagged as not marketable.
fn inventory_json(count: usize, unmarketable: &[usize]) -> serde_json::Value {
    let assets: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "appid": 753, "contextid": "6", "assetid": format!("{}", 1000 + i),
                "classid": format!("{}", i), "instanceid": "0", "amount": "1"
            })
        })
        .collect();
    let descriptions: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "appid": 753, "classid": format!("{}", i), "instanceid": "0",
                "name": item_name(i), "market_hash_name": item_name(i),
                "icon_url": format!("icon-{i}"),
                "marketable": if unmarketable.contains(&i) { 0 } else { 1 },
                "tradable": 1
            })
        })
        .collect();
    serde_json::json!({
        "assets": assets,
        "descriptions": descriptions,
        "total_inventory_count": count,
        "success": 1
    })
}

async fn mount_inventory(mock_server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(INVENTORY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(mock_server)
        .await;
}

async fn mount_price(mock_server: &MockServer, i: usize, delay: Option<Duration>) {
    let mut template = ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "success": true,
        "lowest_price": item_price(i),
        "volume": "5",
        "median_price": item_price(i)
    }));
    if let Some(delay) = delay {
        template = template.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path(PRICE_PATH))
        .and(query_param("market_hash_name", item_name(i)))
        .respond_with(template)
        .mount(mock_server)
        .await;
}

fn config_for(mock_server: &MockServer) -> PipelineConfig {
    let mut config = PipelineConfig::new(ApiKey::new("TESTKEY"));
    config.endpoints = Endpoints::single(&mock_server.uri());
    config
}

#[tokio::test]
async fn fifty_items_with_five_timeouts() {
    let mock_server = MockServer::start().await;
    let timed_out = [3, 13, 23, 33, 43];
    let unmarketable = [5, 15];

    mount_inventory(&mock_server, inventory_json(50, &unmarketable)).await;
    for i in 0..50 {
        if unmarketable.contains(&i) {
            continue;
        }
        let delay = timed_out
            .contains(&i)
            .then_some(Duration::from_secs(3));
        mount_price(&mock_server, i, delay).await;
    }

    let mut config = config_for(&mock_server);
    config.timeout = Duration::from_millis(500);
    config.enrichment_concurrency = 8;

    let result = run_pipeline(STEAM_ID, &config).await.unwrap();

    assert_eq!(result.entries.len(), 50);
    assert!(!result.cancelled);
    assert_eq!(result.enrichment_failures.len(), 5);

    for (i, entry) in result.entries.iter().enumerate() {
        assert_eq!(entry.name, item_name(i), "upstream order must be kept");
        let expected = if timed_out.contains(&i) {
            ItemPrice::Unavailable
        } else if unmarketable.contains(&i) {
            ItemPrice::Unmarketable
        } else {
            ItemPrice::Listed(item_price(i))
        };
        assert_eq!(entry.price, expected, "price of {}", entry.name);
    }

    let mut failed: Vec<_> = result
        .enrichment_failures
        .iter()
        .map(|f| f.market_hash_name.clone())
        .collect();
    failed.sort();
    let expected: Vec<_> = timed_out.iter().map(|&i| item_name(i)).collect();
    assert_eq!(failed, expected);
}

/// 10 fast items, 40 that never answer in time
async fn mount_half_stuck_market(mock_server: &MockServer) {
    mount_inventory(mock_server, inventory_json(50, &[])).await;
    for i in 0..50 {
        let delay = (i >= 10).then_some(Duration::from_secs(30));
        mount_price(mock_server, i, delay).await;
    }
}

fn assert_first_ten_priced(result: &steam_inventory::PipelineResult) {
    assert!(result.cancelled);
    assert_eq!(result.entries.len(), 50);
    for (i, entry) in result.entries.iter().enumerate() {
        if i < 10 {
            assert_eq!(entry.price, ItemPrice::Listed(item_price(i)));
        } else {
            assert_eq!(entry.price, ItemPrice::Unavailable);
        }
    }
    assert_eq!(result.enrichment_failures.len(), 40);
}

#[tokio::test]
async fn cancellation_keeps_finished_prices() {
    let mock_server = MockServer::start().await;
    mount_half_stuck_market(&mock_server).await;

    let mut config = config_for(&mock_server);
    config.timeout = Duration::from_secs(60);
    config.enrichment_concurrency = 64;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = run_pipeline_with_cancel(STEAM_ID, &config, &cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_first_ten_priced(&result);
}

#[tokio::test]
async fn deadline_keeps_finished_prices() {
    let mock_server = MockServer::start().await;
    mount_half_stuck_market(&mock_server).await;

    let mut config = config_for(&mock_server);
    config.timeout = Duration::from_secs(60);
    config.enrichment_concurrency = 64;
    config.deadline = Some(Duration::from_secs(1));

    let started = Instant::now();
    let result = run_pipeline(STEAM_ID, &config).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_first_ten_priced(&result);
}

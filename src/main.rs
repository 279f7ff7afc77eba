//! Steam Inventory - player lookup and market pricing
//!
//! Serves the lookup page, or runs a single lookup with `--lookup` and
//! prints the result as JSON.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use steam_inventory::{
    run_pipeline_with_cancel, ApiKey, PipelineConfig, RetryPolicy, Transport,
};
use tokio_util::sync::CancellationToken;

/// Steam inventory lookup server - resolves players and prices their items
#[derive(Parser, Debug)]
#[command(name = "steam_inventory")]
#[command(version, about, long_about = None)]
struct Args {
    /// Steam Web API key
    #[arg(long, env = "STEAM_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Port for the web UI
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Inventory app ID (753 = Steam community items)
    #[arg(long, default_value_t = steam_inventory::config::DEFAULT_APP_ID)]
    app_id: u64,

    /// Inventory context ID
    #[arg(long, default_value_t = steam_inventory::config::DEFAULT_CONTEXT_ID)]
    context_id: u64,

    /// Market currency code (1 = USD, 3 = EUR)
    #[arg(long, default_value_t = steam_inventory::config::DEFAULT_CURRENCY)]
    currency: u32,

    /// Proxy for all upstream requests, e.g. socks5h://127.0.0.1:9050
    #[arg(long)]
    proxy: Option<String>,

    /// Maximum concurrent price lookups
    #[arg(long, default_value_t = steam_inventory::config::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Deadline for a whole lookup in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Attempts for identity and inventory requests
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Directory served under /static
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Run one lookup, print JSON and exit
    #[arg(long)]
    lookup: Option<String>,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(ApiKey::new(self.api_key.clone()));
        config.app_id = self.app_id;
        config.context_id = self.context_id;
        config.currency = self.currency;
        config.transport = match &self.proxy {
            Some(address) => Transport::Proxied(address.clone()),
            None => Transport::Direct,
        };
        config.enrichment_concurrency = self.concurrency;
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.deadline = self.deadline_secs.map(Duration::from_secs);
        config.retry = RetryPolicy::with_attempts(self.retries);
        config
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.api_key.trim().is_empty() {
        log::error!("Steam API key is empty, set --api-key or STEAM_API_KEY");
        std::process::exit(1);
    }
    let config = args.pipeline_config();

    if let Some(input) = &args.lookup {
        run_once(input, &config).await;
        return;
    }

    log::info!("Starting steam_inventory...");
    log::info!("Static directory: {}", args.static_dir.display());

    if let Err(e) = steam_inventory::web::serve(Arc::new(config), &args.static_dir, args.port).await
    {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}

/// Run a single lookup; Ctrl-C cancels it
async fn run_once(input: &str, config: &PipelineConfig) {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling lookup");
            ctrl_c.cancel();
        }
    });

    match run_pipeline_with_cancel(input, config, &cancel).await {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                log::error!("Failed to serialize result: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            log::error!("{}: {}", e.kind().client_message(), e);
            std::process::exit(2);
        }
    }
}

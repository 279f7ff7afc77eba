//! Lookup pipeline: classify → resolve → retrieve → enrich
//!
//! Each stage only runs when the previous one succeeded. Enrichment is the
//! one stage that may finish with per-item failures.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::fetcher::{FetchError, JsonFetcher};
use crate::identity::{resolve_vanity, ResolutionOutcome, ResolveFailure};
use crate::inventory::{fetch_inventory, InventoryEntry};
use crate::market::{enrich_prices, EnrichmentFailure, MarketClient};
use crate::steam_id::{classify, Identifier, SteamId};

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classifying,
    Resolving,
    Retrieving,
    Enriching,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Classifying => "classifying input",
            Stage::Resolving => "resolving identifier",
            Stage::Retrieving => "retrieving inventory",
            Stage::Enriching => "enriching prices",
        };
        f.write_str(s)
    }
}

/// Successful lookup
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub resolved_id: SteamId,
    /// Upstream order
    pub entries: Vec<InventoryEntry>,
    /// Items whose price could not be fetched
    pub enrichment_failures: Vec<EnrichmentFailure>,
    /// Enrichment was cut short by cancellation or the deadline
    pub cancelled: bool,
}

/// Run the pipeline with no external cancellation.
///
/// `config.deadline`, when set, still bounds the run.
pub async fn run_pipeline(raw_input: &str, config: &PipelineConfig) -> Result<PipelineResult> {
    run_pipeline_with_cancel(raw_input, config, &CancellationToken::new()).await
}

/// Run the pipeline, stopping early when `cancel` fires.
///
/// Builds an HTTP client for this run only; long-lived callers should build
/// one with [`PipelineConfig::build_fetcher`] and use
/// [`run_pipeline_with_fetcher`].
pub async fn run_pipeline_with_cancel(
    raw_input: &str,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<PipelineResult> {
    match config.build_fetcher() {
        Ok(fetcher) => run_pipeline_with_fetcher(raw_input, config, &fetcher, cancel).await,
        Err(source) => {
            // Blame the first stage that would have gone upstream
            let stage = match classify(raw_input)? {
                Identifier::Canonical(_) => Stage::Retrieving,
                Identifier::VanityCandidate(_) => Stage::Resolving,
            };
            Err(PipelineError::UpstreamUnavailable { stage, source })
        }
    }
}

/// Run the pipeline on a shared HTTP client.
///
/// Cancellation before enrichment fails the run with
/// [`PipelineError::Cancelled`]; during enrichment it returns the entries
/// priced so far with the rest marked unavailable.
pub async fn run_pipeline_with_fetcher(
    raw_input: &str,
    config: &PipelineConfig,
    fetcher: &JsonFetcher,
    cancel: &CancellationToken,
) -> Result<PipelineResult> {
    let cancel = cancel.child_token();
    let _deadline = config.deadline.map(|deadline| {
        let token = cancel.clone();
        DeadlineGuard(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            log::warn!("Pipeline deadline of {:?} reached", deadline);
            token.cancel();
        }))
    });

    log::debug!("Stage: {}", Stage::Classifying);
    let identifier = classify(raw_input)?;

    let steam_id = match identifier {
        Identifier::Canonical(id) => id,
        Identifier::VanityCandidate(vanity) => {
            log::debug!("Stage: {}", Stage::Resolving);
            let outcome = until_cancelled(
                &cancel,
                Stage::Resolving,
                resolve_vanity(
                    fetcher,
                    &config.endpoints,
                    &vanity,
                    &config.api_key,
                    &config.retry,
                ),
            )
            .await?;
            match outcome {
                ResolutionOutcome::Resolved(id) => id,
                ResolutionOutcome::NotFound => return Err(PipelineError::VanityNotFound { vanity }),
                ResolutionOutcome::UpstreamFailure(failure) => {
                    return Err(resolve_failure(failure))
                }
            }
        }
    };
    log::info!("Identifier {:?} resolved to {}", raw_input, steam_id);

    log::debug!("Stage: {}", Stage::Retrieving);
    let mut entries = until_cancelled(
        &cancel,
        Stage::Retrieving,
        fetch_inventory(
            fetcher,
            &config.endpoints,
            steam_id,
            config.app_id,
            config.context_id,
            &config.retry,
        ),
    )
    .await?
    .map_err(|e| fetch_failure(Stage::Retrieving, e))?;

    log::debug!("Stage: {}", Stage::Enriching);
    let market = MarketClient::new(fetcher.clone(), &config.endpoints, config.currency, config.app_id);
    let report = enrich_prices(&market, &mut entries, config.concurrency(), &cancel).await;

    log::info!(
        "Lookup for {} done: {} entries, {} price lookups, {} failed{}",
        steam_id,
        entries.len(),
        report.lookups,
        report.failures.len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );

    Ok(PipelineResult {
        resolved_id: steam_id,
        entries,
        enrichment_failures: report.failures,
        cancelled: report.cancelled,
    })
}

/// Aborts the deadline timer when the run finishes first
struct DeadlineGuard(tokio::task::JoinHandle<()>);

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    stage: Stage,
    fut: impl Future<Output = T>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
        out = fut => Ok(out),
    }
}

fn fetch_failure(stage: Stage, err: FetchError) -> PipelineError {
    match err {
        FetchError::Decode(e) => PipelineError::Decode {
            stage,
            message: e.to_string(),
        },
        source => PipelineError::UpstreamUnavailable { stage, source },
    }
}

fn resolve_failure(failure: ResolveFailure) -> PipelineError {
    match failure {
        ResolveFailure::Fetch(e) => fetch_failure(Stage::Resolving, e),
        invalid @ ResolveFailure::InvalidSteamId(_) => PipelineError::Decode {
            stage: Stage::Resolving,
            message: invalid.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

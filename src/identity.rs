//! Vanity name resolution against the Steam Web API

use serde::Deserialize;

use crate::config::{ApiKey, Endpoints};
use crate::fetcher::{FetchError, JsonFetcher};
use crate::retry::RetryPolicy;
use crate::steam_id::SteamId;

/// `success` value meaning the vanity name was resolved
const RESOLVE_SUCCESS: i64 = 1;

/// ResolveVanityURL response envelope
#[derive(Debug, Deserialize)]
pub struct ResolveVanityResponse {
    pub response: ResolveVanityBody,
}

#[derive(Debug, Deserialize)]
pub struct ResolveVanityBody {
    pub success: i64,
    #[serde(default)]
    pub steamid: Option<String>,
    /// Present on failures, e.g. "No match"
    #[serde(default)]
    pub message: Option<String>,
}

/// Why a resolution attempt could not be interpreted
#[derive(Debug)]
pub enum ResolveFailure {
    Fetch(FetchError),
    /// Success reported but no usable `steamid` in the body
    InvalidSteamId(Option<String>),
}

impl std::fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveFailure::Fetch(e) => write!(f, "{}", e),
            ResolveFailure::InvalidSteamId(Some(raw)) => {
                write!(f, "identity service returned a non-canonical steamid: {:?}", raw)
            }
            ResolveFailure::InvalidSteamId(None) => {
                write!(f, "identity service reported success without a steamid")
            }
        }
    }
}

/// Result of resolving a vanity name
#[derive(Debug)]
pub enum ResolutionOutcome {
    Resolved(SteamId),
    NotFound,
    UpstreamFailure(ResolveFailure),
}

/// Build the ResolveVanityURL request URL
pub fn resolve_url(endpoints: &Endpoints, vanity: &str, api_key: &ApiKey) -> String {
    format!(
        "{}/ISteamUser/ResolveVanityURL/v0001/?key={}&vanityurl={}",
        endpoints.api_base,
        urlencoding::encode(api_key.expose()),
        urlencoding::encode(vanity)
    )
}

/// Interpret a decoded ResolveVanityURL response.
///
/// Only `success == 1` counts as resolved; every other code is a miss. The
/// returned `steamid` must itself be canonical.
pub fn interpret_response(response: ResolveVanityResponse) -> ResolutionOutcome {
    let body = response.response;
    if body.success != RESOLVE_SUCCESS {
        log::debug!(
            "Vanity lookup miss (success={}, message={:?})",
            body.success,
            body.message
        );
        return ResolutionOutcome::NotFound;
    }

    let parsed = body.steamid.as_deref().and_then(SteamId::parse_canonical);
    match parsed {
        Some(id) => ResolutionOutcome::Resolved(id),
        None => ResolutionOutcome::UpstreamFailure(ResolveFailure::InvalidSteamId(body.steamid)),
    }
}

/// Resolve a vanity name to a Steam ID
pub async fn resolve_vanity(
    fetcher: &JsonFetcher,
    endpoints: &Endpoints,
    vanity: &str,
    api_key: &ApiKey,
    retry: &RetryPolicy,
) -> ResolutionOutcome {
    let url = resolve_url(endpoints, vanity, api_key);
    log::info!("Resolving vanity name: {}", vanity);

    let url = url.as_str();
    let fetched = retry
        .run("vanity resolution", move || {
            fetcher.fetch_json::<ResolveVanityResponse>(url)
        })
        .await;

    match fetched {
        Ok(response) => interpret_response(response),
        Err(e) => ResolutionOutcome::UpstreamFailure(ResolveFailure::Fetch(e)),
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

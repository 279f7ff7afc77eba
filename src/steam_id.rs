//! Steam identifier classification
//!
//! Decides whether user input already is a 64-bit Steam ID or a vanity name
//! that still has to be resolved. Pure string handling, no network access.

use std::fmt;

use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Every individual account ID starts with this prefix
pub const STEAM_ID_PREFIX: &str = "7656119";
/// Decimal length of an individual account ID
pub const STEAM_ID_LEN: usize = 17;

const VANITY_URL_PREFIX: &str = "https://steamcommunity.com/id/";
const PROFILE_URL_PREFIX: &str = "https://steamcommunity.com/profiles/";

/// Canonical 64-bit Steam account ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SteamId(u64);

impl SteamId {
    /// Structural check only: prefix and length.
    pub fn looks_canonical(input: &str) -> bool {
        input.len() == STEAM_ID_LEN && input.starts_with(STEAM_ID_PREFIX)
    }

    /// Parse a string that must be a canonical ID.
    ///
    /// Returns `None` when the prefix/length heuristic fails or the digits do
    /// not parse as `u64`.
    pub fn parse_canonical(input: &str) -> Option<Self> {
        if !Self::looks_canonical(input) || !input.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        input.parse().ok().map(SteamId)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of classifying raw input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Canonical(SteamId),
    VanityCandidate(String),
}

/// Classify raw user input.
///
/// Input shaped like a Steam ID (or a `/profiles/` URL) must parse; a
/// malformed one is rejected instead of being sent to vanity resolution.
/// Anything else has the `/id/` URL prefix and one trailing slash stripped;
/// a remainder that still contains `/` is malformed.
pub fn classify(input: &str) -> Result<Identifier> {
    if let Some(rest) = input.strip_prefix(PROFILE_URL_PREFIX) {
        let digits = rest.strip_suffix('/').unwrap_or(rest);
        return canonical(input, digits).map(Identifier::Canonical);
    }

    if SteamId::looks_canonical(input) {
        return canonical(input, input).map(Identifier::Canonical);
    }

    let stripped = input.strip_prefix(VANITY_URL_PREFIX).unwrap_or(input);
    let stripped = stripped.strip_suffix('/').unwrap_or(stripped);

    if stripped.is_empty() {
        return Err(PipelineError::MalformedIdentifier {
            input: input.to_string(),
            reason: "empty identifier".to_string(),
        });
    }

    if stripped.contains('/') {
        return Err(PipelineError::MalformedIdentifier {
            input: input.to_string(),
            reason: "vanity names cannot contain '/'".to_string(),
        });
    }

    // Keeps classification idempotent for inputs like "<id>/"
    if SteamId::looks_canonical(stripped) {
        return canonical(input, stripped).map(Identifier::Canonical);
    }

    Ok(Identifier::VanityCandidate(stripped.to_string()))
}

fn canonical(input: &str, digits: &str) -> Result<SteamId> {
    SteamId::parse_canonical(digits).ok_or_else(|| PipelineError::MalformedIdentifier {
        input: input.to_string(),
        reason: format!(
            "expected {} digits starting with {}",
            STEAM_ID_LEN, STEAM_ID_PREFIX
        ),
    })
}

#[cfg(test)]
#[path = "steam_id_tests.rs"]
mod tests;

//! Error types for steam_inventory

use std::fmt;

use crate::fetcher::FetchError;
use crate::pipeline::Stage;

/// Terminal failure of an inventory lookup.
///
/// Every variant stops the pipeline at the stage that produced it. Per-item
/// pricing problems are not errors; they travel inside the result as
/// [`EnrichmentFailure`](crate::market::EnrichmentFailure) records.
#[derive(Debug)]
pub enum PipelineError {
    /// Input looks like a Steam ID (or profile URL) but cannot be parsed as one
    MalformedIdentifier { input: String, reason: String },
    /// Identity service has no account behind the vanity name
    VanityNotFound { vanity: String },
    /// Transport failure, timeout or non-2xx status from an upstream call
    UpstreamUnavailable { stage: Stage, source: FetchError },
    /// Upstream answered, but not with the shape we expect
    Decode { stage: Stage, message: String },
    /// Caller cancelled (or the deadline fired) before enrichment started
    Cancelled { stage: Stage },
}

/// Client-facing classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The supplied identifier could not be turned into an account
    InvalidIdentifier,
    /// The account exists but its inventory could not be read
    InventoryUnavailable,
    /// The lookup ran out of time
    Cancelled,
}

impl ErrorKind {
    /// Message shown to the person who submitted the lookup
    pub fn client_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidIdentifier => "Invalid Steam username or ID",
            ErrorKind::InventoryUnavailable => "Inventory is not accessible",
            ErrorKind::Cancelled => "Inventory lookup timed out",
        }
    }
}

impl PipelineError {
    /// Stage at which the pipeline stopped
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::MalformedIdentifier { .. } => Stage::Classifying,
            PipelineError::VanityNotFound { .. } => Stage::Resolving,
            PipelineError::UpstreamUnavailable { stage, .. }
            | PipelineError::Decode { stage, .. }
            | PipelineError::Cancelled { stage } => *stage,
        }
    }

    /// Classify the failure for the caller.
    ///
    /// Anything that happens while classifying or resolving is an identifier
    /// problem; anything later is an inventory problem.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
            other => match other.stage() {
                Stage::Classifying | Stage::Resolving => ErrorKind::InvalidIdentifier,
                Stage::Retrieving | Stage::Enriching => ErrorKind::InventoryUnavailable,
            },
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MalformedIdentifier { input, reason } => {
                write!(f, "Malformed Steam identifier {:?}: {}", input, reason)
            }
            PipelineError::VanityNotFound { vanity } => {
                write!(f, "No Steam account found for vanity name: {}", vanity)
            }
            PipelineError::UpstreamUnavailable { stage, source } => {
                write!(f, "Upstream unavailable while {}: {}", stage, source)
            }
            PipelineError::Decode { stage, message } => {
                write!(f, "Unexpected response while {}: {}", stage, message)
            }
            PipelineError::Cancelled { stage } => write!(f, "Cancelled while {}", stage),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::UpstreamUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

//! Error types for search aggregation.

use crate::models::{Marketplace, SourceFailure};
use thiserror::Error;

/// Error type for aggregation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// A provider failed and the all-or-nothing policy is in effect.
    #[error("{marketplace} is unavailable: {reason}")]
    SourceUnavailable {
        marketplace: Marketplace,
        reason: String,
    },

    /// Every provider failed under the partial policy.
    #[error("all sources are unavailable ({})", join_sources(.sources))]
    AllSourcesUnavailable { sources: Vec<SourceFailure> },

    /// No providers are registered.
    #[error("no marketplace providers are registered")]
    NoProviders,
}

impl AggregationError {
    /// Returns true if the failure was caused by an unresponsive source.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::AllSourcesUnavailable { .. }
        )
    }
}

/// Result type for aggregation operations.
pub type AggregationResult<T> = Result<T, AggregationError>;

fn join_sources(sources: &[SourceFailure]) -> String {
    sources
        .iter()
        .map(|s| format!("{}: {}", s.marketplace, s.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

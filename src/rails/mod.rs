//! Rail discovery.
//!
//! Defines the `RailCandidateSource` trait the quote engine gathers candidates
//! from, and provides:
//! - `StaticRailSource`: a config-supplied catalogue with reproducible FX quotes

pub mod catalogue;

use async_trait::async_trait;

use crate::types::{CurrencyPair, RailCandidate, RailscopeError};

pub use catalogue::{RailEntry, StaticRailSource};

/// What a caller wants to move: `amount` units of `pair.base()` into
/// `pair.quote()`.
#[derive(Debug, Clone, PartialEq)]
pub struct RailQuery {
    pub pair: CurrencyPair,
    pub amount: f64,
}

/// Abstraction over route-discovery collaborators.
///
/// Implementors return fully-resolved candidates; the scorer never performs
/// I/O of its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RailCandidateSource: Send + Sync {
    /// Candidate rails able to settle this query. An empty list is fine.
    async fn fetch_candidates(&self, query: &RailQuery)
        -> Result<Vec<RailCandidate>, RailscopeError>;

    /// Source name for logging and identification.
    fn name(&self) -> String;
}

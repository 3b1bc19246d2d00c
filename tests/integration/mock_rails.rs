//! Mock rail source for integration testing.
//!
//! Provides a deterministic `RailCandidateSource` implementation that
//! returns known candidates and counts how often it was asked, all
//! in-memory with no external dependencies.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use railscope::rails::{RailCandidateSource, RailQuery};
use railscope::types::{RailCandidate, RailStatus, RailscopeError};

/// A mock rail source for deterministic testing.
pub struct MockRailSource {
    name: String,
    candidates: Vec<RailCandidate>,
    calls: Arc<Mutex<Vec<RailQuery>>>,
    /// If set, every fetch returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockRailSource {
    /// A source offering the two rails used by the strategy scenarios.
    pub fn new(name: &str) -> Self {
        Self::with_candidates(name, Self::default_candidates())
    }

    pub fn with_candidates(name: &str, candidates: Vec<RailCandidate>) -> Self {
        Self {
            name: name.to_string(),
            candidates,
            calls: Arc::new(Mutex::new(Vec::new())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Every query received so far.
    pub fn calls(&self) -> Vec<RailQuery> {
        self.calls.lock().unwrap().clone()
    }

    /// Candidate A: cheap and slow. Candidate B: pricier and fast.
    pub fn default_candidates() -> Vec<RailCandidate> {
        vec![
            candidate("rail-a", 0.005, 10.0, 0.9, 0.1, RailStatus::Live),
            candidate("rail-b", 0.008, 2.0, 0.95, 0.1, RailStatus::Live),
        ]
    }
}

pub fn candidate(
    name: &str,
    fee_pct: f64,
    eta_minutes: f64,
    liquidity_score: f64,
    volatility_score: f64,
    status: RailStatus,
) -> RailCandidate {
    RailCandidate {
        name: name.to_string(),
        fee_pct,
        eta_minutes,
        quoted_exchange_rate: 83.12,
        oracle_exchange_rate: 83.12,
        liquidity_score,
        volatility_score,
        status,
    }
}

#[async_trait]
impl RailCandidateSource for MockRailSource {
    async fn fetch_candidates(
        &self,
        query: &RailQuery,
    ) -> Result<Vec<RailCandidate>, RailscopeError> {
        self.calls.lock().unwrap().push(query.clone());
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(RailscopeError::RailSource {
                source_name: self.name.clone(),
                message: msg,
            });
        }
        Ok(self.candidates.clone())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

//! Quote engine: candidates from every source → weights → ranked routes.
//!
//! Sources are queried concurrently. A failing source is logged and skipped;
//! the quote fails only when no source answered at all. When a corridor store
//! is attached, the corridor's current total fee is charged on top of every
//! rail's own fee.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::scorer::rank_with_amount;
use crate::clock::{Clock, SystemClock};
use crate::rails::{RailCandidateSource, RailQuery};
use crate::store::CorridorStore;
use crate::strategy::{resolve, ScoringWeights, Strategy, NEUTRAL_PREFERENCE};
use crate::types::{CurrencyPair, RailscopeError, ScoredRoute};

fn default_preference() -> f64 {
    NEUTRAL_PREFERENCE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Source currency code.
    pub from: String,
    /// Destination currency code.
    pub to: String,
    /// Amount in units of `from`.
    pub amount: f64,
    #[serde(default)]
    pub strategy: Strategy,
    /// 0 = cost matters most, 100 = speed matters most.
    #[serde(default = "default_preference")]
    pub preference: f64,
    /// Routes to return; the engine default when absent.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub corridor: CurrencyPair,
    pub amount: f64,
    pub strategy: Strategy,
    pub weights: ScoringWeights,
    /// Corridor fee added to every route's `fee_pct`, in bps.
    pub platform_fee_bps: u32,
    pub routes: Vec<ScoredRoute>,
    pub quoted_at: DateTime<Utc>,
}

pub struct QuoteEngine {
    sources: Vec<Arc<dyn RailCandidateSource>>,
    default_limit: usize,
    corridor_fees: Option<Arc<CorridorStore>>,
    clock: Arc<dyn Clock>,
}

impl QuoteEngine {
    pub fn new(sources: Vec<Arc<dyn RailCandidateSource>>, default_limit: usize) -> Self {
        Self {
            sources,
            default_limit: default_limit.max(1),
            corridor_fees: None,
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Charge each corridor's live total fee on top of rail fees. Quotes are
    /// then stamped with the store's clock.
    pub fn with_corridor_fees(mut self, store: Arc<CorridorStore>) -> Self {
        self.clock = Arc::clone(store.clock());
        self.corridor_fees = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, RailscopeError> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(RailscopeError::InvalidRequest(format!(
                "amount must be a positive number, got {}",
                request.amount
            )));
        }
        let limit = match request.limit {
            Some(0) => {
                return Err(RailscopeError::InvalidRequest("limit must be positive".into()))
            }
            Some(n) => n,
            None => self.default_limit,
        };
        let pair = CurrencyPair::new(&request.from, &request.to)?;

        let platform_fee_bps = self
            .corridor_fees
            .as_ref()
            .and_then(|store| store.get_state(&pair))
            .map(|state| state.total_fee_bps)
            .unwrap_or(0);

        let query = RailQuery {
            pair: pair.clone(),
            amount: request.amount,
        };
        let results = join_all(self.sources.iter().map(|source| {
            let query = &query;
            async move { (source.name(), source.fetch_candidates(query).await) }
        }))
        .await;

        let mut candidates = Vec::new();
        let mut answered = 0usize;
        let mut last_error = None;
        for (name, result) in results {
            match result {
                Ok(found) => {
                    answered += 1;
                    candidates.extend(found);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Rail source failed, skipping");
                    last_error = Some(e);
                }
            }
        }
        if answered == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let surcharge = f64::from(platform_fee_bps) / 10_000.0;
        for candidate in &mut candidates {
            candidate.fee_pct += surcharge;
        }

        let weights = resolve(request.strategy, request.preference);
        let mut routes = rank_with_amount(&candidates, &weights, Some(request.amount));
        routes.truncate(limit);

        info!(
            corridor = %pair,
            strategy = %request.strategy,
            preference = format!("{:.0}", request.preference),
            platform_fee_bps,
            candidates = candidates.len(),
            best = routes.first().map(|r| r.candidate.name.as_str()).unwrap_or("-"),
            "Quote computed"
        );

        Ok(Quote {
            corridor: pair,
            amount: request.amount,
            strategy: request.strategy,
            weights,
            platform_fee_bps,
            routes,
            quoted_at: self.clock.now(),
        })
    }
}

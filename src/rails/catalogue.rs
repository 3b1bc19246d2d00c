//! Static rail catalogue.
//!
//! Rails and reference rates come from `config.toml`. Each rail's quoted FX
//! is a deterministic skew of the oracle cross rate, seeded by the rail's
//! position in the catalogue, so the same request always gets the same quote.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{RailCandidateSource, RailQuery};
use crate::config::AppConfig;
use crate::types::{CurrencyPair, RailCandidate, RailStatus, RailscopeError};

const SOURCE_NAME: &str = "static-catalogue";

/// One rail as configured under `[[rails]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailEntry {
    pub name: String,
    /// Provider fee as a fraction of the amount.
    pub fee_pct: f64,
    pub eta_minutes: f64,
    pub liquidity: f64,
    pub volatility: f64,
    #[serde(default)]
    pub status: RailStatus,
}

#[derive(Debug, Clone)]
pub struct StaticRailSource {
    rails: Vec<RailEntry>,
    /// Units of each currency per USD.
    oracle_rates: HashMap<String, f64>,
    /// Largest relative distance between quoted and oracle rate.
    max_quote_skew: f64,
}

impl StaticRailSource {
    pub fn new(rails: Vec<RailEntry>, oracle_rates: HashMap<String, f64>, max_quote_skew: f64) -> Self {
        let oracle_rates = oracle_rates
            .into_iter()
            .map(|(code, rate)| (code.to_ascii_uppercase(), rate))
            .collect();
        Self {
            rails,
            oracle_rates,
            max_quote_skew: max_quote_skew.abs(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rails.clone(),
            config.oracle_rates.clone(),
            config.quotes.max_quote_skew,
        )
    }

    /// Units of `pair.quote()` per unit of `pair.base()`.
    pub fn oracle_rate(&self, pair: &CurrencyPair) -> Result<f64, RailscopeError> {
        let rate = |code: &str| {
            self.oracle_rates
                .get(code)
                .copied()
                .ok_or_else(|| RailscopeError::RailSource {
                    source_name: SOURCE_NAME.to_string(),
                    message: format!("no reference rate for {code}"),
                })
        };
        Ok(rate(pair.quote())? / rate(pair.base())?)
    }

    /// Oracle rate skewed by a pseudo-random factor in (−skew, +skew).
    fn quoted_rate(&self, oracle: f64, seed: usize) -> f64 {
        let noise = ((seed as f64).sin() * 10_000.0).fract();
        oracle * (1.0 + noise * self.max_quote_skew)
    }
}

#[async_trait]
impl RailCandidateSource for StaticRailSource {
    async fn fetch_candidates(
        &self,
        query: &RailQuery,
    ) -> Result<Vec<RailCandidate>, RailscopeError> {
        let oracle = self.oracle_rate(&query.pair)?;

        let candidates: Vec<RailCandidate> = self
            .rails
            .iter()
            .enumerate()
            .map(|(i, rail)| RailCandidate {
                name: rail.name.clone(),
                fee_pct: rail.fee_pct,
                eta_minutes: rail.eta_minutes,
                quoted_exchange_rate: self.quoted_rate(oracle, i),
                oracle_exchange_rate: oracle,
                liquidity_score: rail.liquidity,
                volatility_score: rail.volatility,
                status: rail.status,
            })
            .collect();

        debug!(
            pair = %query.pair,
            oracle = format!("{oracle:.4}"),
            count = candidates.len(),
            "Catalogue candidates"
        );
        Ok(candidates)
    }

    fn name(&self) -> String {
        SOURCE_NAME.to_string()
    }
}

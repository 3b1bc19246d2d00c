//! Rail scoring and ranking.
//!
//! Pure functions: no shared state, safe to call from any number of quote
//! requests at once.
//!
//! ```text
//! score = 100
//!       − fee_pct × 100 × fee_weight
//!       − (eta_minutes / 60) × speed_weight
//!       + liquidity_score × 10 × liquidity_weight
//!       − volatility_score × 10 × volatility_weight
//!       − fx_spread_pct × 50
//!       − 20 if degraded
//! ```

use std::cmp::Ordering;
use tracing::debug;

use crate::strategy::ScoringWeights;
use crate::types::{RailCandidate, RailStatus, ScoredRoute};

pub const BASE_SCORE: f64 = 100.0;
pub const DEGRADED_PENALTY: f64 = 20.0;
const SPREAD_PENALTY: f64 = 50.0;

/// Relative FX spread between the quoted and the oracle rate.
///
/// A zero (or non-finite) oracle rate is a data-quality issue upstream, not a
/// scoring failure: the spread is taken as 0.
pub fn fx_spread_pct(candidate: &RailCandidate) -> f64 {
    let oracle = candidate.oracle_exchange_rate;
    if oracle == 0.0 || !oracle.is_finite() {
        return 0.0;
    }
    ((candidate.quoted_exchange_rate - oracle) / oracle).abs()
}

/// Composite desirability score. Higher is better.
pub fn score(candidate: &RailCandidate, weights: &ScoringWeights) -> f64 {
    let raw = BASE_SCORE - candidate.fee_pct * 100.0 * weights.fee_weight
        - (candidate.eta_minutes / 60.0) * weights.speed_weight
        + candidate.liquidity_score * 10.0 * weights.liquidity_weight
        - candidate.volatility_score * 10.0 * weights.volatility_weight
        - fx_spread_pct(candidate) * SPREAD_PENALTY;

    match candidate.status {
        RailStatus::Degraded => raw - DEGRADED_PENALTY,
        RailStatus::Live | RailStatus::Unavailable => raw,
    }
}

/// Rank candidates best-first. Unavailable rails are dropped.
pub fn rank(candidates: &[RailCandidate], weights: &ScoringWeights) -> Vec<ScoredRoute> {
    rank_with_amount(candidates, weights, None)
}

/// Rank candidates and, when `amount` is given, fill in `amount_out`
/// (amount after fees, converted at the quoted rate).
pub fn rank_with_amount(
    candidates: &[RailCandidate],
    weights: &ScoringWeights,
    amount: Option<f64>,
) -> Vec<ScoredRoute> {
    let mut routes: Vec<ScoredRoute> = candidates
        .iter()
        .filter(|c| c.status != RailStatus::Unavailable)
        .map(|c| {
            let route = ScoredRoute {
                candidate: c.clone(),
                score: score(c, weights),
                fx_spread_pct: fx_spread_pct(c),
                amount_out: amount.map(|a| a * (1.0 - c.fee_pct) * c.quoted_exchange_rate),
            };
            debug!(
                rail = %c.name,
                status = %c.status,
                score = format!("{:.3}", route.score),
                spread = format!("{:.4}%", route.fx_spread_pct * 100.0),
                "Rail scored"
            );
            route
        })
        .collect();

    routes.sort_by(compare_routes);
    routes
}

/// Total order: score desc, then fee asc, eta asc, name asc.
fn compare_routes(a: &ScoredRoute, b: &ScoredRoute) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.candidate.fee_pct.total_cmp(&b.candidate.fee_pct))
        .then_with(|| a.candidate.eta_minutes.total_cmp(&b.candidate.eta_minutes))
        .then_with(|| a.candidate.name.cmp(&b.candidate.name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Corridor aggregation: decayed signals → bounded fee adjustment + risk.
//!
//! For each corridor:
//!   raw   = Σ contribution(s, now) over live signals targeting the pair or ALL
//!         (+ window boost while inside a sensitive window with live signals)
//!   adj   = min(round(raw), corridor cap, global cap), never below 0
//!   risk  = adj / corridor cap, scaled by the window's risk weight, then
//!           pulled toward 1 when a high-impact source is live
//!   sensitive = risk ≥ threshold OR high-impact live OR inside a window

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use super::decay::DecayModel;
use super::window::{effect_at, WindowEffect};
use crate::config::CorridorConfig;
use crate::types::{CorridorState, RailscopeError, Signal, SignalSource};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_GLOBAL_MAX_ADJ_BPS: u32 = 75;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    /// Absolute ceiling on any corridor's adjustment.
    pub global_max_adj_bps: u32,
    /// Central-bank / multilateral-program sources.
    pub high_impact_sources: Vec<SignalSource>,
    /// Fraction of the remaining risk headroom added while a high-impact
    /// signal is live (0 disables the boost).
    pub high_impact_risk_boost: f64,
    /// Risk score at or above which a corridor is flagged sensitive.
    pub sensitive_risk_threshold: f64,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            global_max_adj_bps: DEFAULT_GLOBAL_MAX_ADJ_BPS,
            high_impact_sources: vec![
                SignalSource::RbiIntervention,
                SignalSource::ImfPakistanProgram,
            ],
            high_impact_risk_boost: 0.25,
            sensitive_risk_threshold: 0.6,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CorridorAggregator {
    decay: DecayModel,
    settings: AggregatorSettings,
}

impl CorridorAggregator {
    pub fn new(decay: DecayModel, settings: AggregatorSettings) -> Self {
        Self { decay, settings }
    }

    pub fn decay(&self) -> &DecayModel {
        &self.decay
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// The tighter of the corridor's own cap and the global cap.
    pub fn effective_cap(&self, corridor: &CorridorConfig) -> u32 {
        corridor.max_adj_bps.min(self.settings.global_max_adj_bps)
    }

    /// Compute one corridor's state from the full signal set.
    pub fn aggregate(
        &self,
        corridor: &CorridorConfig,
        signals: &[Arc<Signal>],
        now: DateTime<Utc>,
    ) -> Result<CorridorState, RailscopeError> {
        let mut raw = 0.0;
        let mut high_impact = false;
        let mut active = Vec::new();

        for signal in signals.iter().filter(|s| s.corridor.covers(&corridor.pair)) {
            if self.decay.is_expired(signal, now) {
                continue;
            }
            raw += self.decay.contribution(signal, now);
            high_impact |= self.settings.high_impact_sources.contains(&signal.source);
            active.push(Arc::clone(signal));
        }

        let window = if active.is_empty() {
            WindowEffect::NONE
        } else {
            effect_at(&corridor.windows, now)
        };
        raw += window.boost_bps;

        if !raw.is_finite() {
            return Err(RailscopeError::Aggregation(format!(
                "{}: raw adjustment is not finite ({raw})",
                corridor.pair
            )));
        }

        let cap = self.effective_cap(corridor);
        let suggested_adj_bps = raw.round().clamp(0.0, f64::from(cap)) as u32;

        let mut risk_score = if cap == 0 {
            0.0
        } else {
            f64::from(suggested_adj_bps) / f64::from(cap)
        };
        risk_score = (risk_score * window.risk_weight).clamp(0.0, 1.0);
        if high_impact {
            risk_score += (1.0 - risk_score) * self.settings.high_impact_risk_boost;
        }
        let risk_score = risk_score.clamp(0.0, 1.0);

        let in_sensitive_window = risk_score >= self.settings.sensitive_risk_threshold
            || high_impact
            || window.in_window;

        debug!(
            pair = %corridor.pair,
            raw_bps = format!("{raw:.3}"),
            adj_bps = suggested_adj_bps,
            cap_bps = cap,
            risk = format!("{risk_score:.3}"),
            active = active.len(),
            in_window = window.in_window,
            "Corridor aggregated"
        );

        Ok(CorridorState {
            pair: corridor.pair.clone(),
            base_fee_bps: corridor.base_fee_bps,
            suggested_adj_bps,
            total_fee_bps: corridor.base_fee_bps.saturating_add(suggested_adj_bps),
            risk_score,
            active_signals: active,
            in_sensitive_window,
            last_computed_at: now,
        })
    }

    /// Compute every corridor, or fail without partial output.
    pub fn aggregate_all(
        &self,
        corridors: &[CorridorConfig],
        signals: &[Arc<Signal>],
        now: DateTime<Utc>,
    ) -> Result<Vec<CorridorState>, RailscopeError> {
        corridors
            .iter()
            .map(|c| self.aggregate(c, signals, now))
            .collect()
    }

    /// Drop expired signals. Returns how many were removed.
    pub fn retain_live(&self, signals: &mut Vec<Arc<Signal>>, now: DateTime<Utc>) -> usize {
        let before = signals.len();
        signals.retain(|s| !self.decay.is_expired(s, now));
        before - signals.len()
    }
}

impl Default for CorridorAggregator {
    fn default() -> Self {
        Self::new(DecayModel::default(), AggregatorSettings::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

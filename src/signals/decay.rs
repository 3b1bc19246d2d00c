//! Signal decay.
//!
//! Maps a signal and an instant to its current contribution in basis points:
//! `magnitude × source_weight(source) × decay_factor(elapsed)`, where the
//! decay factor falls from 1 at creation to exactly 0 at `created_at + ttl`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Signal, SignalSource};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Default bps per unit of magnitude, per source.
pub const DEFAULT_SOURCE_WEIGHTS: &[(SignalSource, f64)] = &[
    (SignalSource::Manual, 5.0),
    (SignalSource::RbiIntervention, 12.0),
    (SignalSource::ImfPakistanProgram, 9.0),
    (SignalSource::UpiUkPolicy, 6.0),
    (SignalSource::MarketVol, 10.0),
    (SignalSource::LiquidityDrain, 14.0),
    (SignalSource::SpreadWidening, 11.0),
    (SignalSource::Other, 6.0),
];

/// Contributions below this many bps count as expired.
pub const DEFAULT_EXPIRY_EPSILON_BPS: f64 = 0.005;

/// Shape of the decay between creation and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecayCurve {
    /// `1 − elapsed / ttl`.
    #[default]
    Linear,
    /// `0.5 ^ (elapsed / half_life)`, cut to 0 at the TTL.
    Exponential { half_life_secs: f64 },
}

/// Per-source weight table. Sources missing from an override keep their
/// default weight.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceWeights {
    weights: HashMap<SignalSource, f64>,
}

impl SourceWeights {
    pub fn with_overrides(overrides: &HashMap<SignalSource, f64>) -> Self {
        let mut table = Self::default();
        table
            .weights
            .extend(overrides.iter().map(|(source, bps)| (*source, *bps)));
        table
    }

    pub fn get(&self, source: SignalSource) -> f64 {
        self.weights.get(&source).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalSource, f64)> + '_ {
        self.weights.iter().map(|(s, w)| (*s, *w))
    }
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            weights: DEFAULT_SOURCE_WEIGHTS.iter().copied().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decay model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DecayModel {
    weights: SourceWeights,
    curve: DecayCurve,
    expiry_epsilon_bps: f64,
}

impl DecayModel {
    pub fn new(weights: SourceWeights, curve: DecayCurve) -> Self {
        Self {
            weights,
            curve,
            expiry_epsilon_bps: DEFAULT_EXPIRY_EPSILON_BPS,
        }
    }

    pub fn with_expiry_epsilon(mut self, bps: f64) -> Self {
        self.expiry_epsilon_bps = bps.max(0.0);
        self
    }

    pub fn source_weight(&self, source: SignalSource) -> f64 {
        self.weights.get(source)
    }

    pub fn curve(&self) -> DecayCurve {
        self.curve
    }

    /// Fraction of the TTL already elapsed, clamped to [0, 1].
    pub fn elapsed_fraction(signal: &Signal, now: DateTime<Utc>) -> f64 {
        if signal.ttl_seconds == 0 {
            return 1.0;
        }
        let elapsed = elapsed_secs(signal, now);
        (elapsed / signal.ttl_seconds as f64).clamp(0.0, 1.0)
    }

    /// Current contribution of `signal` in bps. Non-increasing in `now`,
    /// exactly 0 once the TTL has run out.
    pub fn contribution(&self, signal: &Signal, now: DateTime<Utc>) -> f64 {
        let fraction = Self::elapsed_fraction(signal, now);
        if fraction >= 1.0 {
            return 0.0;
        }

        let factor = match self.curve {
            DecayCurve::Linear => 1.0 - fraction,
            DecayCurve::Exponential { half_life_secs } if half_life_secs > 0.0 => {
                0.5_f64.powf(elapsed_secs(signal, now) / half_life_secs)
            }
            DecayCurve::Exponential { .. } => 1.0,
        };

        signal.magnitude * self.source_weight(signal.source) * factor
    }

    /// A signal is expired once its TTL has elapsed or its contribution has
    /// fallen below the expiry epsilon. Expiry is permanent.
    pub fn is_expired(&self, signal: &Signal, now: DateTime<Utc>) -> bool {
        Self::elapsed_fraction(signal, now) >= 1.0
            || self.contribution(signal, now) < self.expiry_epsilon_bps
    }
}

impl Default for DecayModel {
    fn default() -> Self {
        Self::new(SourceWeights::default(), DecayCurve::Linear)
    }
}

fn elapsed_secs(signal: &Signal, now: DateTime<Utc>) -> f64 {
    let ms = (now - signal.created_at).num_milliseconds().max(0);
    ms as f64 / 1000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

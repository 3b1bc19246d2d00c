//! Strategy resolution: named presets plus the speed/cost slider.
//!
//! A [`Strategy`] picks a base weight vector; the caller's speed/cost
//! preference (0 = cheapest, 100 = fastest) then tilts the fee and speed
//! weights continuously around the midpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::RailscopeError;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Concrete weights consumed by the score engine. Every weight is > 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Higher = penalises fees more.
    pub fee_weight: f64,
    /// Higher = penalises latency more.
    pub speed_weight: f64,
    /// Higher = rewards liquidity more.
    pub liquidity_weight: f64,
    /// Higher = penalises volatility more.
    pub volatility_weight: f64,
}

impl fmt::Display for ScoringWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fee={:.3} speed={:.3} liq={:.3} vol={:.3}",
            self.fee_weight, self.speed_weight, self.liquidity_weight, self.volatility_weight
        )
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Named weighting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Balanced,
    Fast,
    Cheap,
    Safe,
}

impl Strategy {
    pub const ALL: &'static [Strategy] = &[
        Strategy::Balanced,
        Strategy::Fast,
        Strategy::Cheap,
        Strategy::Safe,
    ];

    /// The unmodified weight vector for this preset.
    pub const fn preset(self) -> ScoringWeights {
        match self {
            Strategy::Balanced => ScoringWeights {
                fee_weight: 2.0,
                speed_weight: 0.1,
                liquidity_weight: 1.0,
                volatility_weight: 5.0,
            },
            Strategy::Fast => ScoringWeights {
                fee_weight: 1.0,
                speed_weight: 0.5,
                liquidity_weight: 0.8,
                volatility_weight: 3.0,
            },
            Strategy::Cheap => ScoringWeights {
                fee_weight: 4.0,
                speed_weight: 0.05,
                liquidity_weight: 0.5,
                volatility_weight: 2.0,
            },
            Strategy::Safe => ScoringWeights {
                fee_weight: 1.5,
                speed_weight: 0.05,
                liquidity_weight: 2.0,
                volatility_weight: 8.0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Balanced => "balanced",
            Strategy::Fast => "fast",
            Strategy::Cheap => "cheap",
            Strategy::Safe => "safe",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RailscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced" | "default" => Ok(Strategy::Balanced),
            "fast" | "fastest" => Ok(Strategy::Fast),
            "cheap" | "cheapest" => Ok(Strategy::Cheap),
            "safe" => Ok(Strategy::Safe),
            _ => Err(RailscopeError::UnknownStrategy(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Slider midpoint.
pub const NEUTRAL_PREFERENCE: f64 = 50.0;

/// Resolve a strategy and a speed/cost preference into concrete weights.
///
/// `preference` is clamped to [0, 100] and mapped to `f = preference / 50`:
///   fee'   = fee   × (2 − f × 0.5)
///   speed' = speed × (1 + f × 0.5)
/// Liquidity and volatility weights pass through unchanged.
pub fn resolve(strategy: Strategy, preference: f64) -> ScoringWeights {
    let preference = if preference.is_finite() {
        preference.clamp(0.0, 100.0)
    } else {
        NEUTRAL_PREFERENCE
    };
    let f = preference / NEUTRAL_PREFERENCE;
    let base = strategy.preset();

    ScoringWeights {
        fee_weight: base.fee_weight * (2.0 - f * 0.5),
        speed_weight: base.speed_weight * (1.0 + f * 0.5),
        ..base
    }
}

/// String-keyed variant of [`resolve`] for callers holding a strategy name.
pub fn resolve_named(name: &str, preference: f64) -> Result<ScoringWeights, RailscopeError> {
    Ok(resolve(name.parse()?, preference))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_neutral_preference_scales_fee_and_speed_equally() {
        let w = resolve(Strategy::Balanced, NEUTRAL_PREFERENCE);
        assert!(approx(w.fee_weight, 2.0 * 1.5));
        assert!(approx(w.speed_weight, 0.1 * 1.5));
        assert!(approx(w.liquidity_weight, 1.0));
        assert!(approx(w.volatility_weight, 5.0));
    }

    #[test]
    fn test_slider_extremes() {
        let cheapest = resolve(Strategy::Fast, 0.0);
        assert!(approx(cheapest.fee_weight, 2.0));
        assert!(approx(cheapest.speed_weight, 0.5));

        let fastest = resolve(Strategy::Fast, 100.0);
        assert!(approx(fastest.fee_weight, 1.0));
        assert!(approx(fastest.speed_weight, 1.0));
    }

    #[test]
    fn test_slider_is_continuous_at_midpoint() {
        let below = resolve(Strategy::Cheap, 49.999);
        let mid = resolve(Strategy::Cheap, 50.0);
        let above = resolve(Strategy::Cheap, 50.001);
        assert!((below.fee_weight - mid.fee_weight).abs() < 1e-3);
        assert!((above.speed_weight - mid.speed_weight).abs() < 1e-3);
        assert!(below.fee_weight > above.fee_weight);
        assert!(below.speed_weight < above.speed_weight);
    }

    #[test]
    fn test_out_of_range_preference_is_clamped() {
        assert_eq!(resolve(Strategy::Safe, -20.0), resolve(Strategy::Safe, 0.0));
        assert_eq!(resolve(Strategy::Safe, 250.0), resolve(Strategy::Safe, 100.0));
        assert_eq!(
            resolve(Strategy::Safe, f64::NAN),
            resolve(Strategy::Safe, NEUTRAL_PREFERENCE)
        );
    }

    #[test]
    fn test_all_weights_positive() {
        for strategy in Strategy::ALL {
            for pref in [0.0, 25.0, 50.0, 75.0, 100.0] {
                let w = resolve(*strategy, pref);
                assert!(w.fee_weight > 0.0, "{strategy} @ {pref}");
                assert!(w.speed_weight > 0.0, "{strategy} @ {pref}");
                assert!(w.liquidity_weight > 0.0, "{strategy} @ {pref}");
                assert!(w.volatility_weight > 0.0, "{strategy} @ {pref}");
            }
        }
    }

    #[test]
    fn test_parse_strategy_names() {
        assert_eq!("Balanced".parse::<Strategy>().unwrap(), Strategy::Balanced);
        assert_eq!("fast".parse::<Strategy>().unwrap(), Strategy::Fast);
        assert_eq!(" cheap ".parse::<Strategy>().unwrap(), Strategy::Cheap);
        assert!(matches!(
            "yolo".parse::<Strategy>(),
            Err(RailscopeError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_resolve_named() {
        let w = resolve_named("cheap", 50.0).unwrap();
        assert_eq!(w, resolve(Strategy::Cheap, 50.0));
        assert!(resolve_named("nope", 50.0).is_err());
    }
}

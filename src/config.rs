//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section is optional; anything left out falls back to the built-in
//! corridor set, caps and source weights.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;

use crate::rails::catalogue::RailEntry;
use crate::signals::aggregator::{AggregatorSettings, DEFAULT_GLOBAL_MAX_ADJ_BPS};
use crate::signals::decay::{DecayCurve, DecayModel, SourceWeights, DEFAULT_EXPIRY_EPSILON_BPS};
use crate::signals::window::SensitiveWindow;
use crate::signals::CorridorAggregator;
use crate::types::{CurrencyPair, RailStatus, RailscopeError, SignalSource};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub caps: CapsConfig,
    #[serde(default = "default_corridors")]
    pub corridors: Vec<CorridorConfig>,
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "default_rails")]
    pub rails: Vec<RailEntry>,
    #[serde(default = "default_oracle_rates")]
    pub oracle_rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
    /// Period of the expiry / recompute tick.
    pub tick_interval_secs: u64,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "RAILSCOPE-001".to_string(),
            tick_interval_secs: 10,
            event_buffer: 64,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CapsConfig {
    pub global_max_adj_bps: u32,
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            global_max_adj_bps: DEFAULT_GLOBAL_MAX_ADJ_BPS,
        }
    }
}

fn default_base_fee_bps() -> u32 {
    70
}

/// One monitored corridor.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CorridorConfig {
    pub pair: CurrencyPair,
    #[serde(default = "default_base_fee_bps")]
    pub base_fee_bps: u32,
    /// Per-corridor safety cap on the dynamic adjustment.
    pub max_adj_bps: u32,
    #[serde(default)]
    pub windows: Vec<SensitiveWindow>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SignalsConfig {
    /// bps per unit magnitude, keyed by source name; missing sources keep
    /// their defaults.
    pub source_weights_bps: HashMap<String, f64>,
    pub decay: DecayCurve,
    pub high_impact_sources: Vec<SignalSource>,
    pub high_impact_risk_boost: f64,
    pub sensitive_risk_threshold: f64,
    pub expiry_epsilon_bps: f64,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        let settings = AggregatorSettings::default();
        Self {
            source_weights_bps: HashMap::new(),
            decay: DecayCurve::Linear,
            high_impact_sources: settings.high_impact_sources,
            high_impact_risk_boost: settings.high_impact_risk_boost,
            sensitive_risk_threshold: settings.sensitive_risk_threshold,
            expiry_epsilon_bps: DEFAULT_EXPIRY_EPSILON_BPS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuotesConfig {
    /// Routes returned per quote when the request does not say.
    pub default_limit: usize,
    /// Add the corridor's current total fee to every candidate's fee.
    pub platform_fee_from_corridor: bool,
    /// Maximum relative skew of the static catalogue's quoted FX.
    pub max_quote_skew: f64,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            default_limit: 3,
            platform_fee_from_corridor: true,
            max_quote_skew: 0.004,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            caps: CapsConfig::default(),
            corridors: default_corridors(),
            signals: SignalsConfig::default(),
            quotes: QuotesConfig::default(),
            api: ApiConfig::default(),
            rails: default_rails(),
            oracle_rates: default_oracle_rates(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the store could not honour.
    pub fn validate(&self) -> Result<(), RailscopeError> {
        if self.service.tick_interval_secs == 0 {
            return Err(RailscopeError::Config(
                "service.tick_interval_secs must be positive".into(),
            ));
        }
        if self.service.event_buffer == 0 {
            return Err(RailscopeError::Config(
                "service.event_buffer must be positive".into(),
            ));
        }
        if self.corridors.is_empty() {
            return Err(RailscopeError::Config("at least one corridor is required".into()));
        }

        let mut seen = HashSet::new();
        for corridor in &self.corridors {
            if !seen.insert(&corridor.pair) {
                return Err(RailscopeError::Config(format!(
                    "duplicate corridor: {}",
                    corridor.pair
                )));
            }
            if corridor.max_adj_bps > self.caps.global_max_adj_bps {
                return Err(RailscopeError::Config(format!(
                    "{}: corridor cap {} bps is looser than the global cap {} bps",
                    corridor.pair, corridor.max_adj_bps, self.caps.global_max_adj_bps
                )));
            }
            for window in &corridor.windows {
                window.validate()?;
            }
        }

        for (source, bps) in &self.signals.source_weights_bps {
            source.parse::<SignalSource>().map_err(|_| {
                RailscopeError::Config(format!("unknown signal source in weights: {source}"))
            })?;
            if !bps.is_finite() || *bps < 0.0 {
                return Err(RailscopeError::Config(format!(
                    "source weight for {source} must be a non-negative number"
                )));
            }
        }
        if let DecayCurve::Exponential { half_life_secs } = self.signals.decay {
            if !half_life_secs.is_finite() || half_life_secs <= 0.0 {
                return Err(RailscopeError::Config(
                    "signals.decay half_life_secs must be positive".into(),
                ));
            }
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&self.signals.high_impact_risk_boost)
            || !unit.contains(&self.signals.sensitive_risk_threshold)
        {
            return Err(RailscopeError::Config(
                "risk boost and sensitive threshold must lie in [0, 1]".into(),
            ));
        }

        if self.quotes.default_limit == 0 {
            return Err(RailscopeError::Config("quotes.default_limit must be positive".into()));
        }
        for (code, rate) in &self.oracle_rates {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(RailscopeError::Config(format!(
                    "oracle rate for {code} must be positive"
                )));
            }
        }
        Ok(())
    }

    pub fn decay_model(&self) -> DecayModel {
        DecayModel::new(
            SourceWeights::with_overrides(&self.source_weight_overrides()),
            self.signals.decay,
        )
        .with_expiry_epsilon(self.signals.expiry_epsilon_bps)
    }

    /// Parsed weight overrides. Unknown names are rejected by `validate`.
    fn source_weight_overrides(&self) -> HashMap<SignalSource, f64> {
        self.signals
            .source_weights_bps
            .iter()
            .filter_map(|(name, bps)| name.parse::<SignalSource>().ok().map(|source| (source, *bps)))
            .collect()
    }

    pub fn aggregator(&self) -> CorridorAggregator {
        CorridorAggregator::new(
            self.decay_model(),
            AggregatorSettings {
                global_max_adj_bps: self.caps.global_max_adj_bps,
                high_impact_sources: self.signals.high_impact_sources.clone(),
                high_impact_risk_boost: self.signals.high_impact_risk_boost,
                sensitive_risk_threshold: self.signals.sensitive_risk_threshold,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Built-in defaults
// ---------------------------------------------------------------------------

fn default_corridors() -> Vec<CorridorConfig> {
    vec![
        CorridorConfig {
            pair: CurrencyPair::known("USD", "INR"),
            base_fee_bps: 70,
            max_adj_bps: 40,
            windows: Vec::new(),
        },
        CorridorConfig {
            pair: CurrencyPair::known("USD", "PKR"),
            base_fee_bps: 70,
            max_adj_bps: 60,
            windows: Vec::new(),
        },
        CorridorConfig {
            pair: CurrencyPair::known("GBP", "INR"),
            base_fee_bps: 70,
            max_adj_bps: 50,
            windows: Vec::new(),
        },
    ]
}

fn rail(name: &str, fee_pct: f64, eta_minutes: f64, liquidity: f64, volatility: f64) -> RailEntry {
    RailEntry {
        name: name.to_string(),
        fee_pct,
        eta_minutes,
        liquidity,
        volatility,
        status: RailStatus::Live,
    }
}

fn default_rails() -> Vec<RailEntry> {
    vec![
        rail("SWIFT gpi", 0.012, 1440.0, 0.95, 0.05),
        rail("Wise", 0.0065, 60.0, 0.85, 0.08),
        rail("Stellar USDC", 0.002, 1.0, 0.7, 0.2),
        rail("XRPL RLUSD", 0.0025, 0.5, 0.65, 0.25),
        rail("UPI Link", 0.004, 5.0, 0.8, 0.1),
    ]
}

fn default_oracle_rates() -> HashMap<String, f64> {
    [
        ("USD", 1.0),
        ("CAD", 1.35),
        ("EUR", 0.92),
        ("GBP", 0.79),
        ("INR", 83.12),
        ("PKR", 278.0),
        ("MXN", 17.12),
        ("BRL", 5.53),
        ("CNY", 7.24),
    ]
    .into_iter()
    .map(|(code, rate)| (code.to_string(), rate))
    .collect()
}

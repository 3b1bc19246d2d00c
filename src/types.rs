//! Shared types for RAILSCOPE.
//!
//! These types form the data model used across all modules: rail candidates
//! and their scored routes on the quoting side, signals and corridor states on
//! the fee-watch side. They are plain data so that the strategy, engine,
//! signal and store modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Rails
// ---------------------------------------------------------------------------

/// Operational status reported for a candidate rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RailStatus {
    #[default]
    Live,
    Degraded,
    Unavailable,
}

impl fmt::Display for RailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RailStatus::Live => write!(f, "live"),
            RailStatus::Degraded => write!(f, "degraded"),
            RailStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A candidate settlement path for one quote request.
///
/// Supplied by a route-discovery collaborator and owned by the request that
/// asked for it; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailCandidate {
    /// Provider / rail name. Last tie-breaker when ranking.
    pub name: String,
    /// Total fee as a fraction of the amount (0.005 = 0.5%).
    pub fee_pct: f64,
    /// Expected settlement time in minutes.
    pub eta_minutes: f64,
    /// Exchange rate the rail quotes.
    pub quoted_exchange_rate: f64,
    /// Reference (oracle) exchange rate for the same pair.
    pub oracle_exchange_rate: f64,
    /// Liquidity depth, 0.0–1.0.
    pub liquidity_score: f64,
    /// Volatility exposure, ≥ 0.
    pub volatility_score: f64,
    #[serde(default)]
    pub status: RailStatus,
}

impl fmt::Display for RailCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (fee: {:.2}% | eta: {:.0}m | liq: {:.2} | vol: {:.2} | {})",
            self.name,
            self.fee_pct * 100.0,
            self.eta_minutes,
            self.liquidity_score,
            self.volatility_score,
            self.status,
        )
    }
}

/// A ranked candidate with its composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRoute {
    #[serde(flatten)]
    pub candidate: RailCandidate,
    pub score: f64,
    /// |quoted − oracle| / oracle, 0 when the oracle rate is zero.
    pub fx_spread_pct: f64,
    /// Amount received after fees at the quoted rate, when the amount is known.
    pub amount_out: Option<f64>,
}

// ---------------------------------------------------------------------------
// Corridors
// ---------------------------------------------------------------------------

/// A currency corridor such as `USD/INR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    /// Build a pair from two ISO-style currency codes (three ASCII letters).
    pub fn new(base: &str, quote: &str) -> Result<Self, RailscopeError> {
        let base = normalise_code(base)?;
        let quote = normalise_code(quote)?;
        if base == quote {
            return Err(RailscopeError::InvalidRequest(format!(
                "corridor needs two distinct currencies, got {base}/{quote}"
            )));
        }
        Ok(Self { base, quote })
    }

    /// Built-in corridor codes, already upper-case and distinct.
    pub(crate) fn known(base: &'static str, quote: &'static str) -> Self {
        Self {
            base: base.to_string(),
            quote: quote.to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }
}

fn normalise_code(code: &str) -> Result<String, RailscopeError> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(RailscopeError::InvalidRequest(format!(
            "invalid currency code: {code:?}"
        )))
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = RailscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once(['/', '-'])
            .ok_or_else(|| RailscopeError::InvalidRequest(format!("invalid corridor: {s:?}")))?;
        Self::new(base, quote)
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = RailscopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.to_string()
    }
}

/// The corridor(s) a signal applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CorridorTarget {
    /// Every corridor the store knows about.
    All,
    Pair(CurrencyPair),
}

impl CorridorTarget {
    /// Whether a signal with this target feeds the given corridor.
    pub fn covers(&self, pair: &CurrencyPair) -> bool {
        match self {
            CorridorTarget::All => true,
            CorridorTarget::Pair(p) => p == pair,
        }
    }
}

impl fmt::Display for CorridorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorridorTarget::All => write!(f, "ALL"),
            CorridorTarget::Pair(p) => write!(f, "{p}"),
        }
    }
}

impl FromStr for CorridorTarget {
    type Err = RailscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(CorridorTarget::All)
        } else {
            s.parse().map(CorridorTarget::Pair)
        }
    }
}

impl TryFrom<String> for CorridorTarget {
    type Error = RailscopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CorridorTarget> for String {
    fn from(target: CorridorTarget) -> Self {
        target.to_string()
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Where a market signal came from. Each source carries its own bps weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalSource {
    RbiIntervention,
    ImfPakistanProgram,
    UpiUkPolicy,
    MarketVol,
    LiquidityDrain,
    SpreadWidening,
    Manual,
    Other,
}

impl SignalSource {
    /// All known sources (useful for iteration).
    pub const ALL: &'static [SignalSource] = &[
        SignalSource::RbiIntervention,
        SignalSource::ImfPakistanProgram,
        SignalSource::UpiUkPolicy,
        SignalSource::MarketVol,
        SignalSource::LiquidityDrain,
        SignalSource::SpreadWidening,
        SignalSource::Manual,
        SignalSource::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::RbiIntervention => "RBI_INTERVENTION",
            SignalSource::ImfPakistanProgram => "IMF_PAKISTAN_PROGRAM",
            SignalSource::UpiUkPolicy => "UPI_UK_POLICY",
            SignalSource::MarketVol => "MARKET_VOL",
            SignalSource::LiquidityDrain => "LIQUIDITY_DRAIN",
            SignalSource::SpreadWidening => "SPREAD_WIDENING",
            SignalSource::Manual => "MANUAL",
            SignalSource::Other => "OTHER",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a source name (case-insensitive, `-` or `_` separated).
impl FromStr for SignalSource {
    type Err = RailscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        SignalSource::ALL
            .iter()
            .copied()
            .find(|src| src.as_str() == wanted)
            .ok_or_else(|| RailscopeError::InvalidRequest(format!("unknown signal source: {s}")))
    }
}

/// Unique identifier assigned to a signal on ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(Uuid);

impl SignalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signal as submitted by a caller, before validation.
///
/// There is deliberately no id or timestamp here: both are assigned by the
/// ingestor so a submission cannot be backdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalInput {
    pub source: SignalSource,
    /// `"ALL"`, a known pair such as `"USD/INR"`, or absent (= ALL).
    #[serde(default)]
    pub corridor: Option<String>,
    pub magnitude: f64,
    pub ttl_seconds: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// A validated, timestamped signal held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub source: SignalSource,
    pub corridor: CorridorTarget,
    pub magnitude: f64,
    pub ttl_seconds: u64,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl Signal {
    /// The instant at which this signal's contribution reaches zero.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        self.created_at
            .checked_add_signed(chrono::Duration::seconds(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ×{:.2} on {} (ttl {}s)",
            self.id, self.source, self.magnitude, self.corridor, self.ttl_seconds
        )
    }
}

// ---------------------------------------------------------------------------
// Corridor state
// ---------------------------------------------------------------------------

/// Derived fee / risk state for one corridor. Only the store produces these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorState {
    pub pair: CurrencyPair,
    pub base_fee_bps: u32,
    /// Dynamic adjustment, 0 ≤ x ≤ min(corridor cap, global cap).
    pub suggested_adj_bps: u32,
    /// `base_fee_bps + suggested_adj_bps`.
    pub total_fee_bps: u32,
    /// Share of the corridor's adjustment headroom in use, 0.0–1.0.
    pub risk_score: f64,
    pub active_signals: Vec<Arc<Signal>>,
    pub in_sensitive_window: bool,
    pub last_computed_at: DateTime<Utc>,
}

impl CorridorState {
    /// The state of a corridor with no live signals.
    pub fn baseline(pair: CurrencyPair, base_fee_bps: u32, at: DateTime<Utc>) -> Self {
        Self {
            pair,
            base_fee_bps,
            suggested_adj_bps: 0,
            total_fee_bps: base_fee_bps,
            risk_score: 0.0,
            active_signals: Vec::new(),
            in_sensitive_window: false,
            last_computed_at: at,
        }
    }

    /// Field-wise equality ignoring `last_computed_at`.
    pub fn same_values(&self, other: &CorridorState) -> bool {
        self.pair == other.pair
            && self.base_fee_bps == other.base_fee_bps
            && self.suggested_adj_bps == other.suggested_adj_bps
            && self.total_fee_bps == other.total_fee_bps
            && self.risk_score == other.risk_score
            && self.in_sensitive_window == other.in_sensitive_window
            && self.active_signals.len() == other.active_signals.len()
            && self
                .active_signals
                .iter()
                .zip(&other.active_signals)
                .all(|(a, b)| a.id == b.id)
    }
}

impl fmt::Display for CorridorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} + {} = {} bps (risk: {:.0}% | signals: {}{})",
            self.pair,
            self.base_fee_bps,
            self.suggested_adj_bps,
            self.total_fee_bps,
            self.risk_score * 100.0,
            self.active_signals.len(),
            if self.in_sensitive_window { " | SENSITIVE" } else { "" },
        )
    }
}

/// Immutable snapshot of every corridor, ordered by pair.
pub type CorridorSnapshot = Arc<[CorridorState]>;

/// Fee computed for an amount on a corridor at its current total rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub pair: CurrencyPair,
    pub base_fee_bps: u32,
    pub dyn_adj_bps: u32,
    pub total_fee_bps: u32,
    /// Fee in minor units of the amount, rounded up.
    pub fee_minor: u64,
    pub computed_at: DateTime<Utc>,
}

/// Notifications published by the corridor store.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorridorEvent {
    Started { at: DateTime<Utc> },
    Stopped { at: DateTime<Utc> },
    SignalIngested { at: DateTime<Utc>, signal: Arc<Signal> },
    SignalsCleared { at: DateTime<Utc>, removed: usize },
    StatesUpdated { at: DateTime<Utc>, states: CorridorSnapshot },
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Reasons a submitted signal is rejected. Rejection never mutates state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("magnitude {0} outside [0, 2]")]
    MagnitudeOutOfRange(f64),

    #[error("magnitude must be a finite number")]
    NonFiniteMagnitude,

    #[error("ttl_seconds {0} below the 60 second minimum")]
    TtlTooShort(u64),

    #[error("unknown corridor: {0}")]
    UnknownCorridor(String),

    #[error("description longer than {max} characters")]
    DescriptionTooLong { max: usize },
}

/// Domain-specific error types for RAILSCOPE.
#[derive(Debug, thiserror::Error)]
pub enum RailscopeError {
    #[error("invalid signal: {0}")]
    Validation(#[from] ValidationError),

    #[error("unknown corridor: {0}")]
    UnknownCorridor(String),

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("aggregation failed: {0}")]
    Aggregation(String),

    #[error("rail source error ({source_name}): {message}")]
    RailSource { source_name: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(ttl_seconds: u64) -> Signal {
        Signal {
            id: SignalId::new(),
            source: SignalSource::MarketVol,
            corridor: CorridorTarget::All,
            magnitude: 1.0,
            ttl_seconds,
            created_at: "2024-06-02T00:00:00Z".parse().unwrap(),
            description: None,
        }
    }

    #[test]
    fn test_pair_parse_and_display() {
        let pair: CurrencyPair = "usd/inr".parse().unwrap();
        assert_eq!(pair.to_string(), "USD/INR");
        assert_eq!(pair.base(), "USD");
        assert_eq!(pair.quote(), "INR");

        let dashed: CurrencyPair = "GBP-INR".parse().unwrap();
        assert_eq!(dashed.to_string(), "GBP/INR");
    }

    #[test]
    fn test_pair_rejects_garbage() {
        assert!("USDINR".parse::<CurrencyPair>().is_err());
        assert!("US/INR".parse::<CurrencyPair>().is_err());
        assert!("USD/USD".parse::<CurrencyPair>().is_err());
    }

    #[test]
    fn test_corridor_target_all() {
        let all: CorridorTarget = "ALL".parse().unwrap();
        assert_eq!(all, CorridorTarget::All);
        let pair: CurrencyPair = "USD/PKR".parse().unwrap();
        assert!(all.covers(&pair));

        let only_inr: CorridorTarget = "USD/INR".parse().unwrap();
        assert!(!only_inr.covers(&pair));
    }

    #[test]
    fn test_source_serde_names() {
        let json = serde_json::to_string(&SignalSource::RbiIntervention).unwrap();
        assert_eq!(json, "\"RBI_INTERVENTION\"");
        let back: SignalSource = serde_json::from_str("\"IMF_PAKISTAN_PROGRAM\"").unwrap();
        assert_eq!(back, SignalSource::ImfPakistanProgram);
        assert_eq!("spread-widening".parse::<SignalSource>().unwrap(), SignalSource::SpreadWidening);
    }

    #[test]
    fn test_signal_input_defaults() {
        let input: SignalInput = serde_json::from_str(
            r#"{"source":"MANUAL","magnitude":0.5,"ttl_seconds":600}"#,
        )
        .unwrap();
        assert!(input.corridor.is_none());
        assert!(input.description.is_none());
    }

    #[test]
    fn test_signal_expires_at() {
        let s = signal(3600);
        assert_eq!(s.expires_at() - s.created_at, chrono::Duration::hours(1));
    }

    #[test]
    fn test_same_values_ignores_timestamp() {
        let pair: CurrencyPair = "USD/INR".parse().unwrap();
        let a = CorridorState::baseline(pair.clone(), 70, Utc::now());
        let mut b = a.clone();
        b.last_computed_at = a.last_computed_at + chrono::Duration::seconds(10);
        assert!(a.same_values(&b));

        b.suggested_adj_bps = 3;
        assert!(!a.same_values(&b));
    }

    #[test]
    fn test_rail_status_default_is_live() {
        let c: RailCandidate = serde_json::from_str(
            r#"{"name":"x","fee_pct":0.01,"eta_minutes":5,"quoted_exchange_rate":1.0,
                "oracle_exchange_rate":1.0,"liquidity_score":0.5,"volatility_score":0.1}"#,
        )
        .unwrap();
        assert_eq!(c.status, RailStatus::Live);
    }

    #[test]
    fn test_error_display() {
        let err: RailscopeError = ValidationError::TtlTooShort(30).into();
        assert_eq!(err.to_string(), "invalid signal: ttl_seconds 30 below the 60 second minimum");
    }
}

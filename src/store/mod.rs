//! Corridor state store.
//!
//! The single writer for signals and corridor states. Every mutation (ingest,
//! tick, clear, seed) takes the writer lock, builds the complete next state
//! set off to the side and commits it in one step, so readers only ever see
//! whole snapshots. Snapshots are published through a `watch` channel and
//! notifications through a `broadcast` channel; neither can block the writer.

pub mod scheduler;

use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{AppConfig, CorridorConfig};
use crate::signals::{CorridorAggregator, SignalIngestor};
use crate::types::{
    CorridorEvent, CorridorSnapshot, CorridorState, CurrencyPair, FeeQuote, RailscopeError,
    Signal, SignalId, SignalInput, SignalSource,
};

/// Basis points per unit.
const BPS_PER_UNIT: Decimal = dec!(10000);

/// Demonstration signals: source, corridor, magnitude, ttl, age, description.
const PRESET_SIGNALS: &[(SignalSource, &str, f64, u64, i64, &str)] = &[
    (
        SignalSource::RbiIntervention,
        "USD/INR",
        0.8,
        7_200,
        5,
        "Pre-market dollar sales chatter",
    ),
    (
        SignalSource::ImfPakistanProgram,
        "USD/PKR",
        0.6,
        10_800,
        60,
        "Staff-level agreement headlines",
    ),
    (
        SignalSource::UpiUkPolicy,
        "GBP/INR",
        0.4,
        7_200,
        15,
        "UPI acceptance expansion commentary",
    ),
];

pub struct CorridorStore {
    /// Sorted by pair; snapshot order follows it.
    corridors: Vec<CorridorConfig>,
    aggregator: CorridorAggregator,
    ingestor: SignalIngestor,
    clock: Arc<dyn Clock>,
    signals: Mutex<Vec<Arc<Signal>>>,
    states_tx: watch::Sender<CorridorSnapshot>,
    events_tx: broadcast::Sender<CorridorEvent>,
}

impl CorridorStore {
    /// Build a store with every corridor at its baseline.
    pub fn new(
        mut corridors: Vec<CorridorConfig>,
        aggregator: CorridorAggregator,
        clock: Arc<dyn Clock>,
        event_buffer: usize,
    ) -> Result<Self, RailscopeError> {
        corridors.sort_by(|a, b| a.pair.cmp(&b.pair));
        let mut seen = HashSet::new();
        for corridor in &corridors {
            if !seen.insert(&corridor.pair) {
                return Err(RailscopeError::Config(format!(
                    "duplicate corridor: {}",
                    corridor.pair
                )));
            }
        }

        let now = clock.now();
        let baseline: CorridorSnapshot = corridors
            .iter()
            .map(|c| CorridorState::baseline(c.pair.clone(), c.base_fee_bps, now))
            .collect();
        let (states_tx, _) = watch::channel(baseline);
        let (events_tx, _) = broadcast::channel(event_buffer.max(1));
        let pairs = corridors.iter().map(|c| c.pair.clone()).collect();

        Ok(Self {
            ingestor: SignalIngestor::new(pairs, Arc::clone(&clock)),
            corridors,
            aggregator,
            clock,
            signals: Mutex::new(Vec::new()),
            states_tx,
            events_tx,
        })
    }

    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, RailscopeError> {
        Self::new(
            config.corridors.clone(),
            config.aggregator(),
            clock,
            config.service.event_buffer,
        )
    }

    pub fn corridors(&self) -> &[CorridorConfig] {
        &self.corridors
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Validate, stamp and apply one signal. A rejected signal leaves every
    /// corridor state untouched.
    pub async fn ingest_signal(&self, input: SignalInput) -> Result<SignalId, RailscopeError> {
        let signal = Arc::new(self.ingestor.accept(input)?);

        let mut signals = self.signals.lock().await;
        let mut next = signals.clone();
        next.push(Arc::clone(&signal));
        self.commit(&mut signals, next)?;

        info!(
            id = %signal.id,
            source = %signal.source,
            corridor = %signal.corridor,
            magnitude = format!("{:.2}", signal.magnitude),
            ttl_secs = signal.ttl_seconds,
            "Signal ingested"
        );
        self.emit(CorridorEvent::SignalIngested {
            at: signal.created_at,
            signal: Arc::clone(&signal),
        });
        Ok(signal.id)
    }

    /// Drop expired signals and recompute every corridor. Returns whether any
    /// corridor changed. On error nothing is committed.
    pub async fn tick(&self) -> Result<bool, RailscopeError> {
        let mut signals = self.signals.lock().await;
        let next = signals.clone();
        self.commit(&mut signals, next)
    }

    /// Remove every signal; all corridors return to baseline. Returns how many
    /// signals were removed.
    pub async fn clear_all_signals(&self) -> Result<usize, RailscopeError> {
        let mut signals = self.signals.lock().await;
        let removed = signals.len();
        self.commit(&mut signals, Vec::new())?;

        info!(removed, "All signals cleared");
        self.emit(CorridorEvent::SignalsCleared {
            at: self.clock.now(),
            removed,
        });
        Ok(removed)
    }

    /// Add the fixed demonstration set, back-dated by each preset's age.
    /// Presets for corridors this store does not track are skipped.
    pub async fn seed_preset_signals(&self) -> Result<Vec<SignalId>, RailscopeError> {
        let mut seeded = Vec::new();
        for (source, corridor, magnitude, ttl_seconds, age_minutes, description) in PRESET_SIGNALS {
            let known = corridor
                .parse::<CurrencyPair>()
                .map(|pair| self.corridors.iter().any(|c| c.pair == pair))
                .unwrap_or(false);
            if !known {
                debug!(corridor, "Skipping preset for untracked corridor");
                continue;
            }
            let input = SignalInput {
                source: *source,
                corridor: Some(corridor.to_string()),
                magnitude: *magnitude,
                ttl_seconds: *ttl_seconds,
                description: Some(description.to_string()),
            };
            let signal = self
                .ingestor
                .accept_aged(input, Duration::minutes(*age_minutes))?;
            seeded.push(Arc::new(signal));
        }

        let mut signals = self.signals.lock().await;
        let mut next = signals.clone();
        next.extend(seeded.iter().cloned());
        self.commit(&mut signals, next)?;

        info!(count = seeded.len(), "Preset signals seeded");
        for signal in &seeded {
            self.emit(CorridorEvent::SignalIngested {
                at: self.clock.now(),
                signal: Arc::clone(signal),
            });
        }
        Ok(seeded.iter().map(|s| s.id).collect())
    }

    /// Prune, aggregate and publish `next` as the new signal set. The caller
    /// holds the writer lock. Returns whether any corridor changed.
    fn commit(
        &self,
        signals: &mut Vec<Arc<Signal>>,
        mut next: Vec<Arc<Signal>>,
    ) -> Result<bool, RailscopeError> {
        let now = self.clock.now();
        let expired = self.aggregator.retain_live(&mut next, now);
        let states = self.aggregator.aggregate_all(&self.corridors, &next, now)?;
        *signals = next;

        let snapshot: CorridorSnapshot = states.into();
        let changed = self.states_tx.send_if_modified(|current| {
            let changed = current.len() != snapshot.len()
                || current.iter().zip(snapshot.iter()).any(|(a, b)| !a.same_values(b));
            *current = Arc::clone(&snapshot);
            changed
        });

        debug!(
            live = signals.len(),
            expired,
            changed,
            "Corridor states recomputed"
        );
        if changed {
            self.emit(CorridorEvent::StatesUpdated { at: now, states: snapshot });
        }
        Ok(changed)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The latest committed snapshot, ordered by pair. Never waits on the writer.
    pub fn get_states(&self) -> CorridorSnapshot {
        self.states_tx.borrow().clone()
    }

    pub fn get_state(&self, pair: &CurrencyPair) -> Option<CorridorState> {
        self.states_tx
            .borrow()
            .iter()
            .find(|s| &s.pair == pair)
            .cloned()
    }

    /// Fee for `amount_minor` at the corridor's current total rate, rounded up.
    /// `override_base_bps` replaces the configured base fee.
    pub fn compute_pricing(
        &self,
        pair: &CurrencyPair,
        amount_minor: u64,
        override_base_bps: Option<u32>,
    ) -> Result<FeeQuote, RailscopeError> {
        let state = self
            .get_state(pair)
            .ok_or_else(|| RailscopeError::UnknownCorridor(pair.to_string()))?;

        let base_fee_bps = override_base_bps.unwrap_or(state.base_fee_bps);
        let total_fee_bps = base_fee_bps.saturating_add(state.suggested_adj_bps);
        let fee = (Decimal::from(amount_minor) * Decimal::from(total_fee_bps) / BPS_PER_UNIT).ceil();
        let fee_minor = fee.to_u64().ok_or_else(|| {
            RailscopeError::InvalidRequest(format!("fee {fee} does not fit in minor units"))
        })?;

        Ok(FeeQuote {
            pair: state.pair,
            base_fee_bps,
            dyn_adj_bps: state.suggested_adj_bps,
            total_fee_bps,
            fee_minor,
            computed_at: self.clock.now(),
        })
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<CorridorEvent> {
        self.events_tx.subscribe()
    }

    /// Receiver that wakes only when a corridor's values change.
    pub fn watch_states(&self) -> watch::Receiver<CorridorSnapshot> {
        self.states_tx.subscribe()
    }

    /// Call `callback` with every changed snapshot from a dispatcher task.
    /// Must be called inside a tokio runtime.
    pub fn subscribe_fn<F>(&self, callback: F) -> Subscription
    where
        F: Fn(CorridorSnapshot) + Send + 'static,
    {
        let mut rx = self.events_tx.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(CorridorEvent::StatesUpdated { states, .. }) => callback(states),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Subscriber lagging, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { task }
    }

    pub(crate) fn emit(&self, event: CorridorEvent) {
        // No receivers is fine.
        let _ = self.events_tx.send(event);
    }
}

/// Handle for a callback subscription. Delivery stops on `unsubscribe` or drop.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

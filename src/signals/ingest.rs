//! Signal validation and stamping.
//!
//! A [`SignalInput`] becomes a [`Signal`] only after every check passes; the
//! id and `created_at` are assigned here, never taken from the caller.

use chrono::Duration;
use std::sync::Arc;
use tracing::warn;

use crate::clock::Clock;
use crate::types::{
    CorridorTarget, CurrencyPair, Signal, SignalId, SignalInput, ValidationError,
};

pub const MIN_MAGNITUDE: f64 = 0.0;
pub const MAX_MAGNITUDE: f64 = 2.0;
pub const MIN_TTL_SECS: u64 = 60;
pub const MAX_DESCRIPTION_LEN: usize = 280;

#[derive(Debug, Clone)]
pub struct SignalIngestor {
    known_pairs: Vec<CurrencyPair>,
    clock: Arc<dyn Clock>,
}

impl SignalIngestor {
    pub fn new(known_pairs: Vec<CurrencyPair>, clock: Arc<dyn Clock>) -> Self {
        Self { known_pairs, clock }
    }

    /// Check an input without stamping it. Returns the resolved corridor.
    pub fn validate(&self, input: &SignalInput) -> Result<CorridorTarget, ValidationError> {
        if !input.magnitude.is_finite() {
            return Err(ValidationError::NonFiniteMagnitude);
        }
        if !(MIN_MAGNITUDE..=MAX_MAGNITUDE).contains(&input.magnitude) {
            return Err(ValidationError::MagnitudeOutOfRange(input.magnitude));
        }
        if input.ttl_seconds < MIN_TTL_SECS {
            return Err(ValidationError::TtlTooShort(input.ttl_seconds));
        }
        if let Some(desc) = &input.description {
            if desc.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::DescriptionTooLong {
                    max: MAX_DESCRIPTION_LEN,
                });
            }
        }
        self.resolve_corridor(input.corridor.as_deref())
    }

    /// Validate and stamp an input with a fresh id and the current time.
    pub fn accept(&self, input: SignalInput) -> Result<Signal, ValidationError> {
        self.accept_aged(input, Duration::zero())
    }

    /// Like [`accept`](Self::accept), but dated `age` before now. Only the
    /// store's preset seeding uses this.
    pub(crate) fn accept_aged(
        &self,
        input: SignalInput,
        age: Duration,
    ) -> Result<Signal, ValidationError> {
        let corridor = self.validate(&input).map_err(|e| {
            warn!(source = %input.source, error = %e, "Signal rejected");
            e
        })?;

        let age = age.max(Duration::zero());
        Ok(Signal {
            id: SignalId::new(),
            source: input.source,
            corridor,
            magnitude: input.magnitude,
            ttl_seconds: input.ttl_seconds,
            created_at: self.clock.now() - age,
            description: input.description,
        })
    }

    fn resolve_corridor(&self, raw: Option<&str>) -> Result<CorridorTarget, ValidationError> {
        let Some(raw) = raw else {
            return Ok(CorridorTarget::All);
        };
        match raw.parse::<CorridorTarget>() {
            Ok(CorridorTarget::All) => Ok(CorridorTarget::All),
            Ok(CorridorTarget::Pair(pair)) if self.known_pairs.contains(&pair) => {
                Ok(CorridorTarget::Pair(pair))
            }
            _ => Err(ValidationError::UnknownCorridor(raw.to_string())),
        }
    }
}

//! Corridor signal pipeline.
//!
//! - `ingest`: validation and stamping of incoming signals
//! - `decay`: time-decayed bps contribution per signal
//! - `window`: local-time sensitive watch windows
//! - `aggregator`: per-corridor capped adjustment and risk score

pub mod aggregator;
pub mod decay;
pub mod ingest;
pub mod window;

pub use aggregator::{AggregatorSettings, CorridorAggregator};
pub use decay::{DecayCurve, DecayModel, SourceWeights};
pub use ingest::SignalIngestor;
pub use window::{SensitiveWindow, WindowEffect};

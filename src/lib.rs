//! RAILSCOPE: Rail scoring and corridor fee watch
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod rails;
pub mod signals;
pub mod store;
pub mod strategy;
pub mod types;

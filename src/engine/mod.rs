//! Rail scoring engine: candidates → composite score → ranked routes.
//!
//! - `scorer`: pure scoring and ranking, safe to call from any number of tasks
//! - `quoter`: gathers candidates from rail sources and ranks them per request

pub mod quoter;
pub mod scorer;

pub use quoter::{Quote, QuoteEngine, QuoteRequest};
pub use scorer::{rank, rank_with_amount, score};

//! Integration tests for RAILSCOPE.
//!
//! Everything here goes through the public library API only.

mod mock_rails;
mod quoting;
mod scenarios;

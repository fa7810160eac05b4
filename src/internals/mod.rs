//! Internal utilities for telesales-insights
//!
//! Re-exported through `lib.rs` as `retry` and `tokens`.

pub mod retry;
pub mod tokens;

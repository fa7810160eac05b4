//! Logging helpers for telesales-insights
//!
//! Every module logs through these `log_*` names so the call sites stay
//! uniform; they are plain re-exports of the `tracing` macros.

pub use tracing::{
    debug as log_debug,
    error as log_error,
    info as log_info,
    trace as log_trace,
    warn as log_warn,
};

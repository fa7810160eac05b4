//! # telesales-insights
//!
//! Telesales analytics assistant: loads the call, order, lead and campaign
//! datasets, derives compact call statistics, and answers questions through
//! a hosted text-generation model grounded on those statistics plus fixed
//! KPI figures.
//!
//! ## Flow of one turn
//!
//! user input → [`ConversationSession`] → [`ContextBuilder`] + transcript →
//! [`ModelGateway`] → reply (or error text) appended to the session.
//!
//! ## Example
//!
//! ```rust,no_run
//! use telesales_insights::{AppConfig, Assistant, ConversationSession, ModelGateway, shared_datasets};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::from_env()?;
//! let datasets = shared_datasets(&config.datasets);
//! let gateway = ModelGateway::from_config(config.gateway.clone())?;
//! let assistant = Assistant::from_datasets(gateway, &config, &datasets);
//!
//! let mut session = ConversationSession::new();
//! let reply = assistant.ask(&mut session, "What is total GMV?").await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

pub mod core_types;

// Logging utilities (re-exports tracing with log_* naming) - internal only
pub(crate) mod logging;

pub(crate) mod internals;

pub mod assistant;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod gateway;
pub mod report;
pub mod session;

pub use internals::{retry, tokens};

#[cfg(test)]
pub mod tests;

pub use assistant::{Assistant, ComposedRequest};
pub use config::{AppConfig, ContextConfig, DatasetConfig, GatewayConfig};
pub use context::{ContextBuilder, KpiSnapshot};
pub use core_types::{Message, MessageRole, ModelBackend, ModelInfo};
pub use data::{
    aggregate_calls, count_by, shared_datasets, AggregateRow, AttemptBreakdown, CallAggregates,
    CallSchema, DatasetLoader, DatasetState, Table, TableShape,
};
pub use error::{InsightsError, InsightsResult};
pub use gateway::{GatewayReply, GeminiBackend, ModelGateway};
pub use session::{ConversationSession, SessionRegistry, SessionState};

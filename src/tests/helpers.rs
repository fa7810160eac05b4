//! Test fixtures shared by the unit test modules.

#![allow(dead_code)]

use crate::config::GatewayConfig;
use crate::core_types::{GenerationResponse, ModelInfo};
use crate::data::Table;
use crate::retry::RetryPolicy;
use std::time::Duration;

/// Calls table with the given agent/campaign/attempt triples
pub fn calls_table(rows: &[(&str, &str, &str)]) -> Table {
    Table::new(
        "calls",
        vec![
            "call_id".to_string(),
            "agent_id".to_string(),
            "campaign_id".to_string(),
            "attempt_number".to_string(),
        ],
        rows.iter()
            .enumerate()
            .map(|(i, (agent, campaign, attempt))| {
                vec![
                    format!("C{i}"),
                    agent.to_string(),
                    campaign.to_string(),
                    attempt.to_string(),
                ]
            })
            .collect(),
    )
}

/// Calls table without an attempt column
pub fn calls_table_without_attempts(rows: &[(&str, &str)]) -> Table {
    Table::new(
        "calls",
        vec!["agent_id".to_string(), "campaign_id".to_string()],
        rows.iter()
            .map(|(agent, campaign)| vec![agent.to_string(), campaign.to_string()])
            .collect(),
    )
}

pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        total_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_millis(100),
    }
}

/// Gateway settings with a key and a fast retry policy
pub fn gateway_config(api_key: Option<&str>) -> GatewayConfig {
    GatewayConfig {
        api_key: api_key.map(str::to_string),
        retry_policy: fast_retry_policy(),
        ..GatewayConfig::default()
    }
}

pub fn listed_models(names: &[&str]) -> Vec<ModelInfo> {
    names.iter().map(|n| ModelInfo::named(format!("models/{n}"))).collect()
}

pub fn generation(content: &str, model: &str) -> GenerationResponse {
    GenerationResponse {
        content: content.to_string(),
        model: model.to_string(),
        usage: None,
    }
}

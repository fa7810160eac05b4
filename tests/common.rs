//! Test helper utilities for telesales-insights integration tests
//!
//! Reusable fixtures shared by the integration test binaries.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Allow dead code in test utilities - functions are used across different test files
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;
use telesales_insights::retry::RetryPolicy;
use telesales_insights::{AppConfig, GatewayConfig};
use wiremock::ResponseTemplate;

pub const TEST_KEY: &str = "test-key";

/// Create fast retry policy for tests that exercise retries
pub fn create_fast_test_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        total_timeout: Duration::from_secs(10),
        request_timeout: Duration::from_secs(5),
    }
}

/// Gateway settings pointing at a mock server
pub fn create_gateway_config(base_url: &str, api_key: Option<&str>) -> GatewayConfig {
    GatewayConfig {
        api_key: api_key.map(str::to_string),
        base_url: base_url.to_string(),
        retry_policy: create_fast_test_retry_policy(),
        ..GatewayConfig::default()
    }
}

/// Full configuration reading datasets from `data_dir` and talking to `base_url`
pub fn create_app_config(data_dir: &Path, base_url: &str, api_key: Option<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.datasets.data_dir = data_dir.to_path_buf();
    config.gateway = create_gateway_config(base_url, api_key);
    config
}

/// Write the four CSV datasets. Agent A has two calls, agent B one.
pub fn write_datasets(dir: &Path, with_attempts: bool) {
    let calls = if with_attempts {
        "call_id,agent_id,campaign_id,attempt_number\n1,A,X,1\n2,B,X,2\n3,A,Y,1\n"
    } else {
        "call_id,agent_id,campaign_id\n1,A,X\n2,B,X\n3,A,Y\n"
    };
    fs::write(dir.join("calls.csv"), calls).expect("write calls");
    fs::write(dir.join("orders.csv"), "order_id,gmv\n1,120.5\n2,88\n").expect("write orders");
    fs::write(dir.join("leads.csv"), "lead_id,source\n1,web\n").expect("write leads");
    fs::write(dir.join("campaigns.csv"), "campaign_id,name\nX,Spring\nY,Summer\n")
        .expect("write campaigns");
}

pub fn models_listing(names: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "models": names.iter().map(|n| serde_json::json!({
            "name": format!("models/{n}"),
            "displayName": n,
            "supportedGenerationMethods": ["generateContent", "countTokens"]
        })).collect::<Vec<_>>()
    })
}

pub fn generation_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 850, "candidatesTokenCount": 20, "totalTokenCount": 870}
    })
}

pub fn success_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(generation_body(text))
}

pub fn error_response(status: u16, message: &str, reason: Option<&str>) -> ResponseTemplate {
    let details = reason
        .map(|r| vec![serde_json::json!({"reason": r})])
        .unwrap_or_default();
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "error": {"code": status, "message": message, "status": "ERROR", "details": details}
    }))
}

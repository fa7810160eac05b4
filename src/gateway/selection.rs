//! Model selection rule.
//!
//! Candidates are taken in the order the service lists them. Only models
//! that can generate content are eligible. Among those:
//! 1. an explicitly configured model, if listed;
//! 2. otherwise the first whose name contains the preference substring
//!    (case-insensitive);
//! 3. otherwise the first eligible model.

use crate::core_types::ModelInfo;
use crate::error::{InsightsError, InsightsResult};
use crate::logging::{log_debug, log_warn};

/// Pick a model name (without the `models/` prefix) from `models`.
///
/// # Errors
///
/// Returns [`InsightsError::NoModelAvailable`] when no listed model supports
/// content generation.
pub fn select_model(
    models: &[ModelInfo],
    explicit: Option<&str>,
    preference: &str,
) -> InsightsResult<String> {
    let eligible: Vec<&ModelInfo> = models.iter().filter(|m| m.supports_generation()).collect();

    if eligible.is_empty() {
        return Err(InsightsError::no_model_available(if models.is_empty() {
            "the service listed no models".to_string()
        } else {
            format!(
                "none of the {} listed models supports generateContent",
                models.len()
            )
        }));
    }

    if let Some(wanted) = explicit {
        let wanted = wanted.strip_prefix("models/").unwrap_or(wanted);
        if let Some(model) = eligible.iter().find(|m| m.short_name() == wanted) {
            log_debug!(model = %model.short_name(), rule = "explicit", "Model selected");
            return Ok(model.short_name().to_string());
        }
        log_warn!(
            model = %wanted,
            "Configured model not offered by the service, falling back to preference"
        );
    }

    let needle = preference.trim().to_lowercase();
    if !needle.is_empty() {
        if let Some(model) = eligible
            .iter()
            .find(|m| m.short_name().to_lowercase().contains(&needle))
        {
            log_debug!(model = %model.short_name(), rule = "preference", "Model selected");
            return Ok(model.short_name().to_string());
        }
    }

    let first = eligible[0].short_name().to_string();
    log_debug!(model = %first, rule = "first_available", "Model selected");
    Ok(first)
}

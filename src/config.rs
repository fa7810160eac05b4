use crate::data::schema::CallSchema;
use crate::error::{InsightsError, InsightsResult};
use crate::logging::log_debug;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable holding the generation API key
pub const CREDENTIAL_ENV: &str = "GEMINI_API_KEY";

const ENV_KEYS: &[(&str, &str)] = &[
    ("TELESALES_DATA_DIR", "data_dir"),
    (CREDENTIAL_ENV, "api_key"),
    ("GEMINI_BASE_URL", "base_url"),
    ("GEMINI_MODEL", "model"),
    ("GEMINI_MODEL_PREFERENCE", "model_preference"),
    ("GEMINI_DISCOVER_MODELS", "discover_models"),
    ("GEMINI_MAX_CONTEXT_TOKENS", "max_context_tokens"),
    ("TELESALES_CONTEXT_ROWS", "context_rows"),
];

/// Where the four datasets live and how the call table is laid out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
    pub calls_file: String,
    pub orders_file: String,
    pub leads_file: String,
    pub campaigns_file: String,
    pub call_schema: CallSchema,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            calls_file: "calls.csv".to_string(),
            orders_file: "orders.csv".to_string(),
            leads_file: "leads.csv".to_string(),
            campaigns_file: "campaigns.csv".to_string(),
            call_schema: CallSchema::default(),
        }
    }
}

impl DatasetConfig {
    pub fn calls_path(&self) -> PathBuf {
        self.data_dir.join(&self.calls_file)
    }

    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join(&self.orders_file)
    }

    pub fn leads_path(&self) -> PathBuf {
        self.data_dir.join(&self.leads_file)
    }

    pub fn campaigns_path(&self) -> PathBuf {
        self.data_dir.join(&self.campaigns_file)
    }
}

/// Generation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// API key; `None` or blank produces the missing-credential reply
    pub api_key: Option<String>,
    pub base_url: String,
    /// Explicit model; wins over the preference rule when the service lists it
    pub model: Option<String>,
    /// Substring preferred when picking among listed models
    pub model_preference: String,
    /// Enumerate models before generating. When off, `model` (or the
    /// fallback) is used without asking the service.
    pub discover_models: bool,
    /// Model used when discovery is off and no explicit model is set
    pub fallback_model: String,
    /// Budget for instruction plus transcript, in estimated tokens
    pub max_context_tokens: u32,
    pub retry_policy: RetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: None,
            model_preference: "flash".to_string(),
            discover_models: true,
            fallback_model: "gemini-1.5-flash".to_string(),
            max_context_tokens: 128_000,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl GatewayConfig {
    /// The configured key after normalization, or `None` when blank
    pub fn credential(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(normalize_credential)
            .filter(|k| !k.is_empty())
    }
}

/// Grounding context settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Rows kept per aggregate table; the rest is summarized as a count
    pub max_rows_per_table: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_rows_per_table: 15,
        }
    }
}

/// Complete assistant configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub datasets: DatasetConfig,
    pub gateway: GatewayConfig,
    pub context: ContextConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// This is the only place the crate reads the environment.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::ConfigurationError`] if a numeric or boolean
    /// variable cannot be parsed, or validation fails. A missing API key is
    /// not an error here; the gateway reports it per turn.
    pub fn from_env() -> InsightsResult<Self> {
        let section: HashMap<String, String> = ENV_KEYS
            .iter()
            .filter_map(|(var, key)| std::env::var(var).ok().map(|v| (key.to_string(), v)))
            .collect();

        log_debug!(
            keys = ?section.keys().collect::<Vec<_>>(),
            "Loading configuration from environment"
        );

        Self::from_sections(&section)
    }

    /// Build configuration from a parsed `key = value` section.
    ///
    /// Unknown keys are ignored; absent keys keep their defaults.
    pub fn from_sections(section: &HashMap<String, String>) -> InsightsResult<Self> {
        let mut config = Self::default();

        if let Some(dir) = section.get("data_dir") {
            config.datasets.data_dir = PathBuf::from(dir);
        }
        Self::apply_string(section, "calls_file", &mut config.datasets.calls_file);
        Self::apply_string(section, "orders_file", &mut config.datasets.orders_file);
        Self::apply_string(section, "leads_file", &mut config.datasets.leads_file);
        Self::apply_string(section, "campaigns_file", &mut config.datasets.campaigns_file);

        let schema = &mut config.datasets.call_schema;
        Self::apply_string(section, "agent_column", &mut schema.agent_column);
        Self::apply_string(section, "campaign_column", &mut schema.campaign_column);
        Self::apply_string(section, "attempt_column", &mut schema.attempt_column);

        let gateway = &mut config.gateway;
        gateway.api_key = section.get("api_key").cloned();
        gateway.model = section
            .get("model")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        Self::apply_string(section, "base_url", &mut gateway.base_url);
        Self::apply_string(section, "model_preference", &mut gateway.model_preference);
        Self::apply_string(section, "fallback_model", &mut gateway.fallback_model);
        if let Some(discover) = Self::parse_param::<bool>(section, "discover_models")? {
            gateway.discover_models = discover;
        }
        if let Some(max_tokens) = Self::parse_param::<u32>(section, "max_context_tokens")? {
            gateway.max_context_tokens = max_tokens;
        }

        if let Some(rows) = Self::parse_param::<usize>(section, "context_rows")? {
            config.context.max_rows_per_table = rows;
        }

        config.validate()?;

        log_debug!(
            data_dir = %config.datasets.data_dir.display(),
            base_url = %config.gateway.base_url,
            has_api_key = config.gateway.credential().is_some(),
            model_preference = %config.gateway.model_preference,
            "Configuration loaded and validated"
        );

        Ok(config)
    }

    /// Validate the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::ConfigurationError`] if a file or column name
    /// is blank, the base URL is not http(s), or a limit is zero.
    pub fn validate(&self) -> InsightsResult<()> {
        let names = [
            ("calls_file", &self.datasets.calls_file),
            ("orders_file", &self.datasets.orders_file),
            ("leads_file", &self.datasets.leads_file),
            ("campaigns_file", &self.datasets.campaigns_file),
            ("agent_column", &self.datasets.call_schema.agent_column),
            ("campaign_column", &self.datasets.call_schema.campaign_column),
            ("attempt_column", &self.datasets.call_schema.attempt_column),
        ];
        if let Some((key, _)) = names.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(InsightsError::configuration_error(format!(
                "'{key}' must not be empty"
            )));
        }

        let base_url = &self.gateway.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(InsightsError::configuration_error(format!(
                "base_url must be an http(s) URL, got '{base_url}'"
            )));
        }
        if self.gateway.max_context_tokens == 0 {
            return Err(InsightsError::configuration_error(
                "max_context_tokens must be greater than zero",
            ));
        }
        if self.context.max_rows_per_table == 0 {
            return Err(InsightsError::configuration_error(
                "context_rows must be greater than zero",
            ));
        }
        Ok(())
    }

    fn apply_string(section: &HashMap<String, String>, key: &str, target: &mut String) {
        if let Some(value) = section.get(key) {
            *target = value.trim().to_string();
        }
    }

    fn parse_param<T: std::str::FromStr>(
        section: &HashMap<String, String>,
        key: &str,
    ) -> InsightsResult<Option<T>> {
        section
            .get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|_| {
                    InsightsError::configuration_error(format!("invalid value for '{key}': '{raw}'"))
                })
            })
            .transpose()
    }
}

/// Normalize an API key pasted by a user.
/// - Trims whitespace
/// - Strips surrounding ASCII or typographic quotes
pub fn normalize_credential(raw: &str) -> String {
    fn is_quote_char(c: char) -> bool {
        matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}')
    }

    raw.trim()
        .trim_matches(is_quote_char)
        .trim()
        .to_string()
}

//! Backend trait for the text-generation service
//!
//! The gateway talks to the remote service only through [`ModelBackend`],
//! which keeps model selection and error recovery testable without HTTP.

use crate::error::InsightsResult;
use serde::{Deserialize, Serialize};

/// A model advertised by the service's model listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-1.5-flash`
    pub name: String,
    /// Human-readable name, if the service provides one
    pub display_name: Option<String>,
    /// Methods the model supports, e.g. `generateContent`
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            supported_generation_methods: vec!["generateContent".to_string()],
        }
    }

    /// Name without the `models/` resource prefix
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    /// Whether the model can serve a content-generation call.
    ///
    /// An empty method list is treated as "unknown" and accepted.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods.is_empty()
            || self
                .supported_generation_methods
                .iter()
                .any(|m| m == "generateContent")
    }
}

/// One generation call: system instruction plus the serialized transcript
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
}

/// Token usage reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Text returned by a generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Remote text-generation service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    /// Enumerate the models available to `credential`
    async fn list_models(&self, credential: &str) -> InsightsResult<Vec<ModelInfo>>;

    /// Issue one generation request
    async fn generate(
        &self,
        credential: &str,
        request: GenerationRequest,
    ) -> InsightsResult<GenerationResponse>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

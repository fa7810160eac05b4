//! Model gateway.
//!
//! One call to [`ModelGateway::respond`] per user turn:
//! 1. check the credential,
//! 2. check the payload against the token budget,
//! 3. pick a model (enumerate + [`select_model`], or the configured one),
//! 4. send instruction and transcript in a single generation request.
//!
//! Each failure comes back as its own [`InsightsError`] variant.
//! [`ModelGateway::reply_text`] turns any outcome into the text of the next
//! assistant turn, so a failure never leaves the session unusable.

pub mod gemini;
pub mod selection;

pub use gemini::GeminiBackend;
pub use selection::select_model;

use crate::config::{GatewayConfig, CREDENTIAL_ENV};
use crate::core_types::{GenerationRequest, ModelBackend, TokenUsage};
use crate::error::{InsightsError, InsightsResult};
use crate::logging::{log_debug, log_info, log_warn};
use crate::tokens::{GeminiTokenCounter, TokenCounter};

use std::sync::Arc;

/// Successful generation
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Entry point to the remote generation service
pub struct ModelGateway {
    backend: Arc<dyn ModelBackend>,
    config: GatewayConfig,
    token_counter: Option<Arc<dyn TokenCounter>>,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("backend", &self.backend.backend_name())
            .field("base_url", &self.config.base_url)
            .field("has_credential", &self.config.credential().is_some())
            .field("token_counter", &self.token_counter)
            .finish()
    }
}

impl ModelGateway {
    /// Gateway over any backend. The token budget is enforced when the
    /// tokenizer can be initialized; otherwise it is skipped with a warning.
    pub fn new(backend: Arc<dyn ModelBackend>, config: GatewayConfig) -> Self {
        let token_counter = match GeminiTokenCounter::new(config.max_context_tokens) {
            Ok(counter) => Some(Arc::new(counter) as Arc<dyn TokenCounter>),
            Err(e) => {
                log_warn!(error = %e, "Token budget disabled");
                None
            }
        };

        Self {
            backend,
            config,
            token_counter,
        }
    }

    /// Gateway over the Gemini REST backend described by `config`
    pub fn from_config(config: GatewayConfig) -> InsightsResult<Self> {
        let backend = GeminiBackend::from_config(&config)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Choose the model for this turn.
    ///
    /// With discovery on, the service's listing is consulted every turn;
    /// availability can change while a session is open.
    async fn resolve_model(&self, credential: &str) -> InsightsResult<String> {
        if !self.config.discover_models {
            return Ok(self
                .config
                .model
                .clone()
                .unwrap_or_else(|| self.config.fallback_model.clone()));
        }

        let models = self.backend.list_models(credential).await?;
        select_model(
            &models,
            self.config.model.as_deref(),
            &self.config.model_preference,
        )
    }

    fn check_budget(&self, instruction: &str, transcript: &str) -> InsightsResult<()> {
        let Some(counter) = &self.token_counter else {
            return Ok(());
        };
        counter.validate_token_limit(&format!("{instruction}\n{transcript}"))
    }

    /// Send one turn to the service.
    ///
    /// # Errors
    ///
    /// - [`InsightsError::CredentialMissing`] when no key is configured
    /// - [`InsightsError::AuthenticationFailed`] when the service rejects it
    /// - [`InsightsError::NoModelAvailable`] when selection finds nothing
    /// - [`InsightsError::TokenLimitExceeded`] when the payload is over budget
    /// - remote failures (`RequestFailed`, `RequestRejected`, `Timeout`,
    ///   `RateLimitExceeded`, `ResponseParsingError`)
    pub async fn respond(&self, instruction: &str, transcript: &str) -> InsightsResult<GatewayReply> {
        let credential = self
            .config
            .credential()
            .ok_or_else(|| InsightsError::credential_missing(CREDENTIAL_ENV))?;

        self.check_budget(instruction, transcript)?;
        let model = self.resolve_model(&credential).await?;

        log_debug!(
            backend = self.backend.backend_name(),
            model = %model,
            instruction_chars = instruction.len(),
            transcript_chars = transcript.len(),
            "Sending generation request"
        );

        let response = self
            .backend
            .generate(
                &credential,
                GenerationRequest {
                    model,
                    system_instruction: instruction.to_string(),
                    prompt: transcript.to_string(),
                },
            )
            .await?;

        log_info!(
            model = %response.model,
            reply_chars = response.content.len(),
            total_tokens = response.usage.map(|u| u.total_tokens),
            "Assistant reply received"
        );

        Ok(GatewayReply {
            text: response.content,
            model: response.model,
            usage: response.usage,
        })
    }

    /// Text for the next assistant turn: the reply, or the error's user
    /// message. Never empty.
    pub fn reply_text(result: &InsightsResult<GatewayReply>) -> String {
        match result {
            Ok(reply) => reply.text.clone(),
            Err(e) => e.user_message(),
        }
    }
}

//! Gemini backend
//!
//! Talks to the Generative Language REST API:
//! - `GET  {base}/v1beta/models` to enumerate models (paginated)
//! - `POST {base}/v1beta/models/{model}:generateContent` for one reply
//!
//! The key travels in the `x-goog-api-key` header. Every HTTP call goes
//! through the backend's [`RetryExecutor`].

pub mod types;

use self::types::{
    ErrorEnvelope, GeminiContent, GenerateContentRequest, GenerateContentResponse,
    ListModelsResponse,
};
use crate::config::GatewayConfig;
use crate::core_types::{
    GenerationRequest, GenerationResponse, ModelBackend, ModelInfo, TokenUsage,
};
use crate::error::{InsightsError, InsightsResult};
use crate::logging::{log_debug, log_error};
use crate::retry::{RetryExecutor, RetryPolicy};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Instant;

const API_KEY_HEADER: &str = "x-goog-api-key";
const MODELS_PAGE_SIZE: &str = "100";
const MAX_MODEL_PAGES: usize = 10;

/// Gemini REST client
#[derive(Debug)]
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    retry_executor: RetryExecutor,
}

impl GeminiBackend {
    /// Create a backend for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::ConfigurationError`] if the base URL is empty
    /// or the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, retry_policy: RetryPolicy) -> InsightsResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(InsightsError::configuration_error(
                "Gemini base URL is required",
            ));
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| {
                InsightsError::configuration_error(format!("Failed to build HTTP client: {e}"))
            })?;

        log_debug!(
            backend = "gemini",
            base_url = %base_url,
            max_attempts = retry_policy.max_attempts,
            "Gemini backend initialized"
        );

        Ok(Self {
            client,
            base_url,
            retry_executor: RetryExecutor::new(retry_policy),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> InsightsResult<Self> {
        Self::new(config.base_url.clone(), config.retry_policy.clone())
    }

    pub fn retry_executor(&self) -> &RetryExecutor {
        &self.retry_executor
    }

    fn models_url(&self) -> String {
        format!("{}/v1beta/models", self.base_url)
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_headers(credential: &str) -> InsightsResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(API_KEY_HEADER),
            HeaderValue::from_str(credential).map_err(|_| {
                InsightsError::authentication_failed("API key contains invalid characters")
            })?,
        );
        Ok(headers)
    }

    async fn fetch_models_page(
        &self,
        headers: &HeaderMap,
        page_token: Option<&str>,
    ) -> InsightsResult<ListModelsResponse> {
        let mut request = self
            .client
            .get(self.models_url())
            .headers(headers.clone())
            .query(&[("pageSize", MODELS_PAGE_SIZE)]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            log_error!(error = %e, "Model listing request failed");
            InsightsError::request_failed(format!("Request failed: {e}"), Some(Box::new(e)))
        })?;

        if !response.status().is_success() {
            return Err(handle_error_response(response).await);
        }
        parse_json_body(response).await
    }

    async fn send_generate(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &GenerateContentRequest,
    ) -> InsightsResult<GenerateContentResponse> {
        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                log_error!(url = %url, error = %e, "Generation request failed");
                InsightsError::request_failed(format!("Request failed: {e}"), Some(Box::new(e)))
            })?;

        if !response.status().is_success() {
            return Err(handle_error_response(response).await);
        }
        parse_json_body(response).await
    }
}

#[async_trait::async_trait]
impl ModelBackend for GeminiBackend {
    async fn list_models(&self, credential: &str) -> InsightsResult<Vec<ModelInfo>> {
        let headers = Self::build_headers(credential)?;
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let token = page_token.as_deref();
            let page = self
                .retry_executor
                .execute(|| self.fetch_models_page(&headers, token))
                .await?;

            models.extend(page.models.into_iter().map(|m| ModelInfo {
                name: m.name,
                display_name: m.display_name,
                supported_generation_methods: m.supported_generation_methods,
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        log_debug!(backend = "gemini", model_count = models.len(), "Models listed");
        Ok(models)
    }

    async fn generate(
        &self,
        credential: &str,
        request: GenerationRequest,
    ) -> InsightsResult<GenerationResponse> {
        let headers = Self::build_headers(credential)?;
        let url = self.generate_url(&request.model);
        let body = GenerateContentRequest {
            system_instruction: GeminiContent::text(None, request.system_instruction),
            contents: vec![GeminiContent::text(Some("user"), request.prompt)],
        };

        let start_time = Instant::now();
        let response = self
            .retry_executor
            .execute(|| self.send_generate(&url, &headers, &body))
            .await?;

        log_debug!(
            backend = "gemini",
            model = %request.model,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Generation completed"
        );

        parse_generation(response, request.model)
    }

    fn backend_name(&self) -> &'static str {
        "gemini"
    }
}

/// Extract the reply text from the first candidate
pub(crate) fn parse_generation(
    response: GenerateContentResponse,
    model: String,
) -> InsightsResult<GenerationResponse> {
    let usage = response.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {r}"))
            .unwrap_or_else(|| "response has no candidates".to_string());
        return Err(InsightsError::response_parsing_error(reason));
    };

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(InsightsError::response_parsing_error(format!(
            "candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(GenerationResponse {
        content,
        model,
        usage,
    })
}

async fn parse_json_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> InsightsResult<T> {
    let raw_body = response.text().await.map_err(|e| {
        InsightsError::response_parsing_error(format!("Failed to read response: {e}"))
    })?;

    serde_json::from_str(&raw_body).map_err(|e| {
        log_error!(error = %e, raw_body = %raw_body, "Failed to parse response");
        InsightsError::response_parsing_error(format!("Invalid response: {e}"))
    })
}

/// Map a non-success response onto the error taxonomy
async fn handle_error_response(response: reqwest::Response) -> InsightsError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    log_error!(status = %status, error_text = %error_text, "API error response");

    let body = serde_json::from_str::<ErrorEnvelope>(&error_text)
        .ok()
        .map(|envelope| envelope.error);
    let message = body
        .as_ref()
        .map(|b| b.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| error_text.clone());

    match status.as_u16() {
        401 | 403 => InsightsError::authentication_failed(message),
        400 if body.as_ref().is_some_and(|b| b.has_reason("API_KEY_INVALID")) => {
            InsightsError::authentication_failed(message)
        }
        429 => InsightsError::rate_limit_exceeded(retry_after.unwrap_or(60)),
        _ if status.is_server_error() => {
            InsightsError::request_failed(format!("API error {status}: {message}"), None)
        }
        code => InsightsError::request_rejected(code, message),
    }
}

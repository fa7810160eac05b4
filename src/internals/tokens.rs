//! Token estimation for the generation payload.
//!
//! Gemini's tokenizer is not available offline, so counts are estimated with
//! `cl100k_base` and scaled by a safety factor, the same trade-off used for
//! other providers whose tokenizer is private. The estimate guards the
//! gateway's token budget: the transcript grows for the whole session and
//! is resent in full every turn.
//!
//! ```rust,no_run
//! use telesales_insights::tokens::{GeminiTokenCounter, TokenCounter};
//!
//! let counter = GeminiTokenCounter::new(32_000)?;
//! counter.validate_token_limit("What is total GMV?")?;
//! # Ok::<(), telesales_insights::InsightsError>(())
//! ```

use crate::error::{InsightsError, InsightsResult};
use crate::logging::log_debug;

use tiktoken_rs::{cl100k_base, CoreBPE};

/// Multiplier applied to cl100k counts to over- rather than under-estimate.
const APPROXIMATION_FACTOR: f32 = 1.1;

/// Counts tokens and enforces a context budget.
pub trait TokenCounter: Send + Sync + std::fmt::Debug {
    /// Estimate tokens in `text`.
    fn count_tokens(&self, text: &str) -> InsightsResult<u32>;

    /// Budget this counter enforces.
    fn max_context_tokens(&self) -> u32;

    /// Fail with [`InsightsError::TokenLimitExceeded`] when `text` is over budget.
    fn validate_token_limit(&self, text: &str) -> InsightsResult<()> {
        let token_count = self.count_tokens(text)?;
        if token_count > self.max_context_tokens() {
            return Err(InsightsError::token_limit_exceeded(
                token_count as usize,
                self.max_context_tokens() as usize,
            ));
        }
        Ok(())
    }
}

/// Approximate token counter for Gemini models.
pub struct GeminiTokenCounter {
    tokenizer: CoreBPE,
    max_tokens: u32,
}

impl std::fmt::Debug for GeminiTokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiTokenCounter")
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GeminiTokenCounter {
    pub fn new(max_tokens: u32) -> InsightsResult<Self> {
        let tokenizer = cl100k_base().map_err(|e| {
            InsightsError::configuration_error(format!("Failed to initialize tokenizer: {}", e))
        })?;

        Ok(Self {
            tokenizer,
            max_tokens,
        })
    }
}

impl TokenCounter for GeminiTokenCounter {
    fn count_tokens(&self, text: &str) -> InsightsResult<u32> {
        let raw = self.tokenizer.encode_with_special_tokens(text).len();
        let estimated = (raw as f32 * APPROXIMATION_FACTOR).ceil() as u32;

        log_debug!(
            raw_tokens = raw,
            estimated_tokens = estimated,
            "Estimated payload tokens"
        );

        Ok(estimated)
    }

    fn max_context_tokens(&self) -> u32 {
        self.max_tokens
    }
}

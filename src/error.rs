//! Error types for the analytics assistant.
//!
//! Every failure the assistant can run into is one variant of
//! [`InsightsError`]. The gateway recovers all of them into assistant turns,
//! so the enum also carries the presentation side: a category for routing,
//! a severity for logging and a [`user_message`](InsightsError::user_message)
//! that is safe to show in the chat transcript.
//!
//! # Error Handling Example
//!
//! ```rust
//! use telesales_insights::{InsightsError, error::ErrorCategory};
//!
//! fn describe(err: &InsightsError) -> String {
//!     match err.category() {
//!         ErrorCategory::Transient => format!("try again: {}", err.user_message()),
//!         ErrorCategory::Client => format!("fix settings: {}", err.user_message()),
//!         _ => err.user_message(),
//!     }
//! }
//!
//! let err = InsightsError::credential_missing("GEMINI_API_KEY");
//! assert!(describe(&err).contains("GEMINI_API_KEY"));
//! ```

use crate::logging::{log_error, log_info, log_warn};
use thiserror::Error;

// ============================================================================
// Error categorization types
// ============================================================================

/// High-level categorization of errors for routing and handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Degraded but expected operation, e.g. running without datasets.
    Degraded,

    /// The remote generation service failed or answered with garbage.
    External,

    /// Caller mistakes: bad configuration, missing credential, misuse of a session.
    Client,

    /// Temporary failures that should be retried with backoff.
    Transient,
}

/// Severity level for logging and alerting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Action failed but the process is stable.
    Error,

    /// Unexpected but recoverable.
    Warning,

    /// Expected failure, part of normal operation.
    Info,
}

// ============================================================================
// Error type
// ============================================================================

/// Convenient result type for assistant operations.
pub type InsightsResult<T> = std::result::Result<T, InsightsError>;

/// Errors that can occur while loading data, composing context or talking to
/// the generation service.
///
/// Use the constructor methods, which log at the matching level:
///
/// ```rust
/// use telesales_insights::InsightsError;
///
/// let err = InsightsError::no_model_available("no model supports generateContent");
/// assert!(!err.is_retryable());
/// ```
///
/// | Variant | Category | Retryable |
/// |---------|----------|-----------|
/// | `DataUnavailable` | Degraded | No |
/// | `MissingColumn` | Degraded | No |
/// | `ConfigurationError` | Client | No |
/// | `CredentialMissing` | Client | No |
/// | `AuthenticationFailed` | Client | No |
/// | `NoModelAvailable` | External | No |
/// | `RequestFailed` | External | Yes |
/// | `RequestRejected` | External | No |
/// | `ResponseParsingError` | External | No |
/// | `RateLimitExceeded` | Transient | Yes |
/// | `Timeout` | Transient | Yes |
/// | `TokenLimitExceeded` | Client | No |
/// | `EmptyPrompt` | Client | No |
/// | `InvalidSessionState` | Client | No |
#[derive(Error, Debug)]
pub enum InsightsError {
    /// A dataset file is missing or could not be parsed.
    #[error("Dataset unavailable: {message}")]
    DataUnavailable {
        /// Which file failed and why.
        message: String,
    },

    /// A table lacks a column the aggregation needs.
    #[error("Column '{column}' not found in {table}")]
    MissingColumn {
        /// Logical table name.
        table: String,
        /// Configured column name.
        column: String,
    },

    /// Configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the problem.
        message: String,
    },

    /// No credential was provided for the generation service.
    #[error("Credential missing: {variable} is not set")]
    CredentialMissing {
        /// Name of the secret the operator should provide.
        variable: String,
    },

    /// The generation service rejected the credential.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Details reported by the service.
        message: String,
    },

    /// Model enumeration returned nothing usable.
    #[error("No model available: {message}")]
    NoModelAvailable {
        /// Why selection failed.
        message: String,
    },

    /// The HTTP request to the service failed.
    #[error("Request failed: {message}")]
    RequestFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service refused the request for a reason retrying will not fix.
    #[error("Request rejected with status {status}: {message}")]
    RequestRejected {
        /// HTTP status code.
        status: u16,
        /// Error text reported by the service.
        message: String,
    },

    /// The service answered, but the body could not be interpreted.
    #[error("Response parsing failed: {message}")]
    ResponseParsingError {
        /// Details about the parsing failure.
        message: String,
    },

    /// The service is throttling requests.
    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimitExceeded {
        /// Recommended wait before retrying.
        retry_after_seconds: u64,
    },

    /// The request did not complete in time.
    #[error("Request timed out after {timeout_seconds}s")]
    Timeout {
        /// The timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// Instruction plus transcript exceed the configured token budget.
    #[error("Token limit exceeded: {current} > {max}")]
    TokenLimitExceeded {
        /// Estimated tokens of the payload.
        current: usize,
        /// Configured budget.
        max: usize,
    },

    /// The user submitted blank input.
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// A session operation was called in the wrong lifecycle state.
    #[error("Invalid session state: expected {expected}, found {found}")]
    InvalidSessionState {
        /// State the operation requires.
        expected: String,
        /// State the session was in.
        found: String,
    },
}

impl InsightsError {
    /// Get the error category for routing and handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DataUnavailable { .. } => ErrorCategory::Degraded,
            Self::MissingColumn { .. } => ErrorCategory::Degraded,
            Self::ConfigurationError { .. } => ErrorCategory::Client,
            Self::CredentialMissing { .. } => ErrorCategory::Client,
            Self::AuthenticationFailed { .. } => ErrorCategory::Client,
            Self::NoModelAvailable { .. } => ErrorCategory::External,
            Self::RequestFailed { .. } => ErrorCategory::External,
            Self::RequestRejected { .. } => ErrorCategory::External,
            Self::ResponseParsingError { .. } => ErrorCategory::External,
            Self::RateLimitExceeded { .. } => ErrorCategory::Transient,
            Self::Timeout { .. } => ErrorCategory::Transient,
            Self::TokenLimitExceeded { .. } => ErrorCategory::Client,
            Self::EmptyPrompt => ErrorCategory::Client,
            Self::InvalidSessionState { .. } => ErrorCategory::Client,
        }
    }

    /// Get the error severity for logging.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DataUnavailable { .. } => ErrorSeverity::Warning,
            Self::MissingColumn { .. } => ErrorSeverity::Warning,
            Self::ConfigurationError { .. } => ErrorSeverity::Error,
            Self::CredentialMissing { .. } => ErrorSeverity::Error,
            Self::AuthenticationFailed { .. } => ErrorSeverity::Error,
            Self::NoModelAvailable { .. } => ErrorSeverity::Error,
            Self::RequestFailed { .. } => ErrorSeverity::Error,
            Self::RequestRejected { .. } => ErrorSeverity::Error,
            Self::ResponseParsingError { .. } => ErrorSeverity::Warning,
            Self::RateLimitExceeded { .. } => ErrorSeverity::Warning,
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::TokenLimitExceeded { .. } => ErrorSeverity::Info,
            Self::EmptyPrompt => ErrorSeverity::Info,
            Self::InvalidSessionState { .. } => ErrorSeverity::Warning,
        }
    }

    /// Whether this error is transient and should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::Timeout { .. } | Self::RequestFailed { .. }
        )
    }

    /// Convert to a message suitable for the chat transcript.
    ///
    /// Each gateway failure kind gets its own wording so the user can tell a
    /// missing key from an outage. Remote failures keep the underlying text
    /// so the operator has something to search for.
    pub fn user_message(&self) -> String {
        match self {
            Self::DataUnavailable { .. } => {
                "The datasets could not be loaded; answers use headline figures only".to_string()
            }
            Self::MissingColumn { table, column } => {
                format!("The {table} data has no '{column}' column")
            }
            Self::ConfigurationError { message } => {
                format!("Assistant configuration issue: {message}")
            }
            Self::CredentialMissing { variable } => format!(
                "Error connecting to AI: no API key found. Please save your {variable} in the environment or secrets store and try again."
            ),
            Self::AuthenticationFailed { .. } => {
                "Error connecting to AI: the API key was rejected. Please check that it is valid."
                    .to_string()
            }
            Self::NoModelAvailable { message } => {
                format!("Error connecting to AI: no usable model is available for this key ({message}).")
            }
            Self::RequestFailed { message, .. } => {
                format!("Error connecting to AI: the request failed ({message}). Please try again.")
            }
            Self::RequestRejected { status, message } => {
                format!("Error connecting to AI: the service rejected the request ({status}: {message}).")
            }
            Self::ResponseParsingError { message } => {
                format!("Error connecting to AI: the reply could not be read ({message}).")
            }
            Self::RateLimitExceeded {
                retry_after_seconds,
            } => format!(
                "The AI service is busy. Please wait {retry_after_seconds} seconds and try again."
            ),
            Self::Timeout { timeout_seconds } => {
                format!("The AI service did not answer within {timeout_seconds} seconds. Please try again.")
            }
            Self::TokenLimitExceeded { .. } => {
                "This conversation has grown too long for the AI service. Start a new session to continue."
                    .to_string()
            }
            Self::EmptyPrompt => "Please type a question first.".to_string(),
            Self::InvalidSessionState { .. } => {
                "Please wait for the current answer before asking again.".to_string()
            }
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================

    pub fn data_unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "data_unavailable",
            message = %message,
            "Dataset load failed, continuing without data"
        );
        Self::DataUnavailable { message }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        let table = table.into();
        let column = column.into();
        log_warn!(
            error_type = "missing_column",
            table = %table,
            column = %column,
            "Configured column absent from table"
        );
        Self::MissingColumn { table, column }
    }

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Configuration validation failed"
        );
        Self::ConfigurationError { message }
    }

    pub fn credential_missing(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        log_error!(
            error_type = "credential_missing",
            variable = %variable,
            "Generation API credential not provided"
        );
        Self::CredentialMissing { variable }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "authentication_failed",
            message = %message,
            "Generation API rejected credential"
        );
        Self::AuthenticationFailed { message }
    }

    pub fn no_model_available(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "no_model_available",
            message = %message,
            "Model selection found no candidate"
        );
        Self::NoModelAvailable { message }
    }

    pub fn request_failed(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let message = message.into();
        log_error!(
            error_type = "request_failed",
            message = %message,
            has_source = source.is_some(),
            "Generation request failed"
        );
        Self::RequestFailed { message, source }
    }

    pub fn request_rejected(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "request_rejected",
            status = status,
            message = %message,
            "Generation request rejected"
        );
        Self::RequestRejected { status, message }
    }

    pub fn response_parsing_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "response_parsing_error",
            message = %message,
            "Generation response format invalid"
        );
        Self::ResponseParsingError { message }
    }

    pub fn rate_limit_exceeded(retry_after_seconds: u64) -> Self {
        log_warn!(
            error_type = "rate_limit_exceeded",
            retry_after_seconds = retry_after_seconds,
            "Generation API rate limit exceeded"
        );
        Self::RateLimitExceeded {
            retry_after_seconds,
        }
    }

    pub fn timeout(timeout_seconds: u64) -> Self {
        log_warn!(
            error_type = "timeout",
            timeout_seconds = timeout_seconds,
            "Generation request timed out"
        );
        Self::Timeout { timeout_seconds }
    }

    pub fn token_limit_exceeded(current: usize, max: usize) -> Self {
        log_info!(
            error_type = "token_limit_exceeded",
            current_tokens = current,
            max_tokens = max,
            "Payload exceeds token budget"
        );
        Self::TokenLimitExceeded { current, max }
    }

    pub fn invalid_session_state(expected: impl Into<String>, found: impl Into<String>) -> Self {
        let expected = expected.into();
        let found = found.into();
        log_warn!(
            error_type = "invalid_session_state",
            expected = %expected,
            found = %found,
            "Session operation rejected"
        );
        Self::InvalidSessionState { expected, found }
    }
}

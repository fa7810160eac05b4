//! Unit Tests for Gemini Backend HTTP Integration
//!
//! UNIT UNDER TEST: GeminiBackend HTTP request handling
//!
//! BUSINESS RESPONSIBILITY:
//!   - Enumerate models available to the key
//!   - Send one generateContent request with instruction and transcript
//!   - Map API errors (400, 401, 403, 404, 429, 5xx) onto the error taxonomy
//!   - Apply retry logic for transient failures only
//!
//! TEST COVERAGE:
//!   - Model listing with pagination
//!   - Successful generation and request shape
//!   - Authentication, throttling, rejection and server errors

mod common;

use common::*;
use telesales_insights::core_types::{GenerationRequest, ModelBackend};
use telesales_insights::{GeminiBackend, InsightsError};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> GeminiBackend {
    GeminiBackend::new(server.uri(), create_fast_test_retry_policy()).expect("valid base url")
}

fn request(model: &str) -> GenerationRequest {
    GenerationRequest {
        model: model.to_string(),
        system_instruction: "You are the Senior Data Assistant.".to_string(),
        prompt: "assistant: Hello!\nuser: What is GMV?".to_string(),
    }
}

// ============================================================================
// Model listing
// ============================================================================

#[tokio::test]
async fn test_list_models_sends_key_and_parses_listing() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(header("x-goog-api-key", TEST_KEY))
        .and(query_param("pageSize", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(models_listing(&["gemini-1.5-pro", "gemini-1.5-flash"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let models = backend_for(&server)
        .list_models(TEST_KEY)
        .await
        .expect("listing succeeds");

    // Assert
    let names: Vec<&str> = models.iter().map(|m| m.short_name()).collect();
    assert_eq!(names, vec!["gemini-1.5-pro", "gemini-1.5-flash"]);
    assert!(models.iter().all(|m| m.supports_generation()));
}

#[tokio::test]
async fn test_list_models_follows_page_tokens() {
    // Arrange
    let server = MockServer::start().await;
    let mut first_page = models_listing(&["gemini-1.5-pro"]);
    first_page["nextPageToken"] = serde_json::json!("page-2");
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(models_listing(&["gemini-1.5-flash"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let models = backend_for(&server)
        .list_models(TEST_KEY)
        .await
        .expect("listing succeeds");

    // Assert
    assert_eq!(models.len(), 2, "Both pages should be collected");
}

#[tokio::test]
async fn test_list_models_with_rejected_key_is_authentication_failure() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(error_response(400, "API key not valid.", Some("API_KEY_INVALID")))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let result = backend_for(&server).list_models("bad-key").await;

    // Assert
    assert!(
        matches!(result, Err(InsightsError::AuthenticationFailed { .. })),
        "Invalid key should not be retried or reported as a generic 400: {result:?}"
    );
}

// ============================================================================
// Generation
// ============================================================================

#[tokio::test]
async fn test_generate_sends_instruction_and_transcript() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", TEST_KEY))
        .and(body_partial_json(serde_json::json!({
            "systemInstruction": {"parts": [{"text": "You are the Senior Data Assistant."}]},
            "contents": [{"role": "user", "parts": [{"text": "assistant: Hello!\nuser: What is GMV?"}]}]
        })))
        .respond_with(success_response("GMV over 12 weeks was $61.73K."))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let response = backend_for(&server)
        .generate(TEST_KEY, request("models/gemini-1.5-flash"))
        .await
        .expect("generation succeeds");

    // Assert
    assert_eq!(response.content, "GMV over 12 weeks was $61.73K.");
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(870));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(error_response(403, "Permission denied", None))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let result = backend_for(&server)
        .generate(TEST_KEY, request("gemini-1.5-flash"))
        .await;

    // Assert
    assert!(matches!(result, Err(InsightsError::AuthenticationFailed { .. })));
}

#[tokio::test]
async fn test_bad_request_is_rejected_without_retry() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(error_response(404, "models/nope is not found", None))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let result = backend_for(&server).generate(TEST_KEY, request("nope")).await;

    // Assert
    match result {
        Err(InsightsError::RequestRejected { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "models/nope is not found");
        }
        other => panic!("Expected RequestRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retried_then_succeeds() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            error_response(429, "Resource exhausted", None).insert_header("retry-after", "1"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(success_response("Recovered"))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let response = backend_for(&server)
        .generate(TEST_KEY, request("gemini-1.5-flash"))
        .await
        .expect("second attempt succeeds");

    // Assert
    assert_eq!(response.content, "Recovered");
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(error_response(503, "The model is overloaded", None))
        .expect(3)
        .mount(&server)
        .await;

    // Act
    let result = backend_for(&server)
        .generate(TEST_KEY, request("gemini-1.5-flash"))
        .await;

    // Assert
    match result {
        Err(InsightsError::RequestFailed { message, .. }) => {
            assert!(message.contains("overloaded"), "Got: {message}");
        }
        other => panic!("Expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blocked_prompt_is_parsing_error() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    // Act
    let result = backend_for(&server)
        .generate(TEST_KEY, request("gemini-1.5-flash"))
        .await;

    // Assert
    assert!(matches!(result, Err(InsightsError::ResponseParsingError { .. })));
}

#[tokio::test]
async fn test_unreachable_server_is_request_failure() {
    // Arrange
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);
    let backend = GeminiBackend::new(uri, create_fast_test_retry_policy()).expect("valid url");

    // Act
    let result = backend.generate(TEST_KEY, request("gemini-1.5-flash")).await;

    // Assert
    assert!(matches!(result, Err(InsightsError::RequestFailed { .. })));
}

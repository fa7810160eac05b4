//! End-to-end conversation tests against a mock generation service
//!
//! UNIT UNDER TEST: Assistant with DatasetLoader, ContextBuilder and GeminiBackend
//!
//! BUSINESS RESPONSIBILITY:
//!   - Answer questions grounded in KPI figures and call statistics
//!   - Keep the conversation usable whatever the service does
//!
//! TEST COVERAGE:
//!   - Datasets on disk reach the request payload as schemas and aggregates
//!   - Missing datasets fall back to headline figures
//!   - Model discovery and preference over HTTP
//!   - Error text turns for missing and rejected keys

mod common;

use common::*;
use std::sync::Arc;
use telesales_insights::{
    Assistant, ConversationSession, DatasetLoader, MessageRole, ModelGateway, SessionRegistry,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn mount_listing(server: &MockServer, models: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models_listing(models)))
        .mount(server)
        .await;
}

fn system_instruction(request: &Request) -> String {
    let body: serde_json::Value = serde_json::from_slice(&request.body).expect("json body");
    body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .expect("instruction text")
        .to_string()
}

fn transcript(request: &Request) -> String {
    let body: serde_json::Value = serde_json::from_slice(&request.body).expect("json body");
    body["contents"][0]["parts"][0]["text"]
        .as_str()
        .expect("transcript text")
        .to_string()
}

async fn generation_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("recording enabled")
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .collect()
}

fn build_assistant(dir: &TempDir, server: &MockServer, api_key: Option<&str>) -> Assistant {
    let config = create_app_config(dir.path(), &server.uri(), api_key);
    let datasets = DatasetLoader::new(config.datasets.clone()).load();
    let gateway = ModelGateway::from_config(config.gateway.clone()).expect("valid gateway config");
    Assistant::from_datasets(gateway, &config, &datasets)
}

#[tokio::test]
async fn test_question_is_grounded_in_datasets_and_kpis() {
    // Arrange
    let dir = TempDir::new().expect("temp dir");
    write_datasets(dir.path(), true);
    let server = MockServer::start().await;
    mount_listing(&server, &["gemini-1.5-pro", "gemini-1.5-flash"]).await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(success_response("Agent A handled the most calls."))
        .expect(1)
        .mount(&server)
        .await;
    let assistant = build_assistant(&dir, &server, Some(TEST_KEY));
    let mut session = ConversationSession::new();

    // Act
    let reply = assistant
        .ask(&mut session, "Which agent made the most calls?")
        .await
        .expect("turn completes")
        .content
        .clone();

    // Assert
    assert_eq!(reply, "Agent A handled the most calls.");
    assert_eq!(session.len(), 3);

    let requests = generation_requests(&server).await;
    assert_eq!(requests.len(), 1, "Exactly one generation request per turn");
    let instruction = system_instruction(&requests[0]);
    assert!(instruction.contains("$61.73K"), "Headline GMV must be sent");
    assert!(instruction.contains("CALL STATISTICS (derived from 3 call records):"));
    assert!(instruction.contains("- A: 2 calls"));
    assert!(instruction.contains("- B: 1 call"));
    assert!(instruction.contains("- orders: 2 rows; columns: order_id, gmv"));
    assert!(instruction.contains("- leads: 1 row; columns: lead_id, source"));
    assert!(instruction.contains("- campaigns: 2 rows; columns: campaign_id, name"));
    assert!(!instruction.contains("Spring"), "Raw rows are never sent");
    assert!(
        transcript(&requests[0]).ends_with("user: Which agent made the most calls?"),
        "The new question is part of the transcript"
    );
}

#[tokio::test]
async fn test_missing_attempt_column_sends_sentinel() {
    // Arrange
    let dir = TempDir::new().expect("temp dir");
    write_datasets(dir.path(), false);
    let server = MockServer::start().await;
    mount_listing(&server, &["gemini-1.5-flash"]).await;
    Mock::given(method("POST"))
        .respond_with(success_response("No attempt data."))
        .mount(&server)
        .await;
    let assistant = build_assistant(&dir, &server, Some(TEST_KEY));
    let mut session = ConversationSession::new();

    // Act
    assistant
        .ask(&mut session, "How do attempts convert?")
        .await
        .expect("turn completes");

    // Assert
    let requests = generation_requests(&server).await;
    assert!(system_instruction(&requests[0]).contains("Attempt number data not available."));
}

#[tokio::test]
async fn test_missing_datasets_fall_back_to_headline_figures() {
    // Arrange
    let dir = TempDir::new().expect("temp dir");
    let server = MockServer::start().await;
    mount_listing(&server, &["gemini-1.5-flash"]).await;
    Mock::given(method("POST"))
        .respond_with(success_response("GMV was $61.73K."))
        .mount(&server)
        .await;
    let assistant = build_assistant(&dir, &server, Some(TEST_KEY));
    let mut session = ConversationSession::new();

    // Act
    assistant
        .ask(&mut session, "What was GMV?")
        .await
        .expect("turn completes");

    // Assert
    assert!(assistant.aggregates().is_none());
    let instruction = system_instruction(&generation_requests(&server).await[0]);
    assert!(instruction.contains("$61.73K"));
    assert!(!instruction.contains("CALL STATISTICS ("));
}

#[tokio::test]
async fn test_transcript_accumulates_across_turns() {
    // Arrange
    let dir = TempDir::new().expect("temp dir");
    write_datasets(dir.path(), true);
    let server = MockServer::start().await;
    mount_listing(&server, &["gemini-1.5-flash"]).await;
    Mock::given(method("POST"))
        .respond_with(success_response("Answer."))
        .expect(3)
        .mount(&server)
        .await;
    let assistant = build_assistant(&dir, &server, Some(TEST_KEY));
    let mut session = ConversationSession::new();

    // Act
    for question in ["First?", "Second?", "Third?"] {
        assistant
            .ask(&mut session, question)
            .await
            .expect("turn completes");
    }

    // Assert
    assert_eq!(session.len(), 7, "1 + 2N messages after N turns");
    let requests = generation_requests(&server).await;
    let last = transcript(&requests[2]);
    assert!(last.contains("user: First?\nassistant: Answer.\nuser: Second?"));
    assert!(last.ends_with("user: Third?"));
}

#[tokio::test]
async fn test_missing_key_answers_with_error_text_and_no_traffic() {
    // Arrange
    let dir = TempDir::new().expect("temp dir");
    write_datasets(dir.path(), true);
    let server = MockServer::start().await;
    let assistant = build_assistant(&dir, &server, None);
    let mut session = ConversationSession::new();

    // Act
    let reply = assistant
        .ask(&mut session, "What is GMV?")
        .await
        .expect("errors become text")
        .clone();

    // Assert
    assert_eq!(reply.role, MessageRole::Assistant);
    assert!(reply.content.contains("GEMINI_API_KEY"));
    assert_eq!(session.len(), 3);
    let received = server.received_requests().await.expect("recording enabled");
    assert!(received.is_empty(), "No request may leave without a key");
}

#[tokio::test]
async fn test_rejected_key_answers_with_error_text() {
    // Arrange
    let dir = TempDir::new().expect("temp dir");
    write_datasets(dir.path(), true);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(error_response(400, "API key not valid.", Some("API_KEY_INVALID")))
        .mount(&server)
        .await;
    let assistant = build_assistant(&dir, &server, Some("wrong"));
    let mut session = ConversationSession::new();

    // Act
    let content = assistant
        .ask(&mut session, "Hi")
        .await
        .expect("errors become text")
        .content
        .clone();

    // Assert
    assert!(content.contains("rejected"), "Got: {content}");
    assert_eq!(session.len(), 3);
    assert!(generation_requests(&server).await.is_empty());

    // The session stays usable for the next question
    let next = assistant.ask(&mut session, "Again").await;
    assert!(next.is_ok());
    assert_eq!(session.len(), 5);
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_share_transcripts() {
    // Arrange
    let dir = TempDir::new().expect("temp dir");
    write_datasets(dir.path(), true);
    let server = MockServer::start().await;
    mount_listing(&server, &["gemini-1.5-flash"]).await;
    Mock::given(method("POST"))
        .respond_with(success_response("Answer."))
        .mount(&server)
        .await;
    let assistant = Arc::new(build_assistant(&dir, &server, Some(TEST_KEY)));
    let registry = SessionRegistry::new();
    let (_, first) = registry.create().await;
    let (_, second) = registry.create().await;

    // Act
    let a = {
        let assistant = Arc::clone(&assistant);
        let session = Arc::clone(&first);
        tokio::spawn(async move {
            let mut session = session.lock().await;
            assistant.ask(&mut session, "from first").await.map(|_| ())
        })
    };
    let b = {
        let assistant = Arc::clone(&assistant);
        let session = Arc::clone(&second);
        tokio::spawn(async move {
            let mut session = session.lock().await;
            for q in ["from second 1", "from second 2"] {
                assistant.ask(&mut session, q).await?;
            }
            Ok::<(), telesales_insights::InsightsError>(())
        })
    };
    a.await.expect("task joined").expect("turn completes");
    b.await.expect("task joined").expect("turns complete");

    // Assert
    let first = first.lock().await;
    let second = second.lock().await;
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 5);
    assert!(!first.render_transcript().contains("from second"));
}

//! LLM client against mocked provider endpoints.

use summarist::llm::{LlmClient, LlmConfig, LlmError, LlmProvider, TextGenerator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gemini_config(server: &MockServer) -> LlmConfig {
    LlmConfig::default()
        .with_endpoint(&server.uri())
        .with_api_key("test-key")
}

#[tokio::test]
async fn test_gemini_generate_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": "Summarise this"}]}],
            "generationConfig": {"temperature": 0.0}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "A short "}, {"text": "summary."}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = LlmClient::new(gemini_config(&mock_server)).unwrap();
    let text = client.generate("Summarise this").await.unwrap();
    assert_eq!(text, "A short summary.");
}

#[tokio::test]
async fn test_gemini_blocked_prompt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&mock_server)
        .await;

    let client = LlmClient::new(gemini_config(&mock_server)).unwrap();
    let err = client.generate("anything").await.unwrap_err();
    assert!(matches!(err, LlmError::Blocked(reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_gemini_error_object_in_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&mock_server)
        .await;

    let client = LlmClient::new(gemini_config(&mock_server)).unwrap();
    let err = client.generate("anything").await.unwrap_err();
    assert!(matches!(err, LlmError::Api(message) if message == "API key not valid"));
}

#[tokio::test]
async fn test_undecodable_body_is_a_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string("<html>gateway page</html>"),
        )
        .mount(&mock_server)
        .await;

    let client = LlmClient::new(gemini_config(&mock_server)).unwrap();
    let err = client.generate("anything").await.unwrap_err();
    assert!(matches!(err, LlmError::Parse(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_backoff_without_retry_after_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Recovered."}]}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = gemini_config(&mock_server);
    config.max_retries = 1;

    let client = LlmClient::new(config).unwrap();
    let started = std::time::Instant::now();
    assert_eq!(client.generate("hello").await.unwrap(), "Recovered.");
    // First backoff step is one second
    assert!(started.elapsed() >= std::time::Duration::from_millis(900));
}

#[tokio::test]
async fn test_openai_chat_completions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "Summarise this"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Chat summary."}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = LlmConfig {
        provider: LlmProvider::OpenAI,
        ..LlmConfig::default()
    }
    .with_endpoint(&mock_server.uri())
    .with_model("gpt-4o-mini")
    .with_api_key("sk-test");

    let client = LlmClient::new(config).unwrap();
    assert_eq!(client.generate("Summarise this").await.unwrap(), "Chat summary.");
}

#[tokio::test]
async fn test_ollama_generate_needs_no_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.2",
            "prompt": "Summarise this",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama3.2",
            "response": "Local summary.",
            "done": true
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&mock_server)
        .await;

    let config = LlmConfig {
        provider: LlmProvider::Ollama,
        ..LlmConfig::default()
    }
    .with_endpoint(&mock_server.uri())
    .with_model("llama3.2");

    let client = LlmClient::new(config).unwrap();
    assert!(client.is_available().await);
    assert_eq!(client.generate("Summarise this").await.unwrap(), "Local summary.");
}

#[tokio::test]
async fn test_rate_limit_retries_then_gives_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = gemini_config(&mock_server);
    config.max_retries = 2;

    let client = LlmClient::new(config).unwrap();
    match client.generate("hello").await.unwrap_err() {
        LlmError::RateLimited {
            provider,
            attempts,
            retry_after_secs,
        } => {
            assert_eq!(provider, LlmProvider::Gemini);
            assert_eq!(attempts, 3);
            assert_eq!(retry_after_secs, Some(0));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = LlmClient::new(gemini_config(&mock_server)).unwrap();
    let err = client.generate("hello").await.unwrap_err();
    match err {
        LlmError::Api(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("internal failure"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = LlmConfig {
        provider: LlmProvider::OpenAI,
        ..LlmConfig::default()
    }
    .with_endpoint(&mock_server.uri());

    let client = LlmClient::new(config).unwrap();
    let err = client.generate("hello").await.unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { provider: LlmProvider::OpenAI, .. }));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

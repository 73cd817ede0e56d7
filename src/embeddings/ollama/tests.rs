use super::*;
use crate::config::OllamaConfig;

fn test_config() -> Config {
    Config {
        ollama: OllamaConfig {
            host: "test-host".to_string(),
            port: 1234,
            embedding_model: "test-embed-model".to_string(),
            batch_size: 128,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}

#[test]
fn client_configuration() {
    let client = OllamaClient::new(&test_config()).expect("Failed to create client");

    assert_eq!(client.model, "test-embed-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&Config::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn embed_request_wire_format() {
    let request = EmbedRequest {
        model: "nomic-embed-text".to_string(),
        prompt: "Who is this person?".to_string(),
    };
    let json = serde_json::to_value(&request).expect("should serialize");

    assert_eq!(json["model"], "nomic-embed-text");
    assert_eq!(json["prompt"], "Who is this person?");
}

#[test]
fn batch_embed_request_uses_input_field() {
    let request = BatchEmbedRequest {
        model: "nomic-embed-text".to_string(),
        inputs: vec!["a".to_string(), "b".to_string()],
    };
    let json = serde_json::to_value(&request).expect("should serialize");

    assert_eq!(json["input"][0], "a");
    assert_eq!(json["input"][1], "b");
    assert!(json.get("inputs").is_none());
}

#[test]
fn embed_response_parsing() {
    let response: EmbedResponse =
        serde_json::from_str(r#"{"embedding": [0.1, 0.2, 0.3]}"#).expect("should parse");
    assert_eq!(response.embedding, vec![0.1, 0.2, 0.3]);

    let batch: BatchEmbedResponse =
        serde_json::from_str(r#"{"embeddings": [[0.1], [0.2]]}"#).expect("should parse");
    assert_eq!(batch.embeddings.len(), 2);
}

#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! HTTP surface tests: the axum application served on an ephemeral port,
//! driven over real HTTP, with Ollama mocked out.

use profile_rag::answer::AnswerService;
use profile_rag::config::{Config, OllamaConfig};
use profile_rag::database::lancedb::VectorStore;
use profile_rag::embeddings::OllamaClient;
use profile_rag::generation::ChatClient;
use profile_rag::ingest::rebuild_profile;
use profile_rag::server::{AppState, build_router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_PROFILE: &str = "ABOUT\nName: Jane Doe. Engineer.\n\nJane enjoys hiking in the mountains.\n\nJane works on distributed systems.";

const CHAT_REPLY: &str = "Your name is Jane Doe.";

struct TestApp {
    addr: SocketAddr,
    store: Arc<VectorStore>,
    embeddings: Arc<OllamaClient>,
    _mock_server: MockServer,
    _temp_dir: TempDir,
}

async fn spawn_test_app() -> TestApp {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ollama: OllamaConfig {
            host: mock_server.address().ip().to_string(),
            port: mock_server.address().port(),
            batch_size: 1,
            embedding_dimension: 4,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };

    mount_embedding(&mock_server, "Who is this person", [1.0, 0.0, 0.0, 0.0]).await;
    mount_embedding(&mock_server, "ABOUT", [0.8, 0.2, 0.0, 0.0]).await;
    mount_embedding(&mock_server, "hiking", [0.0, 1.0, 0.0, 0.0]).await;
    mount_embedding(&mock_server, "distributed systems", [0.0, 0.0, 1.0, 0.0]).await;
    mount_embedding(&mock_server, "What is my name", [1.0, 0.1, 0.0, 0.0]).await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.0, 0.0, 0.0, 1.0]})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "qwen2.5:0.5b",
            "message": {"role": "assistant", "content": CHAT_REPLY},
            "done": true
        })))
        .mount(&mock_server)
        .await;

    let store = Arc::new(
        VectorStore::new(&config)
            .await
            .expect("should create vector store"),
    );
    let embeddings = Arc::new(OllamaClient::new(&config).expect("should create Ollama client"));
    let chat = Arc::new(ChatClient::new(&config).expect("should create chat client"));

    let state = AppState {
        answer_service: Arc::new(AnswerService::new(
            Arc::clone(&store),
            Arc::clone(&embeddings),
            chat,
            config.retrieval.clone(),
        )),
        store: Arc::clone(&store),
        embeddings: Arc::clone(&embeddings),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind ephemeral port");
    let addr = listener.local_addr().expect("should read local addr");

    tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .await
            .expect("server should run");
    });

    TestApp {
        addr,
        store,
        embeddings,
        _mock_server: mock_server,
        _temp_dir: temp_dir,
    }
}

async fn mount_embedding(server: &MockServer, needle: &str, vector: [f32; 4]) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": vector})))
        .mount(server)
        .await;
}

async fn http_get(url: String) -> Result<Value, ureq::Error> {
    tokio::task::spawn_blocking(move || {
        let mut response = ureq::get(&url).call()?;
        let body = response.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&body).expect("response should be JSON"))
    })
    .await
    .expect("request task should not panic")
}

async fn http_post_json(url: String, body: Value) -> Result<Value, ureq::Error> {
    tokio::task::spawn_blocking(move || {
        let payload = body.to_string();
        let mut response = ureq::post(&url)
            .header("Content-Type", "application/json")
            .send(&payload)?;
        let text = response.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&text).expect("response should be JSON"))
    })
    .await
    .expect("request task should not panic")
}

#[tokio::test(flavor = "multi_thread")]
async fn ask_returns_answer_with_identity_context() {
    let app = spawn_test_app().await;

    rebuild_profile(&app.store, &app.embeddings, TEST_PROFILE)
        .await
        .expect("should rebuild profile");

    let body = http_get(format!(
        "http://{}/ask?question=What%20is%20my%20name%3F",
        app.addr
    ))
    .await
    .expect("ask should succeed");

    assert_eq!(body["question"], "What is my name?");
    assert_eq!(body["answer"], CHAT_REPLY);
    assert_eq!(body["filtered_by_user"], Value::Null);

    let contexts = body["context_used"]
        .as_array()
        .expect("context_used should be an array");
    assert!(
        contexts
            .iter()
            .any(|c| c == "Who is this person: Name: Jane Doe. Engineer."),
        "identity chunk missing from context: {:?}",
        contexts
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn ask_without_question_is_a_client_error() {
    let app = spawn_test_app().await;

    let result = http_get(format!("http://{}/ask", app.addr)).await;

    match result {
        Err(ureq::Error::StatusCode(status)) => assert_eq!(status, 400),
        other => panic!("expected a 400 response, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ask_with_unknown_user_filter_returns_empty_context() {
    let app = spawn_test_app().await;

    rebuild_profile(&app.store, &app.embeddings, TEST_PROFILE)
        .await
        .expect("should rebuild profile");

    let body = http_get(format!(
        "http://{}/ask?question=What%20is%20my%20name%3F&user=ghost",
        app.addr
    ))
    .await
    .expect("filtered ask must not be a server failure");

    assert_eq!(body["filtered_by_user"], "ghost");
    assert_eq!(
        body["context_used"],
        Value::Array(Vec::new()),
        "no chunks stored for ghost, context must be empty"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn documents_endpoint_adds_user_chunks() {
    let app = spawn_test_app().await;

    let body = http_post_json(
        format!("http://{}/documents", app.addr),
        json!({
            "user_name": "alice",
            "content": "Alice likes hiking.\n\nAlice works on distributed systems."
        }),
    )
    .await
    .expect("document submission should succeed");

    assert_eq!(body["user_name"], "alice");
    assert_eq!(body["chunks_added"], 2);
    assert_eq!(body["message"], "Added 2 chunks for user 'alice'.");

    let count = app.store.count_chunks().await.expect("should count");
    assert_eq!(count, 2);

    // Submissions accumulate; a second identical submission doubles the count
    http_post_json(
        format!("http://{}/documents", app.addr),
        json!({
            "user_name": "alice",
            "content": "Alice likes hiking.\n\nAlice works on distributed systems."
        }),
    )
    .await
    .expect("repeat submission should succeed");

    let count = app.store.count_chunks().await.expect("should count");
    assert_eq!(count, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn documents_endpoint_rejects_blank_user_name() {
    let app = spawn_test_app().await;

    let result = http_post_json(
        format!("http://{}/documents", app.addr),
        json!({"user_name": "   ", "content": "text"}),
    )
    .await;

    match result {
        Err(ureq::Error::StatusCode(status)) => assert_eq!(status, 400),
        other => panic!("expected a 400 response, got {:?}", other),
    }
}

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::answer::AnswerService;
use crate::config::{Config, get_config_dir};
use crate::database::lancedb::VectorStore;
use crate::embeddings::OllamaClient;
use crate::generation::ChatClient;
use crate::ingest::rebuild_profile;
use crate::server::{self, AppState};

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(config_dir)
}

/// Build (or rebuild) the knowledge base from a profile document
#[inline]
pub async fn build_knowledge_base(profile_path: &Path) -> Result<()> {
    let config = load_config()?;

    let text = std::fs::read_to_string(profile_path)
        .with_context(|| format!("Failed to read profile file: {}", profile_path.display()))?;

    let embeddings = OllamaClient::new(&config).context("Failed to initialize Ollama client")?;
    embeddings
        .health_check()
        .context("Ollama is not ready for embedding generation")?;

    let store = VectorStore::new(&config)
        .await
        .context("Failed to initialize vector store")?;

    let count = rebuild_profile(&store, &embeddings, &text).await?;

    println!("Added {} chunks to the knowledge base.", count);
    println!("Knowledge base built successfully!");

    Ok(())
}

/// Start the HTTP question-answering server
#[inline]
pub async fn serve() -> Result<()> {
    let config = load_config()?;

    let embeddings =
        Arc::new(OllamaClient::new(&config).context("Failed to initialize Ollama client")?);
    let chat = Arc::new(ChatClient::new(&config).context("Failed to initialize chat client")?);

    // Ollama may still be starting; requests surface their own errors.
    if let Err(e) = embeddings.health_check() {
        warn!("Ollama health check failed: {:#}", e);
    } else if let Ok(models) = embeddings.list_models() {
        let chat_available = models
            .iter()
            .any(|m| m.name == chat.model() || m.name == format!("{}:latest", chat.model()));
        if !chat_available {
            warn!(
                "Chat model '{}' not found among available models",
                chat.model()
            );
        }
    }

    let store = Arc::new(
        VectorStore::new(&config)
            .await
            .context("Failed to initialize vector store")?,
    );

    let answer_service = Arc::new(AnswerService::new(
        Arc::clone(&store),
        Arc::clone(&embeddings),
        chat,
        config.retrieval.clone(),
    ));

    let state = AppState {
        answer_service,
        store,
        embeddings,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    server::run(listener, state).await?;

    Ok(())
}

/// Show the status of the knowledge base and its collaborators
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;

    println!("Profile RAG status");
    println!();
    println!("Config file: {}", config.config_file_path().display());
    println!(
        "Ollama: {} (embedding model: {}, chat model: {})",
        config.ollama_url().map_or_else(
            |_| "invalid URL".to_string(),
            |url| url.to_string()
        ),
        config.ollama.embedding_model,
        config.ollama.chat_model
    );

    let embeddings = OllamaClient::new(&config).context("Failed to initialize Ollama client")?;
    match embeddings.ping() {
        Ok(()) => println!("Ollama server: reachable"),
        Err(e) => println!("Ollama server: unreachable ({})", e),
    }

    let store = VectorStore::new(&config)
        .await
        .context("Failed to initialize vector store")?;
    let count = store.count_chunks().await?;
    println!("Stored chunks: {}", count);

    info!("Status check complete");
    Ok(())
}

// Ingestion module
// Writes chunked profile text into the vector store, in two modes:
// a bulk rebuild of the default namespace and per-user appends.


use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::chunker::{chunk_paragraphs, chunk_profile};
use crate::database::lancedb::{ChunkMetadata, ChunkRecord, VectorStore};
use crate::embeddings::OllamaClient;

/// Metadata source tag for every stored chunk
pub const PROFILE_SOURCE: &str = "profile";

/// Rebuild the default namespace from a full profile text.
///
/// The profile is chunked with identity augmentation, embedded, and then
/// replaces all previously stored chunks: existing ids are fetched and
/// deleted before the new chunk set is inserted under ids `chunk{i}`.
/// This guarantees the store never mixes old and new chunking schemes.
/// The delete and insert are two separate store calls, not one atomic
/// operation; a crash between them leaves the store empty until the next
/// rebuild.
///
/// Returns the number of chunks written. Zero chunks is a valid outcome
/// for an empty profile; the store still ends up empty of old chunks.
#[inline]
pub async fn rebuild_profile(
    store: &VectorStore,
    embeddings: &OllamaClient,
    text: &str,
) -> Result<usize> {
    let chunks = chunk_profile(text);
    info!("Chunked profile into {} chunks", chunks.len());

    if chunks.is_empty() {
        warn!("Profile text produced no chunks; clearing store");
    }

    // Embed before touching the store so an embedding failure leaves the
    // existing knowledge base intact.
    let vectors = embeddings
        .embed_batch(&chunks)
        .context("Failed to embed profile chunks")?;

    let existing = store
        .list_ids()
        .await
        .context("Failed to list existing chunk ids")?;
    store
        .delete_ids(&existing)
        .await
        .context("Failed to delete existing chunks")?;

    let created_at = Utc::now().to_rfc3339();
    let records = chunks
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (chunk, vector))| ChunkRecord {
            id: format!("chunk{}", i),
            vector,
            metadata: ChunkMetadata {
                content: chunk.clone(),
                source: PROFILE_SOURCE.to_string(),
                user_name: None,
                chunk_index: i as u32,
                created_at: created_at.clone(),
            },
        })
        .collect();

    store
        .store_chunks_batch(records)
        .await
        .context("Failed to store profile chunks")?;

    info!("Rebuilt knowledge base with {} chunks", chunks.len());
    Ok(chunks.len())
}

/// Append a user's document to their namespace.
///
/// The content is chunked without identity augmentation and stored under
/// ids `{user_name}-chunk{i}` with the user attached as metadata. Prior
/// chunks for the user are NOT deleted: repeated submissions accumulate.
/// This is a documented limitation of the submission endpoint, not a bug.
///
/// Returns the number of chunks written.
#[inline]
pub async fn append_user_document(
    store: &VectorStore,
    embeddings: &OllamaClient,
    user_name: &str,
    content: &str,
) -> Result<usize> {
    let chunks = chunk_paragraphs(content);
    info!(
        "Chunked submission for user '{}' into {} chunks",
        user_name,
        chunks.len()
    );

    let vectors = embeddings
        .embed_batch(&chunks)
        .context("Failed to embed submitted chunks")?;

    let created_at = Utc::now().to_rfc3339();
    let records = chunks
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (chunk, vector))| ChunkRecord {
            id: format!("{}-chunk{}", user_name, i),
            vector,
            metadata: ChunkMetadata {
                content: chunk.clone(),
                source: PROFILE_SOURCE.to_string(),
                user_name: Some(user_name.to_string()),
                chunk_index: i as u32,
                created_at: created_at.clone(),
            },
        })
        .collect();

    store
        .store_chunks_batch(records)
        .await
        .context("Failed to store submitted chunks")?;

    Ok(chunks.len())
}

// LanceDB vector database module
// Handles chunk storage and similarity search for profile embeddings

pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{SearchResult, VectorStore};

/// A profile chunk stored in LanceDB together with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier within the chunk's namespace
    /// (`chunk{i}` for the bulk profile, `{user}-chunk{i}` for user submissions)
    pub id: String,
    /// The vector embedding of the chunk text
    pub vector: Vec<f32>,
    /// Metadata stored alongside the embedding
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// The chunk text itself
    pub content: String,
    /// Where the chunk came from (currently always "profile")
    pub source: String,
    /// Owner of the chunk; `None` for the default whole-profile namespace
    pub user_name: Option<String>,
    /// Position of this chunk within its ingestion batch
    pub chunk_index: u32,
    /// RFC 3339 timestamp of when the chunk was stored
    pub created_at: String,
}

// Embeddings module
// Converts chunk text into vectors via a local Ollama instance

pub mod ollama;

pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};

// Generation module
// Produces answers from augmented prompts via a local Ollama chat model

pub mod ollama;

pub use ollama::{ChatClient, ChatMessage};

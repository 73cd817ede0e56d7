// Database module
// LanceDB-backed vector storage for profile chunks

pub mod lancedb;

pub use lancedb::*;

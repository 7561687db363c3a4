pub mod editing;
pub mod error;
pub mod ingest;

// Re-export key types for easier usage
pub use editing::*;
pub use error::{MutationError, Result, SuggestionError};
pub use ingest::{SuggestionPayload, normalize, parse_batch};

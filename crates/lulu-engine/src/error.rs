use crate::editing::SuggestionId;

/// Reasons a mutation cannot be applied to the document it claims to describe
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("splice {index} at {at} deletes {deleted_len} bytes past document length {len}")]
    OutOfBounds {
        index: usize,
        at: usize,
        deleted_len: usize,
        len: usize,
    },
    #[error("splice {index} at {at} comes before the previous splice at {previous}")]
    OutOfOrder {
        index: usize,
        at: usize,
        previous: usize,
    },
    #[error("mutation produces {expected} bytes but the supplied text has {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("offset {at} is not on a character boundary")]
    NotCharBoundary { at: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("suggestion {0} no longer applies to the document")]
    OrphanedSuggestion(SuggestionId),
    #[error("suggestion {0} not found")]
    NotFound(SuggestionId),
    #[error("snapshot at sequence {snapshot} cannot take a mutation based on sequence {mutation}")]
    StaleSnapshot { snapshot: u64, mutation: u64 },
    #[error("invalid mutation: {0}")]
    InvalidMutation(#[from] MutationError),
    #[error("suggestion {0} is already in the store")]
    DuplicateId(SuggestionId),
    #[error("suggestion {0} was already accepted, rejected or revised")]
    Retired(SuggestionId),
    #[error("malformed suggestion payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T, E = SuggestionError> = std::result::Result<T, E>;

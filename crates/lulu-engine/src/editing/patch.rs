use crate::editing::Mutation;

/// Result of applying a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub changed: Vec<std::ops::Range<usize>>,
    pub new_selection: std::ops::Range<usize>,
    pub version: u64,
    /// The edit expressed as splices, based on the previous version
    pub mutation: Mutation,
}

use thiserror::Error;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A submitted transaction or check request is missing a required field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested index has not been committed.
    #[error("block {0} not found")]
    NotFound(u64),

    /// A record exists but does not decode into a well-formed block.
    #[error("block {index} is corrupt: {reason}")]
    Corrupt { index: u64, reason: String },

    #[error("chain length marker is corrupt: {0}")]
    CorruptLength(String),

    /// Blocks must be appended at exactly the current chain length.
    #[error("block {got} does not extend a chain of length {expected}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("failed to encode block: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend failed: {0}")]
    Backend(String),
}

impl LedgerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

use thiserror::Error;

/// Synchronous errors raised by pure, caller-facing core operations.
///
/// `CoreError` is the only error type the normalizer and kinematic transform
/// return — both are total over well-formed input, so the single variant
/// covers every way a caller can hand us something we cannot use.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// The caller supplied a point (or point list) that is structurally
    /// unrecognizable, missing coordinates, or carries a non-finite number.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

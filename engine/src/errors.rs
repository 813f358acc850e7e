// thiserror-based error types
use thiserror::Error;

/// The taxonomy C7 commands return. `OutOfRange` intentionally is *not* a
/// variant here: the specification treats it as a typed outcome on
/// `ChangeTemp`, not a failure (state is left unchanged and the caller is
/// told the current bound), so it travels in each command's own outcome
/// type instead of this error enum.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("room {room_id} not found")]
    NotFound { room_id: u32 },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable wire-facing discriminant, used by the binding layer to pick
    /// an HTTP-equivalent status and by `tracing` fields.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Precondition(_) => "PRECONDITION",
            EngineError::InvalidArgument(_) => "INVALID_ARGUMENT",
            EngineError::Internal(_) => "INTERNAL",
        }
    }
}

use crate::handles::HandleKind;
use thiserror::Error;

/// HAL status code reported when a handle cannot be allocated or resolved.
pub const HAL_HANDLE_ERROR: i32 = -1098;

/// HAL status code reported for out-of-range parameters.
pub const PARAMETER_OUT_OF_RANGE: i32 = -1028;

/// HAL error types.
///
/// Stale or unknown handles are not errors for most operations; they are
/// silently ignored because callers may legitimately race a free against a
/// pending call. Only allocation reports failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HalError {
    /// The handle registry has no free slots left.
    #[error("no free {kind} handles (capacity {capacity})")]
    HandleExhausted {
        /// Kind of handle that was requested.
        kind: HandleKind,
        /// Configured registry capacity.
        capacity: usize,
    },

    /// A raw handle value does not decode to a valid handle.
    #[error("invalid handle: {0:#010x}")]
    InvalidHandle(i32),

    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl HalError {
    /// Numeric HAL status code for callers that speak status integers.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Self::HandleExhausted { .. } | Self::InvalidHandle(_) => HAL_HANDLE_ERROR,
            Self::Config(_) => PARAMETER_OUT_OF_RANGE,
        }
    }
}

/// Convenience type alias for HAL operations.
pub type HalResult<T> = Result<T, HalError>;

//! Internal error type for invariant violations inside the scheduler.

/// Result type for operations that can only fail because of a bug.
///
/// User-facing problems (combinational loops, ambiguous aliases) have their
/// own error types in `tempo_sched`. `Err` here always means Tempo itself
/// broke an invariant.
pub type TempoResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Tempo, not a problem with the design.
#[derive(Debug, thiserror::Error)]
#[error("internal scheduler error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("order lost a block");
        assert_eq!(
            format!("{err}"),
            "internal scheduler error: order lost a block"
        );
    }

    #[test]
    fn err_path() {
        let r: TempoResult<i32> = Err(InternalError::new("test error"));
        let err = r.err().unwrap();
        assert_eq!(err.message, "test error");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}

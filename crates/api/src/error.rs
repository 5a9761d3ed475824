#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The operation exists on the interface but has no implementation.
    /// Callers act on success, so this is never downgraded to a silent no-op.
    #[error("Unsupported operation: {operation} on {element}")]
    UnsupportedOperation {
        operation: &'static str,
        element: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unsupported(operation: &'static str, element: impl Into<String>) -> Self {
        ApiError::UnsupportedOperation {
            operation,
            element: element.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ApiError::UnsupportedOperation { .. })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

use smaliscope_smali::StubCodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmaliscopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stub codec error: {0}")]
    Codec(#[from] StubCodecError),
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for SmaliscopeError {
    fn from(err: tokio::task::JoinError) -> Self {
        SmaliscopeError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SmaliscopeError>;

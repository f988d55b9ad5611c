use crate::domain_port::{StorageError, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no token found")]
    NoToken,
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    InvalidToken,
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("request timed out")]
    Timeout,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StorageError> for AuthError {
    fn from(error: StorageError) -> Self {
        AuthError::Store(error.to_string())
    }
}

impl From<TransportError> for AuthError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Network(e) => AuthError::NetworkError(e),
            TransportError::Timeout => AuthError::Timeout,
        }
    }
}

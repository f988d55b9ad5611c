use super::AuthError;
use crate::domain_port::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod code {
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const NO_TOKEN: &str = "NO_TOKEN";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const NO_REFRESH_TOKEN: &str = "NO_REFRESH_TOKEN";
    pub const REFRESH_FAILED: &str = "REFRESH_FAILED";
    pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";
    pub const NOT_SUPPORTED: &str = "NOT_SUPPORTED";
}

/// The one error shape every rejected operation reaches UI code in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} [{}]: {}", self.status, code, self.message),
            None => write!(f, "{}: {}", self.status, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.map(str::to_string),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message, Some(code::INTERNAL_ERROR))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(500, message, Some(code::MALFORMED_RESPONSE))
    }

    /// Normalizes an error response body of the form
    /// `{message?, code? | error?, details?}`.
    pub fn from_response(status: u16, body: &Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default_message(status).to_string());
        let code = body
            .get("code")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let details = body.get("details").filter(|d| !d.is_null()).cloned();
        Self {
            status,
            message,
            code,
            details,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_network_error(&self) -> bool {
        self.code.as_deref() == Some(code::NETWORK_ERROR)
    }
}

fn default_message(status: u16) -> &'static str {
    match status {
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        408 => "Request timeout. Please try again.",
        _ => "An error occurred",
    }
}

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Network(e) => ApiError {
                status: 0,
                message: "Network error. Please check your connection.".to_string(),
                code: Some(code::NETWORK_ERROR.to_string()),
                details: Some(Value::String(e)),
            },
            TransportError::Timeout => ApiError::new(
                408,
                "Request timeout. Please try again.",
                Some(code::TIMEOUT),
            ),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let message = error.to_string();
        match error {
            AuthError::NoToken => ApiError::new(401, message, Some(code::NO_TOKEN)),
            AuthError::TokenExpired => ApiError::new(401, message, Some(code::TOKEN_EXPIRED)),
            AuthError::InvalidToken => ApiError::new(401, message, Some(code::INVALID_TOKEN)),
            AuthError::NoRefreshToken => {
                ApiError::new(401, message, Some(code::NO_REFRESH_TOKEN))
            }
            AuthError::RefreshFailed(_) => ApiError::new(401, message, Some(code::REFRESH_FAILED)),
            AuthError::NetworkError(e) => TransportError::Network(e).into(),
            AuthError::Timeout => TransportError::Timeout.into(),
            AuthError::Unauthorized(_) => ApiError::new(401, message, Some(code::UNAUTHORIZED)),
            AuthError::Forbidden(_) => ApiError::new(403, message, Some(code::FORBIDDEN)),
            AuthError::Store(_) | AuthError::InternalError(_) => ApiError::internal(message),
        }
    }
}

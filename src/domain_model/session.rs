use super::DecodedToken;
use std::collections::BTreeSet;

/// Why a session failed validation. The display strings are meant for
/// diagnostics and stay distinct per failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No token found")]
    NoToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid token claims")]
    InvalidClaims,
}

/// Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub is_valid: bool,
    pub user: Option<DecodedToken>,
    pub error: Option<SessionError>,
}

impl Session {
    pub fn valid(user: DecodedToken) -> Self {
        Self {
            is_valid: true,
            user: Some(user),
            error: None,
        }
    }

    pub fn invalid(error: SessionError) -> Self {
        Self {
            is_valid: false,
            user: None,
            error: Some(error),
        }
    }

    /// The user, only when the session is valid.
    pub fn user(&self) -> Option<&DecodedToken> {
        if self.is_valid { self.user.as_ref() } else { None }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.map(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub permissions: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: String },
    Refreshed,
    LoggedOut,
    /// The session could not be recovered; the UI should navigate to `redirect_to`.
    Terminated { redirect_to: String, reason: String },
}

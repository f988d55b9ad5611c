use super::{Access, AccessRule, TokenManager};
use crate::domain_model::{Session, SessionError, SessionInfo};
use std::sync::Arc;

/// Session state derived on every call. The token manager already caches
/// decoded claims, so nothing is cached here.
pub struct SessionValidator {
    tokens: Arc<TokenManager>,
}

impl SessionValidator {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub async fn validate_session(&self) -> Session {
        let Some(token) = self.tokens.peek_access_token().await else {
            return Session::invalid(SessionError::NoToken);
        };
        let Some(user) = self.tokens.decode_token(&token) else {
            return Session::invalid(SessionError::InvalidToken);
        };
        if self.tokens.is_token_expired(&token) {
            // an older tier may still hold an unexpired token
            return match self.tokens.get_access_token().await {
                Some(fresh) if fresh != token => self.validate_token(&fresh),
                _ => Session::invalid(SessionError::TokenExpired),
            };
        }
        if !user.has_required_claims() {
            return Session::invalid(SessionError::InvalidClaims);
        }
        Session::valid(user)
    }

    fn validate_token(&self, token: &str) -> Session {
        match self.tokens.decode_token(token) {
            Some(user) if user.has_required_claims() => Session::valid(user),
            Some(_) => Session::invalid(SessionError::InvalidClaims),
            None => Session::invalid(SessionError::InvalidToken),
        }
    }

    pub async fn access(&self) -> Access {
        Access::for_user(self.validate_session().await.user())
    }

    pub async fn validate_role(&self, role: &str) -> bool {
        self.access().await.has_role(role)
    }

    pub async fn validate_permission(&self, permission: &str) -> bool {
        self.access().await.has_permission(permission)
    }

    pub async fn validate_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.access().await.has_any_permission(permissions)
    }

    pub async fn validate_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.access().await.has_all_permissions(permissions)
    }

    pub async fn validate_rule(&self, rule: &AccessRule) -> bool {
        self.access().await.evaluate(rule)
    }

    /// Empty when there is no decodable token. Does not check expiry.
    pub async fn session_info(&self) -> SessionInfo {
        let Some(token) = self.tokens.peek_access_token().await else {
            return SessionInfo::default();
        };
        match self.tokens.decode_token(&token) {
            Some(user) => SessionInfo {
                user_id: Some(user.id),
                role: Some(user.role),
                email: Some(user.email),
                permissions: user.permissions,
            },
            None => SessionInfo::default(),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The token pair handed out on login or refresh.
///
/// `expires_at` is the access token's expiry in epoch milliseconds and always
/// mirrors its decoded `exp` claim. The refresh token's own lifetime is
/// enforced by the issuer and by the cookie max-age, not tracked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Claims carried by an access token.
///
/// Missing string claims deserialize as empty strings so that a token with
/// incomplete claims can still be decoded and reported as such.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedToken {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Expiry in epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl DecodedToken {
    pub fn expires_at_millis(&self) -> Option<i64> {
        self.exp.map(|exp| exp.saturating_mul(1000))
    }

    /// `id`, `email` and `role` must all be present for a usable session.
    pub fn has_required_claims(&self) -> bool {
        !self.id.is_empty() && !self.email.is_empty() && !self.role.is_empty()
    }
}

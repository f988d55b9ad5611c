use super::{DevBackend, DevError};
use crate::application_port::UserProfile;
use crate::domain_model::DecodedToken;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reject;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl warp::reject::Reject for DevError {}

fn profile(claims: &DecodedToken) -> UserProfile {
    UserProfile {
        id: claims.id.clone(),
        name: claims.name.clone(),
        email: claims.email.clone(),
        role: claims.role.clone(),
        status: Some("active".to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds.
    pub expires_in: i64,
    pub user: UserProfile,
}

pub async fn login(
    body: LoginRequest,
    backend: Arc<DevBackend>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (tokens, claims) = backend
        .login(&body.email, &body.password)
        .map_err(reject::custom)?;

    let response = LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: backend.access_ttl().num_seconds(),
        user: profile(&claims),
    };
    Ok(warp::reply::json(&ApiResponse::ok(response, "Login successful")))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    backend: Arc<DevBackend>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = backend
        .refresh(&body.refresh_token)
        .map_err(reject::custom)?;

    let response = RefreshResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response, "Token refreshed successfully")))
}

pub async fn logout(
    bearer: Option<String>,
    backend: Arc<DevBackend>,
) -> Result<impl warp::Reply, warp::Rejection> {
    backend.logout(bearer.as_deref());
    Ok(warp::reply::json(&ApiResponse::ok((), "Logged out")))
}

pub async fn me(
    bearer: Option<String>,
    backend: Arc<DevBackend>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let claims = backend
        .authenticate(bearer.as_deref())
        .map_err(reject::custom)?;
    Ok(warp::reply::json(&ApiResponse::ok(claims, "OK")))
}

use super::DevError;
use serde::Serialize;
use std::convert::Infallible;
use tracing::warn;
use warp::http::StatusCode;
use warp::Rejection;

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    code: String,
}

/// Turns rejections into `{success: false, message, code}` with a matching
/// HTTP status.
pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message, code) = if let Some(e) = err.find::<DevError>() {
        let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, e.to_string(), e.code().to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string(), "NOT_FOUND".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string(), "BAD_REQUEST".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
            "METHOD_NOT_ALLOWED".to_string(),
        )
    } else {
        warn!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled error: {:?}", err),
            "INTERNAL_ERROR".to_string(),
        )
    };

    let json = warp::reply::json(&ErrorBody {
        success: false,
        message,
        code,
    });
    Ok(warp::reply::with_status(json, status))
}

use super::{DevBackend, handler};
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http};

pub fn routes(
    backend: Arc<DevBackend>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path!("auth" / "login"))
        .and(warp::body::json())
        .and(with(backend.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path!("auth" / "refresh"))
        .and(warp::body::json())
        .and(with(backend.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path!("auth" / "logout"))
        .and(bearer())
        .and(with(backend.clone()))
        .and_then(handler::logout);

    let me = warp::get()
        .and(warp::path!("api" / "me"))
        .and(bearer())
        .and(with(backend))
        .and_then(handler::me);

    login.or(refresh).or(logout).or(me)
}

fn with<T>(value: Arc<T>) -> impl Filter<Extract = (Arc<T>,), Error = Infallible> + Clone
where
    T: Send + Sync + ?Sized,
{
    warp::any().map(move || value.clone())
}

fn bearer() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).map(
        |header: Option<String>| {
            header.and_then(|value| value.strip_prefix("Bearer ").map(str::to_string))
        },
    )
}

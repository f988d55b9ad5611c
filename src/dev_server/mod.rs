//! A small issuing backend for local runs and end-to-end tests. It speaks the
//! same `/auth/*` contract the REST binding expects and guards `GET /api/me`
//! with real signature and expiry checks.

mod backend;
mod error;
mod handler;
mod router;

pub use backend::*;
pub use error::recover_error;
pub use router::routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

/// Binds to a free local port. The returned future runs the server.
pub fn bind_ephemeral(backend: Arc<DevBackend>) -> (SocketAddr, impl Future<Output = ()> + 'static) {
    let api = routes(backend).recover(recover_error);
    warp::serve(api).bind_ephemeral(([127, 0, 0, 1], 0))
}

/// Serves on `address` until `shutdown` resolves.
pub async fn serve(
    backend: Arc<DevBackend>,
    address: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) {
    let api = routes(backend).recover(recover_error);
    let (bound, server) = warp::serve(api).bind_with_graceful_shutdown(address, shutdown);
    tracing::info!("dev server listening on {}", bound);
    server.await;
}

mod api_error;
mod auth_api;
mod auth_error;

pub use api_error::*;
pub use auth_api::*;
pub use auth_error::*;

mod access_evaluator;
mod auth_api_fake;
mod auth_api_graphql;
mod auth_api_rest;
mod interceptor;
mod refresh_coordinator;
mod route_guard;
mod route_matcher;
mod session_events;
mod session_validator;
mod token_codec;
mod token_issuer;
mod token_manager;

#[cfg(test)]
pub(crate) mod testing;

pub use access_evaluator::*;
pub use auth_api_fake::*;
pub use auth_api_graphql::*;
pub use auth_api_rest::*;
pub use interceptor::*;
pub use refresh_coordinator::*;
pub use route_guard::*;
pub use route_matcher::*;
pub use session_events::*;
pub use session_validator::*;
pub use token_codec::*;
pub use token_issuer::*;
pub use token_manager::*;

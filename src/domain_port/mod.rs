// store

mod blob_store;
mod cookie_store;

pub use blob_store::*;
pub use cookie_store::*;

// transport

mod request_executor;

pub use request_executor::*;

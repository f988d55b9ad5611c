mod blob_store_redis;

pub use blob_store_redis::*;

mod blob_store_memory;
mod cookie_jar_memory;

pub use blob_store_memory::*;
pub use cookie_jar_memory::*;

mod blob_store_fs;

pub use blob_store_fs::*;

//! The three token storage tiers, fastest first.

mod cipher;
mod cookie_tier;
mod encrypted_tier;
mod memory_tier;

pub use cipher::*;
pub use cookie_tier::*;
pub use encrypted_tier::*;
pub use memory_tier::*;

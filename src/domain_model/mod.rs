pub mod permission;
mod role;
mod session;
mod token;

pub use role::*;
pub use session::*;
pub use token::*;

mod session_store;
pub mod transcript;

pub use session_store::*;

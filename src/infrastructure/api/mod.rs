mod ai_config;
mod auth;
mod chats;
mod messages;

pub use ai_config::*;
pub use auth::*;
pub use chats::*;
pub use messages::*;

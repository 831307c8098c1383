mod ai_config;
mod chat;
mod event;
mod message;
mod request;
mod session;
mod token_pair;
mod user;

pub use ai_config::*;
pub use chat::*;
pub use event::*;
pub use message::*;
pub use request::*;
pub use session::*;
pub use token_pair::*;
pub use user::*;

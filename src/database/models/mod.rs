pub mod account;
pub mod chat;

pub use account::{Account, ContactRequest, SourceContent, UserConfig, UserConfigPatch};
pub use chat::{ChatMessage, ChatRecord};

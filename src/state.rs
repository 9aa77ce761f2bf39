use std::sync::Arc;

use crate::auth::SessionKeys;
use crate::backend::BackendClient;
use crate::database::{AccountStore, ChatStore};
use crate::relay::Relay;

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub chats: Arc<dyn ChatStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub relay: Relay,
    pub backend: BackendClient,
    pub keys: SessionKeys,
    /// Cookie consulted when no bearer token is sent
    pub session_cookie: String,
    pub default_free_searches: i32,
}

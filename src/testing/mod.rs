//! In-memory stores and session helpers for unit and router tests.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{Claims, SessionKeys};
use crate::backend::BackendClient;
use crate::database::models::{Account, ChatRecord, ContactRequest, SourceContent, UserConfig, UserConfigPatch};
use crate::database::{AccountStore, ChatStore, DatabaseError};
use crate::relay::Relay;
use crate::state::AppState;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_AUDIENCE: &str = "authenticated";

#[derive(Debug, Default)]
struct Tables {
    chats: Vec<ChatRecord>,
    accounts: HashMap<Uuid, Account>,
    configs: HashMap<Uuid, UserConfig>,
    sources: Vec<(Uuid, String, SourceContent)>,
    contacts: Vec<ContactRequest>,
}

/// `ChatStore` + `AccountStore` backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn with_account(self, account: Account) -> Self {
        self.lock().accounts.insert(account.id, account);
        self
    }

    pub fn sources(&self) -> Vec<(Uuid, String, SourceContent)> {
        self.lock().sources.clone()
    }

    pub fn contacts(&self) -> Vec<ContactRequest> {
        self.lock().contacts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn upsert_chat(&self, record: &ChatRecord) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        match tables.chats.iter_mut().find(|c| c.id == record.id) {
            Some(existing) if existing.user_id == record.user_id => *existing = record.clone(),
            Some(_) => return Err(DatabaseError::ChatOwned(record.id.clone())),
            None => tables.chats.push(record.clone()),
        }
        Ok(())
    }

    async fn get_chat(&self, user_id: Uuid, chat_id: &str) -> Result<Option<ChatRecord>, DatabaseError> {
        Ok(self.lock().chats.iter().find(|c| c.id == chat_id && c.user_id == user_id).cloned())
    }

    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatRecord>, DatabaseError> {
        let mut chats: Vec<ChatRecord> = self
            .lock()
            .chats
            .iter()
            .filter(|c| c.user_id == user_id && !c.is_newsletter)
            .cloned()
            .collect();
        chats.sort_by(|a, b| {
            let created = |c: &ChatRecord| c.payload["createdAt"].as_str().unwrap_or_default().to_string();
            created(b).cmp(&created(a))
        });
        Ok(chats)
    }

    async fn delete_chat(&self, user_id: Uuid, chat_id: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.lock();
        let before = tables.chats.len();
        tables.chats.retain(|c| !(c.id == chat_id && c.user_id == user_id));
        Ok(tables.chats.len() < before)
    }

    async fn clear_chats(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let mut tables = self.lock();
        let before = tables.chats.len();
        tables.chats.retain(|c| c.user_id != user_id);
        Ok((before - tables.chats.len()) as u64)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, user_id: Uuid) -> Result<Option<Account>, DatabaseError> {
        Ok(self.lock().accounts.get(&user_id).cloned())
    }

    async fn consume_free_search(&self, user_id: Uuid) -> Result<Option<i32>, DatabaseError> {
        let mut tables = self.lock();
        Ok(tables.accounts.get_mut(&user_id).map(|account| {
            let remaining = (account.free_searches_remaining.unwrap_or(0) - 1).max(0);
            account.free_searches_remaining = Some(remaining);
            remaining
        }))
    }

    async fn get_user_config(&self, user_id: Uuid) -> Result<Option<UserConfig>, DatabaseError> {
        Ok(self.lock().configs.get(&user_id).cloned())
    }

    async fn upsert_user_config(&self, user_id: Uuid, patch: UserConfigPatch) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        let config = tables
            .configs
            .entry(user_id)
            .or_insert_with(|| UserConfig { user_id, ..Default::default() });
        patch.apply(config);
        Ok(())
    }

    async fn insert_source_contents(
        &self,
        user_id: Uuid,
        chat_id: &str,
        sources: Vec<SourceContent>,
    ) -> Result<u64, DatabaseError> {
        let count = sources.len() as u64;
        let mut tables = self.lock();
        tables.sources.extend(sources.into_iter().map(|s| (user_id, chat_id.to_string(), s)));
        Ok(count)
    }

    async fn insert_contact(&self, contact: ContactRequest) -> Result<(), DatabaseError> {
        self.lock().contacts.push(contact);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub fn test_keys() -> SessionKeys {
    SessionKeys::new(TEST_SECRET, TEST_AUDIENCE).expect("test keys")
}

/// Bearer token for `user_id`, valid for an hour
pub fn bearer(user_id: Uuid, email: Option<&str>) -> String {
    let claims = Claims::new(user_id, email.map(str::to_string), TEST_AUDIENCE, chrono::Duration::hours(1));
    format!("Bearer {}", test_keys().issue(&claims).expect("issue test token"))
}

/// Nothing listens here; routes that reach the backend fail fast
pub const UNREACHABLE: &str = "127.0.0.1:9";

/// Application state over `store`, with the backend at the given addresses
pub fn test_state(store: Arc<MemoryStore>, ws_url: &str, http_url: &str) -> AppState {
    AppState {
        chats: store.clone(),
        accounts: store.clone(),
        relay: Relay::new(ws_url, Duration::from_secs(2), 8, store),
        backend: BackendClient::new(http_url, Duration::from_secs(5)).expect("backend client"),
        keys: test_keys(),
        session_cookie: "sb-access-token".to_string(),
        default_free_searches: 5,
    }
}

pub fn offline_state(store: Arc<MemoryStore>) -> AppState {
    test_state(store, &format!("ws://{}/ws", UNREACHABLE), &format!("http://{}", UNREACHABLE))
}

/// Drive `app` with one request and collect the whole response
pub async fn call(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("read response body");
    (parts.status, parts.headers, bytes)
}

/// Like [`call`], decoding the body as JSON (`Null` when empty)
pub async fn call_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, bytes) = call(app, request).await;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("JSON body") };
    (status, body)
}

/// Request with an optional session and JSON body
pub fn request(method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", bearer(user, Some("analyst@example.com")));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

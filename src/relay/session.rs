use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event::{EventKind, UpstreamEvent};
use super::task::TaskRequest;
use super::RelayError;
use crate::config::BackendConfig;
use crate::database::models::{ChatMessage, ChatRecord};
use crate::database::ChatStore;

type BackendSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Chunks destined for the HTTP response body, in arrival order
pub type RelayStream = ReceiverStream<Result<String, RelayError>>;

/// Where the accumulated report is saved once the relay finishes
#[derive(Debug, Clone)]
pub struct PersistTarget {
    pub chat_id: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct RelayJob {
    pub task: TaskRequest,
    pub persist: Option<PersistTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Backend closed the socket or signalled completion
    Closed,
    /// HTTP client went away first
    Cancelled,
    /// Connect, send or receive failed
    Failed,
}

/// Single-hop relay from the research backend socket to an HTTP stream.
///
/// One socket per job, no reconnect. Report output is accumulated and, if the
/// job carries a [`PersistTarget`], upserted as a chat before the HTTP stream
/// is closed.
#[derive(Clone)]
pub struct Relay {
    url: String,
    connect_timeout: Duration,
    buffer: usize,
    chats: Arc<dyn ChatStore>,
}

impl Relay {
    pub fn new(url: impl Into<String>, connect_timeout: Duration, buffer: usize, chats: Arc<dyn ChatStore>) -> Self {
        Self { url: url.into(), connect_timeout, buffer: buffer.max(1), chats }
    }

    pub fn from_config(config: &BackendConfig, chats: Arc<dyn ChatStore>) -> Self {
        Self::new(
            config.ws_url.clone(),
            Duration::from_secs(config.connect_timeout_secs),
            config.relay_buffer,
            chats,
        )
    }

    /// Spawn the relay and hand back the stream for the response body.
    /// Dropping the stream cancels the relay.
    pub fn start(&self, job: RelayJob) -> RelayStream {
        let (tx, rx) = mpsc::channel(self.buffer);
        let relay = self.clone();
        tokio::spawn(async move {
            let outcome = relay.run(job, tx).await;
            debug!("Relay finished: {:?}", outcome);
        });
        ReceiverStream::new(rx)
    }

    pub async fn run(&self, job: RelayJob, tx: mpsc::Sender<Result<String, RelayError>>) -> RelayOutcome {
        let connected = tokio::select! {
            _ = tx.closed() => {
                debug!("HTTP client went away before the backend answered");
                return RelayOutcome::Cancelled;
            }
            connected = self.connect() => connected,
        };
        let mut socket = match connected {
            Ok(socket) => socket,
            Err(e) => {
                warn!("Relay connect to {} failed: {}", self.url, e);
                let _ = tx.send(Err(e)).await;
                return RelayOutcome::Failed;
            }
        };
        info!("Relay connected to {} (report_type={})", self.url, job.task.report_type);

        let payload = match serde_json::to_string(&job.task) {
            Ok(payload) => payload,
            Err(e) => {
                let _ = tx.send(Err(e.into())).await;
                let _ = socket.close(None).await;
                return RelayOutcome::Failed;
            }
        };
        if tx.is_closed() {
            let _ = socket.close(None).await;
            return RelayOutcome::Cancelled;
        }
        if let Err(e) = socket.send(Message::Text(payload)).await {
            warn!("Relay failed to send task: {}", e);
            let _ = tx.send(Err(RelayError::Socket(e))).await;
            return RelayOutcome::Failed;
        }

        let mut accumulated = String::new();
        let outcome = loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!("HTTP client went away, closing backend socket");
                    let _ = socket.close(None).await;
                    break RelayOutcome::Cancelled;
                }
                frame = socket.next() => match frame {
                    None | Some(Ok(Message::Close(_))) => break RelayOutcome::Closed,
                    Some(Ok(Message::Text(text))) => {
                        let event = match UpstreamEvent::parse(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                warn!("Skipping non-JSON backend message: {}", e);
                                continue;
                            }
                        };

                        match event.kind() {
                            kind if kind.is_forwarded() => {
                                if *kind == EventKind::Report {
                                    accumulated.push_str(&event.output_text());
                                }
                                debug!("Forwarding {:?} event", kind);
                                if tx.send(Ok(event.to_chunk())).await.is_err() {
                                    let _ = socket.close(None).await;
                                    break RelayOutcome::Cancelled;
                                }
                            }
                            EventKind::Complete => {
                                let _ = socket.close(None).await;
                                break RelayOutcome::Closed;
                            }
                            EventKind::Error => {
                                warn!("Research backend reported an error: {}", event.message().unwrap_or("unknown"));
                            }
                            other => debug!("Ignoring {:?} event", other),
                        }
                    }
                    // Ping/pong are answered by tungstenite; binary frames carry nothing for us
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Research backend socket error: {}", e);
                        let _ = tx.send(Err(RelayError::Socket(e))).await;
                        break RelayOutcome::Failed;
                    }
                }
            }
        };
        info!("Relay socket closed ({:?}, {} bytes of report)", outcome, accumulated.len());

        if outcome != RelayOutcome::Failed && !accumulated.is_empty() {
            if let Some(target) = &job.persist {
                self.persist(target, &job.task, accumulated, outcome, &tx).await;
            }
        }

        // Dropping `tx` here ends the HTTP stream
        outcome
    }

    async fn connect(&self) -> Result<BackendSocket, RelayError> {
        match tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
            Ok(Ok((socket, _response))) => Ok(socket),
            Ok(Err(e)) => Err(RelayError::Connect(e)),
            Err(_) => Err(RelayError::ConnectTimeout(self.connect_timeout)),
        }
    }

    async fn persist(
        &self,
        target: &PersistTarget,
        task: &TaskRequest,
        accumulated: String,
        outcome: RelayOutcome,
        tx: &mpsc::Sender<Result<String, RelayError>>,
    ) {
        let record = ChatRecord::with_completion(
            target.chat_id.clone(),
            target.user_id,
            vec![ChatMessage::user(task.task.clone())],
            accumulated,
            Utc::now(),
        );

        match self.chats.upsert_chat(&record).await {
            Ok(()) => info!("Saved chat {} for user {}", target.chat_id, target.user_id),
            Err(e) => {
                tracing::error!("Failed to save chat {}: {}", target.chat_id, e);
                if outcome == RelayOutcome::Closed {
                    let _ = tx.send(Err(RelayError::Persist(e))).await;
                }
            }
        }
    }
}

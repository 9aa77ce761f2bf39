//! Streaming relay between the research backend's websocket and HTTP clients.
//!
//! The backend speaks JSON text frames tagged with a `type`. `report` and
//! `logs` frames are re-emitted to the HTTP client as one JSON object per
//! chunk (see [`event::CHUNK_DELIMITER`]); report text is accumulated and
//! optionally saved as a chat when the socket closes.

pub mod event;
pub mod session;
pub mod task;

use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::database::DatabaseError;

pub use event::{EventKind, UpstreamEvent, CHUNK_DELIMITER};
pub use session::{PersistTarget, Relay, RelayJob, RelayOutcome, RelayStream};
pub use task::TaskRequest;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("could not connect to research backend: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("timed out connecting to research backend after {0:?}")]
    ConnectTimeout(Duration),

    #[error("research backend socket error: {0}")]
    Socket(#[source] tungstenite::Error),

    #[error("failed to encode task: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to save chat: {0}")]
    Persist(#[source] DatabaseError),
}

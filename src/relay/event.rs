use serde_json::{json, Map, Value};

/// Separator written after every JSON object in the HTTP stream
pub const CHUNK_DELIMITER: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Report text; forwarded and accumulated
    Report,
    /// Progress output; forwarded as-is
    Logs,
    /// Backend finished the task
    Complete,
    Error,
    Other(String),
}

impl EventKind {
    fn from_type(kind: Option<&str>) -> Self {
        match kind {
            Some("report") => EventKind::Report,
            Some("logs") => EventKind::Logs,
            Some("complete") => EventKind::Complete,
            Some("error") => EventKind::Error,
            Some(other) => EventKind::Other(other.to_string()),
            None => EventKind::Other(String::new()),
        }
    }

    pub fn is_forwarded(&self) -> bool {
        matches!(self, EventKind::Report | EventKind::Logs)
    }
}

/// One JSON message received from the research backend socket
#[derive(Debug, Clone)]
pub struct UpstreamEvent {
    kind: EventKind,
    body: Map<String, Value>,
}

impl UpstreamEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let body: Map<String, Value> = serde_json::from_str(text)?;
        let kind = EventKind::from_type(body.get("type").and_then(Value::as_str));
        Ok(Self { kind, body })
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// The `output` field as text. Non-string outputs are rendered as JSON.
    pub fn output_text(&self) -> String {
        match self.body.get("output") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Message text of an upstream `error` event, if any
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Encode for the HTTP stream. Report events are reduced to `type` and
    /// `output`; everything else passes through unchanged.
    pub fn to_chunk(&self) -> String {
        let value = match self.kind {
            EventKind::Report => json!({
                "type": "report",
                "output": self.body.get("output").cloned().unwrap_or(Value::Null),
            }),
            _ => Value::Object(self.body.clone()),
        };

        let mut chunk = value.to_string();
        chunk.push_str(CHUNK_DELIMITER);
        chunk
    }
}

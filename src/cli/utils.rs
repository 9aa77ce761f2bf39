use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::relay::CHUNK_DELIMITER;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
                body.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Splits a relay byte stream back into JSON events.
///
/// Chunk boundaries on the wire need not line up with event boundaries, so
/// partial input is buffered until its delimiter arrives.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: Vec<u8>,
}

impl ChunkDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(bytes);
        let delimiter = CHUNK_DELIMITER.as_bytes();

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(delimiter.len()).position(|w| w == delimiter) {
            let chunk: Vec<u8> = self.buffer.drain(..end + delimiter.len()).collect();
            let chunk = &chunk[..end];
            if chunk.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice(chunk) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!("Skipping undecodable chunk: {}", e),
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_split_chunks() {
        let mut decoder = ChunkDecoder::default();
        assert!(decoder.push(br#"{"type":"report","out"#).is_empty());

        let events = decoder.push(b"put\":\"a\"}\n\n{\"type\":\"logs\"}\n\n{\"type\"");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["output"], "a");
        assert_eq!(events[1]["type"], "logs");

        let events = decoder.push(b":\"report\",\"output\":\"b\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["output"], "b");
    }
}

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

pub const RECORD_PREFIX: &str = "data: ";
pub const RECORD_TERMINATOR: &str = "\n\n";

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("record does not start with `data:`")]
    MissingPrefix,

    #[error("record is not terminated by a blank line")]
    MissingTerminator,

    #[error("record payload is not a JSON string: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("record is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Serializes fragments into event-stream records, one record per fragment
pub struct EventFramer;

impl EventFramer {
    /// `data: <json string>\n\n`. JSON string encoding escapes newlines and
    /// control characters, so a fragment can never end a record early.
    pub fn frame(fragment: &str) -> Bytes {
        let encoded = Value::from(fragment).to_string();
        let mut record =
            String::with_capacity(RECORD_PREFIX.len() + encoded.len() + RECORD_TERMINATOR.len());
        record.push_str(RECORD_PREFIX);
        record.push_str(&encoded);
        record.push_str(RECORD_TERMINATOR);
        Bytes::from(record)
    }
}

/// Decode one complete record back to its fragment
pub fn decode_record(record: &str) -> Result<String, FrameError> {
    let body = record
        .strip_suffix(RECORD_TERMINATOR)
        .ok_or(FrameError::MissingTerminator)?;
    let payload = body
        .strip_prefix("data:")
        .ok_or(FrameError::MissingPrefix)?;
    Ok(serde_json::from_str::<String>(payload.trim_start())?)
}

/// Incremental decoder for a record stream that may arrive split at arbitrary
/// byte boundaries, as a browser reader sees it.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    buffer: Vec<u8>,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every fragment completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FrameError> {
        self.buffer.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(end) = find_terminator(&self.buffer) {
            let record: Vec<u8> = self.buffer.drain(..end + RECORD_TERMINATOR.len()).collect();
            // the terminator is ascii, so a record boundary never splits a utf-8 sequence
            let record = String::from_utf8(record)?;
            fragments.push(decode_record(&record)?);
        }
        Ok(fragments)
    }

    /// True when no partial record is buffered
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(RECORD_TERMINATOR.len())
        .position(|window| window == RECORD_TERMINATOR.as_bytes())
}

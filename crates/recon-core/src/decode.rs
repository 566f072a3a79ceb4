//! Provider payload decoding
//!
//! Agent runtimes hand back the model output in several shapes depending on
//! transport and SDK: a streamed list of byte chunks, a single payload object,
//! or plain text. Every chunk shape is a variant of [`PayloadChunk`]; this module
//! is the only place that knows about them. Callers get text.

use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

/// Top-level response body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    /// `{"response": [chunk, ...]}` or `{"response": chunk}`
    Streamed { response: ChunkStream },
    /// `{"payload": chunk}`
    Direct { payload: PayloadChunk },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChunkStream {
    Many(Vec<PayloadChunk>),
    One(PayloadChunk),
}

/// One piece of streamed output
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PayloadChunk {
    /// Node-style serialized buffer: `{"type": "Buffer", "data": [..]}`
    Buffer {
        #[serde(rename = "type")]
        kind: BufferTag,
        data: Vec<u8>,
    },
    /// `{"bytes": ...}`
    Bytes { bytes: ChunkBytes },
    /// `{"chunk": {"bytes": ...}}`
    Nested { chunk: NestedChunk },
    /// Bare byte array
    Raw(Vec<u8>),
    Text(String),
    /// Anything else is kept as its JSON text
    Other(Value),
}

#[derive(Debug, Deserialize)]
pub enum BufferTag {
    Buffer,
}

#[derive(Debug, Deserialize)]
pub struct NestedChunk {
    pub bytes: ChunkBytes,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChunkBytes {
    Array(Vec<u8>),
    /// Base64 when it decodes to UTF-8, literal text otherwise
    Encoded(String),
}

impl ChunkBytes {
    fn to_bytes(&self) -> Vec<u8> {
        match self {
            ChunkBytes::Array(bytes) => bytes.clone(),
            ChunkBytes::Encoded(s) => base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .ok()
                .filter(|bytes| std::str::from_utf8(bytes).is_ok())
                .unwrap_or_else(|| s.as_bytes().to_vec()),
        }
    }
}

impl PayloadChunk {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PayloadChunk::Buffer { data, .. } => data.clone(),
            PayloadChunk::Bytes { bytes } => bytes.to_bytes(),
            PayloadChunk::Nested { chunk } => chunk.bytes.to_bytes(),
            PayloadChunk::Raw(bytes) => bytes.clone(),
            PayloadChunk::Text(s) => s.as_bytes().to_vec(),
            PayloadChunk::Other(value) => value.to_string().into_bytes(),
        }
    }
}

/// Concatenate chunks in order. Bytes are joined before UTF-8 decoding, so a
/// character split across chunks survives; invalid sequences are replaced.
pub fn decode_chunks(chunks: &[PayloadChunk]) -> String {
    let bytes: Vec<u8> = chunks.iter().flat_map(PayloadChunk::to_bytes).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Decode a provider response body to the model's text output
pub fn decode_payload(body: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return body.to_string(),
    };

    match value {
        // A JSON string literal wrapping the output
        Value::String(text) => text,
        Value::Object(_) => match Envelope::deserialize(&value) {
            Ok(Envelope::Streamed {
                response: ChunkStream::Many(chunks),
            }) => decode_chunks(&chunks),
            Ok(Envelope::Streamed {
                response: ChunkStream::One(chunk),
            })
            | Ok(Envelope::Direct { payload: chunk }) => {
                String::from_utf8_lossy(&chunk.to_bytes()).into_owned()
            }
            Err(_) => body.to_string(),
        },
        _ => body.to_string(),
    }
}

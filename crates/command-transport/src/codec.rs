use crate::{Handshake, Result, TransportError};

/// Decodes a handshake; a trailing newline is allowed.
pub fn decode_handshake(bytes: &[u8]) -> Result<Handshake> {
    serde_json::from_slice(bytes)
        .map_err(|e| TransportError::MalformedHandshake(e.to_string()))
}

/// Encodes a handshake as one newline-terminated JSON line.
pub fn encode_handshake(handshake: &Handshake) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec(handshake)
        .map_err(|e| TransportError::MalformedHandshake(e.to_string()))?;
    out.push(b'\n');
    Ok(out)
}

/// Frames one recognition result. The frame, newline included, must be
/// shorter than `max_len`.
pub fn encode_result(text: &str, max_len: usize) -> Result<Vec<u8>> {
    let len = text.len() + 1;
    if len >= max_len {
        return Err(TransportError::PayloadTooLarge { len, max: max_len });
    }
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(text.as_bytes());
    out.push(b'\n');
    Ok(out)
}

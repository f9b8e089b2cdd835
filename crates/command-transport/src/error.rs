use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("port {0} already in use")]
    PortInUse(u16),
    #[error("no client connected within {0:?}")]
    IdleTimeout(Duration),
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),
    #[error("handshake exceeds {0} bytes")]
    HandshakeTooLarge(usize),
    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

//! command-transport: loopback transport between a game client and the voice host
//!
//! A client connects, sends one JSON [`Handshake`] line carrying its phrases
//! and sentences, and then receives one newline-terminated line per
//! recognized command.

mod types;
pub use types::{
    Handshake, ServerConfig, API_VERSION, DEFAULT_IDLE_TIMEOUT, DEFAULT_PORT, MAX_HANDSHAKE_LEN,
    MAX_PAYLOAD_LEN, MIN_API_VERSION,
};

mod error;
pub use error::{Result, TransportError};

mod codec;
pub use codec::{decode_handshake, encode_handshake, encode_result};

pub mod server;
pub use server::{accept_client, bind, split, ClientReader, ResultWriter};

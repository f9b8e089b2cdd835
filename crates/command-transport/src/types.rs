use std::time::Duration;

use command_grammar::VocabularyEntry;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 9856;
/// Result frames must stay strictly below this many bytes.
pub const MAX_PAYLOAD_LEN: usize = 4096;
pub const MAX_HANDSHAKE_LEN: usize = 4 * 1024 * 1024;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bumped on any change to the handshake or result format.
pub const API_VERSION: u32 = 1;
/// Oldest client version this host still understands.
pub const MIN_API_VERSION: u32 = 1;

/// First and only message a client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub phrases: Vec<VocabularyEntry>,
    pub sentences: Vec<String>,
    #[serde(default = "current_api_version")]
    pub api_version: u32,
    #[serde(default = "current_min_api_version")]
    pub min_api_version: u32,
}

fn current_api_version() -> u32 {
    API_VERSION
}

fn current_min_api_version() -> u32 {
    MIN_API_VERSION
}

impl Handshake {
    pub fn new(phrases: Vec<VocabularyEntry>, sentences: Vec<String>) -> Self {
        Self {
            phrases,
            sentences,
            api_version: API_VERSION,
            min_api_version: MIN_API_VERSION,
        }
    }

    /// Whether each side is at least as new as the other requires.
    pub fn is_compatible(&self) -> bool {
        self.api_version >= MIN_API_VERSION && self.min_api_version <= API_VERSION
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT.as_secs()
}

fn default_max_payload_len() -> usize {
    MAX_PAYLOAD_LEN
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            idle_timeout_secs: default_idle_timeout_secs(),
            max_payload_len: default_max_payload_len(),
        }
    }
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

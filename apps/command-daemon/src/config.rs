use anyhow::{Context, Result};
use command_transport::ServerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use voice_local::RecognizerConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

impl DaemonConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing config: {}", path.display()))
    }

    /// Loads `path` if given, otherwise starts from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

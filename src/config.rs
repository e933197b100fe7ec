//! Settings loaded from a TOML file with environment overrides.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::agent::AgentConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8095".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory for the database and working files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Explicit database path; defaults to `<data_dir>/curator.db`
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: None,
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults when the
    /// file is absent, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("CURATOR_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("curator.toml"));

        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            Self::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("CURATOR_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(db) = env::var("CURATOR_DATABASE") {
            self.database = Some(PathBuf::from(db));
        }
        if let Ok(endpoint) = env::var("CURATOR_AGENT_ENDPOINT") {
            self.agent.endpoint = endpoint;
        }
        if let Ok(key) = env::var("CURATOR_AGENT_API_KEY") {
            self.agent.api_key = key;
        }
        if let Ok(bind) = env::var("CURATOR_BIND") {
            self.server.bind = bind;
        }
    }

    /// Resolved database path.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("curator.db"))
    }
}

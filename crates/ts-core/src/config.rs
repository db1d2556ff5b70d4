use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use ts_protocol::AgentCapabilities;

const API_KEY_ENV: &str = "THINKSTREAM_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub agents: Vec<AgentConfig>,
    pub prefs: PrefsConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Agent URL used when an agent entry has none.
    pub base_url: String,
    /// Command to run to get the API key (e.g., "pass show thinkstream").
    /// The command is run via `sh -c`.
    pub api_key_cmd: Option<String>,
    pub connect_timeout_secs: u64,
    /// Locales sent when creating a session.
    pub locales: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key_cmd: None,
            connect_timeout_secs: 10,
            locales: vec!["en".to_string()],
        }
    }
}

impl ClientConfig {
    /// Resolve the API key from api_key_cmd or the THINKSTREAM_API_KEY env var.
    /// Agents may be unauthenticated, so no key is not an error.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        if let Some(cmd) = &self.api_key_cmd {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;

            if output.status.success() {
                let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !key.is_empty() {
                    return Ok(Some(key));
                }
            }
            tracing::warn!(cmd, "api_key_cmd produced no key, trying {API_KEY_ENV}");
        }

        Ok(std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty()))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub id: String,
    /// Falls back to `client.base_url`.
    pub url: Option<String>,
    /// Agent offers the reasoning endpoints.
    pub reasoning: bool,
    /// Agent accepts audio for transcription.
    pub audio: bool,
}

impl AgentConfig {
    pub fn capabilities(&self) -> AgentCapabilities {
        AgentCapabilities {
            reasoning: self.reasoning,
            audio: self.audio,
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrefsConfig {
    /// Custom preference file. Defaults to ~/.local/share/thinkstream/preferences.json.
    pub path: Option<String>,
}

impl PrefsConfig {
    /// Resolve the preference file, using the configured path or the XDG default.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(ref custom) = self.path {
            return PathBuf::from(custom);
        }

        let base = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".local").join("share")
            });
        base.join("thinkstream").join("preferences.json")
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn load_or_default() -> Self {
        let path = config_path();
        if !path.exists() {
            return Config::default();
        }
        Config::load(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "using default config");
            Config::default()
        })
    }

    /// Look up an agent by id, or the first configured agent when `id` is
    /// `None`. The returned entry always has its URL filled in.
    pub fn agent(&self, id: Option<&str>) -> Result<AgentConfig, ConfigError> {
        let found = match id {
            Some(id) => self
                .agents
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownAgent(id.to_string()))?,
            None => self.agents.first().cloned().unwrap_or_else(|| AgentConfig {
                id: "default".to_string(),
                ..AgentConfig::default()
            }),
        };

        Ok(AgentConfig {
            url: Some(
                found
                    .url
                    .clone()
                    .unwrap_or_else(|| self.client.base_url.clone()),
            ),
            ..found
        })
    }
}

fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("thinkstream").join("config.toml")
}

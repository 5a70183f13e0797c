//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for herald
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation endpoint URL
    pub endpoint: Option<String>,
    /// Capability tier sent as `aiModel`
    pub ai_model: Option<String>,
    /// Let the service consult external knowledge
    pub use_grounding: Option<bool>,
    /// Persona definition file (TOML); the built-in persona is used if unset
    pub persona_file: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("herald")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("HERALD_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            endpoint: Some(herald_wire::client::DEFAULT_ENDPOINT.to_string()),
            ai_model: Some(herald_wire::request::DEFAULT_AI_MODEL.to_string()),
            use_grounding: Some(false),
            persona_file: None,
        };

        default_config.save_to(&path)?;
        Ok(path)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# herald configuration file
# Place at ~/.config/herald/config.toml (Linux), ~/Library/Application Support/herald/config.toml (Mac)
# or %APPDATA%\herald\config.toml (Windows), or point HERALD_CONFIG_PATH at it.

# Streaming chat endpoint
endpoint = "http://localhost:3000/api/chat-stream"

# Capability tier requested from the service
ai_model = "smart"

# Allow the service to look things up (keeps answers historical when false)
use_grounding = false

# Persona definition (optional, defaults to the built-in Napoleon persona)
# persona_file = "~/.config/herald/personas/cleopatra.toml"
"#
}

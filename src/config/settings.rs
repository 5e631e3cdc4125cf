//! Configuration settings for GeoAware.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where images shown to the user are written.
    pub temp_dir: String,
    /// Log level used when neither `-v` nor `RUST_LOG` is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/geoaware".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Model backend selection and per-backend generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Backend to use (gemini, azure).
    pub backend: String,
    /// Deadline for one model round trip, in seconds. 0 disables it.
    pub request_timeout_secs: u64,
    pub gemini: GeminiSettings,
    pub azure: AzureSettings,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            request_timeout_secs: 120,
            gemini: GeminiSettings::default(),
            azure: AzureSettings::default(),
        }
    }
}

impl ModelSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.request_timeout_secs)
    }
}

/// Google Gemini settings. The API key is read from `GEMINI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// API base URL.
    pub endpoint: String,
    /// Model name, e.g. gemini-1.5-flash.
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// Azure OpenAI settings.
///
/// Credentials are read from `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`
/// and `AZURE_API_VERSION`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    /// Deployment name of the chat model.
    pub deployment: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            deployment: "gpt-4o".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Turn cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Surface tool failures instead of masking them.
    pub debug: bool,
    /// Deadline for a single tool invocation, in seconds. 0 disables it.
    pub tool_timeout_secs: u64,
    /// Turns the chat loop may run without user input.
    pub max_auto_turns: usize,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            debug: false,
            tool_timeout_secs: 60,
            max_auto_turns: 5,
            system_prompt: None,
        }
    }
}

impl AgentSettings {
    pub fn tool_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.tool_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_raw_value(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(raw.to_string())
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GeoAwareError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Return a copy with the dotted `key` (e.g. `model.backend`) set to `raw`.
    ///
    /// Booleans and numbers are recognized; anything else is stored as a string.
    pub fn with_value(&self, key: &str, raw: &str) -> crate::error::Result<Self> {
        let config_err = |msg: String| crate::error::GeoAwareError::Config(msg);

        let mut root =
            toml::Value::try_from(self).map_err(|e| config_err(e.to_string()))?;

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        let mut node = &mut root;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                node = node
                    .get_mut(part)
                    .ok_or_else(|| config_err(format!("Unknown configuration section: {}", part)))?;
            }
        }
        node.as_table_mut()
            .ok_or_else(|| config_err(format!("Not a configuration section: {}", key)))?
            .insert(leaf.to_string(), parse_raw_value(raw));

        let updated: Settings = root.try_into()?;

        // Unknown keys are dropped by deserialization; make sure ours stuck.
        let check = toml::Value::try_from(&updated).map_err(|e| config_err(e.to_string()))?;
        let found = key
            .split('.')
            .try_fold(&check, |node, part| node.get(part))
            .is_some();
        if !found {
            return Err(config_err(format!("Unknown configuration key: {}", key)));
        }
        Ok(updated)
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("geoaware")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Tracing filter for this crate. `-v` flags override `general.log_level`.
    pub fn log_directive(&self, verbose: u8) -> String {
        let level = match verbose {
            0 => self.general.log_level.as_str(),
            1 => "debug",
            _ => "trace",
        };
        format!("geoaware={}", level)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

//! Model client adapters.
//!
//! Both hosted backends are normalized to one contract: given the
//! transcript, produce a [`Completion`] whose first choice carries the
//! model's raw reply text.

mod azure;
mod gemini;

pub use azure::{AzureModel, AzureModelConfig};
pub use gemini::{GeminiModel, GeminiModelConfig};

use crate::chat::ChatMessage;
use crate::config::ModelSettings;
use crate::error::{GeoAwareError, Result};
use async_trait::async_trait;
use std::str::FromStr;

/// One candidate reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub message: ChatMessage,
}

/// Normalized model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub choices: Vec<Choice>,
}

impl Completion {
    /// Text of the first choice.
    pub fn content(&self) -> Result<&str> {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(GeoAwareError::NoResponse)
    }
}

/// A hosted chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Generate a completion for the transcript.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Completion>;
}

/// Supported model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Gemini,
    Azure,
}

impl FromStr for Backend {
    type Err = GeoAwareError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Backend::Gemini),
            "azure" | "azure-openai" => Ok(Backend::Azure),
            _ => Err(GeoAwareError::UnknownBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Gemini => write!(f, "gemini"),
            Backend::Azure => write!(f, "azure"),
        }
    }
}

/// Build the configured backend, resolving credentials from the environment.
pub fn create_model(settings: &ModelSettings) -> Result<Box<dyn ChatModel>> {
    let timeout = settings.request_timeout();
    match settings.backend.parse::<Backend>()? {
        Backend::Gemini => {
            let config = GeminiModelConfig::from_env(&settings.gemini)?;
            Ok(Box::new(GeminiModel::new(config, timeout)?))
        }
        Backend::Azure => {
            let config = AzureModelConfig::from_env(&settings.azure)?;
            Ok(Box::new(AzureModel::new(config, timeout)?))
        }
    }
}

/// Read a required credential through `lookup`.
pub(crate) fn require_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String> {
    match lookup(key) {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(GeoAwareError::Config(format!("{} is empty", key))),
        None => Err(GeoAwareError::Config(format!(
            "Please set the {} environment variable",
            key
        ))),
    }
}

pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Gemini".parse::<Backend>().unwrap(), Backend::Gemini);
        assert_eq!("azure".parse::<Backend>().unwrap(), Backend::Azure);
        assert!(matches!(
            "claude".parse::<Backend>(),
            Err(GeoAwareError::UnknownBackend(name)) if name == "claude"
        ));
    }

    #[test]
    fn test_unknown_backend_in_settings() {
        let settings = ModelSettings {
            backend: "mystery".to_string(),
            ..ModelSettings::default()
        };
        assert!(matches!(
            create_model(&settings),
            Err(GeoAwareError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_empty_completion_is_no_response() {
        assert!(matches!(
            Completion::default().content(),
            Err(GeoAwareError::NoResponse)
        ));

        let completion = Completion {
            choices: vec![Choice {
                message: ChatMessage::new(Role::Assistant, "{}"),
            }],
        };
        assert_eq!(completion.content().unwrap(), "{}");
    }

    #[test]
    fn test_require_var() {
        let lookup = |key: &str| match key {
            "SET" => Some("value".to_string()),
            "EMPTY" => Some(String::new()),
            _ => None,
        };
        assert_eq!(require_var(&lookup, "SET").unwrap(), "value");
        assert!(matches!(require_var(&lookup, "EMPTY"), Err(GeoAwareError::Config(_))));
        assert!(matches!(require_var(&lookup, "MISSING"), Err(GeoAwareError::Config(_))));
    }
}

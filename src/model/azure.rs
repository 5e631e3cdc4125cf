//! Azure OpenAI backend.

use super::{env_lookup, require_var, ChatModel, Choice, Completion};
use crate::chat::{ChatMessage, Role};
use crate::config::AzureSettings;
use crate::error::{GeoAwareError, Result};
use crate::openai::create_azure_client;
use async_openai::config::AzureConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Resolved Azure OpenAI configuration.
#[derive(Clone)]
pub struct AzureModelConfig {
    pub api_key: String,
    pub api_base: String,
    pub api_version: String,
    pub deployment: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AzureModelConfig {
    /// Resolve credentials from `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`
    /// and `AZURE_API_VERSION`.
    pub fn from_env(settings: &AzureSettings) -> Result<Self> {
        Self::from_lookup(settings, env_lookup)
    }

    pub fn from_lookup(
        settings: &AzureSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            api_key: require_var(&lookup, "AZURE_OPENAI_API_KEY")?,
            api_base: require_var(&lookup, "AZURE_OPENAI_ENDPOINT")?,
            api_version: require_var(&lookup, "AZURE_API_VERSION")?,
            deployment: settings.deployment.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    fn client_config(&self) -> AzureConfig {
        AzureConfig::new()
            .with_api_base(&self.api_base)
            .with_api_version(&self.api_version)
            .with_deployment_id(&self.deployment)
            .with_api_key(&self.api_key)
    }
}

impl std::fmt::Debug for AzureModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureModelConfig")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

/// Azure-hosted OpenAI chat model.
pub struct AzureModel {
    client: async_openai::Client<AzureConfig>,
    config: AzureModelConfig,
}

impl AzureModel {
    pub fn new(config: AzureModelConfig, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: create_azure_client(config.client_config(), timeout)?,
            config,
        })
    }
}

fn to_request_message(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let message: ChatCompletionRequestMessage = match msg.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(msg.content.clone())
            .build()
            .map_err(|e| GeoAwareError::OpenAI(e.to_string()))?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(msg.content.clone())
            .build()
            .map_err(|e| GeoAwareError::OpenAI(e.to_string()))?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(msg.content.clone())
            .build()
            .map_err(|e| GeoAwareError::OpenAI(e.to_string()))?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl ChatModel for AzureModel {
    fn name(&self) -> &str {
        &self.config.deployment
    }

    #[instrument(
        skip(self, messages),
        fields(deployment = %self.config.deployment, messages = messages.len())
    )]
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.config.deployment)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject);
        if let Some(temperature) = self.config.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            builder.max_completion_tokens(max_tokens);
        }
        let request = builder
            .build()
            .map_err(|e| GeoAwareError::OpenAI(e.to_string()))?;

        info!("Sending request to Azure OpenAI");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GeoAwareError::OpenAI(format!("Chat API error: {}", e)))?;

        let choices: Vec<Choice> = response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .map(|content| Choice {
                message: ChatMessage::new(Role::Assistant, content),
            })
            .collect();

        debug!("Received {} choice(s) from Azure OpenAI", choices.len());
        Ok(Completion { choices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(key: &str) -> Option<String> {
        match key {
            "AZURE_OPENAI_API_KEY" => Some("secret".to_string()),
            "AZURE_OPENAI_ENDPOINT" => Some("https://example.openai.azure.com".to_string()),
            "AZURE_API_VERSION" => Some("2024-06-01".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_config_from_lookup() {
        let config = AzureModelConfig::from_lookup(&AzureSettings::default(), lookup).unwrap();
        assert_eq!(config.deployment, "gpt-4o");
        assert_eq!(config.api_version, "2024-06-01");
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_missing_endpoint_is_config_error() {
        let err = AzureModelConfig::from_lookup(&AzureSettings::default(), |key| {
            (key != "AZURE_OPENAI_ENDPOINT").then(|| lookup(key)).flatten()
        })
        .unwrap_err();
        assert!(matches!(err, GeoAwareError::Config(msg) if msg.contains("AZURE_OPENAI_ENDPOINT")));
    }

    #[test]
    fn test_every_role_converts() {
        for role in [Role::System, Role::User, Role::Assistant] {
            assert!(to_request_message(&ChatMessage::new(role, "hi")).is_ok());
        }
    }
}

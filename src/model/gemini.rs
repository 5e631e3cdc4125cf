//! Google Gemini backend over the REST `generateContent` endpoint.

use super::{env_lookup, require_var, ChatModel, Choice, Completion};
use crate::chat::{ChatMessage, Role};
use crate::config::GeminiSettings;
use crate::error::{GeoAwareError, Result};
use crate::openai::http_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

const API_VERSION: &str = "v1beta";

/// Resolved Gemini configuration.
#[derive(Clone)]
pub struct GeminiModelConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GeminiModelConfig {
    /// Resolve the API key from `GEMINI_API_KEY`.
    pub fn from_env(settings: &GeminiSettings) -> Result<Self> {
        Self::from_lookup(settings, env_lookup)
    }

    pub fn from_lookup(
        settings: &GeminiSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: require_var(&lookup, "GEMINI_API_KEY")?,
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        })
    }
}

impl std::fmt::Debug for GeminiModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModelConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish_non_exhaustive()
    }
}

/// Gemini chat model.
pub struct GeminiModel {
    client: reqwest::Client,
    config: GeminiModelConfig,
}

impl GeminiModel {
    pub fn new(config: GeminiModelConfig, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            API_VERSION,
            self.config.model
        )
    }

    fn build_request(&self, messages: &[ChatMessage]) -> GenerateRequest {
        let mut system = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system.push(msg.content.as_str()),
                Role::User | Role::Assistant => contents.push(Content {
                    role: Some(if msg.role == Role::User { "user" } else { "model" }),
                    parts: vec![Part {
                        text: msg.content.clone(),
                    }],
                }),
            }
        }

        let system_instruction = (!system.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part {
                text: system.join("\n"),
            }],
        });

        GenerateRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, messages), fields(model = %self.config.model, messages = messages.len()))]
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let request = self.build_request(messages);

        info!("Sending request to Gemini");
        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeoAwareError::Model(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let body: GenerateResponse = response.json().await?;
        let choices: Vec<Choice> = body
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.content)
            .filter_map(|c| {
                let text: String = c.parts.into_iter().filter_map(|p| p.text).collect();
                (!text.is_empty()).then(|| Choice {
                    message: ChatMessage::new(Role::Assistant, text),
                })
            })
            .collect();

        debug!("Received {} candidate(s) from Gemini", choices.len());
        Ok(Completion { choices })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

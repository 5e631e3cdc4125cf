//! Error types for GeoAware.

use thiserror::Error;

/// Library-level error type for GeoAware operations.
#[derive(Error, Debug)]
pub enum GeoAwareError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid tool: {0}")]
    InvalidTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown model backend: {0}")]
    UnknownBackend(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Image reference out of range: image_{index} requested but only {available} image(s) available")]
    ImageReference { index: usize, available: usize },

    #[error("Missing field in model response: {0}")]
    MissingField(String),

    #[error("No response from the model")]
    NoResponse,

    #[error("Timed out after {0:?}: {1}")]
    Timeout(std::time::Duration, String),

    #[error("Tool '{name}' failed: {source}")]
    ToolFailed {
        name: String,
        #[source]
        source: Box<GeoAwareError>,
    },

    #[error("Model API error: {0}")]
    Model(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for GeoAware operations.
pub type Result<T> = std::result::Result<T, GeoAwareError>;

//! Pre-flight checks before starting a session.
//!
//! Validates that the selected backend is known and its credentials are
//! present, so a chat does not fail on the first turn.

use crate::config::ModelSettings;
use crate::error::Result;
use crate::model::{AzureModelConfig, Backend, GeminiModelConfig};

/// Check that `settings` names a known backend with credentials available.
pub fn check(settings: &ModelSettings) -> Result<Backend> {
    let backend: Backend = settings.backend.parse()?;
    match backend {
        Backend::Gemini => {
            GeminiModelConfig::from_env(&settings.gemini)?;
        }
        Backend::Azure => {
            AzureModelConfig::from_env(&settings.azure)?;
        }
    }
    Ok(backend)
}

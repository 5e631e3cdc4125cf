//! HTTP and OpenAI client construction with request deadlines.

use crate::error::{GeoAwareError, Result};
use async_openai::{config::AzureConfig, Client};
use std::time::Duration;

/// Default timeout for model API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Build a reqwest client with the given timeout, or the default one.
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
        .build()
        .map_err(|e| GeoAwareError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create an Azure OpenAI client sharing the timeout-configured HTTP client.
pub fn create_azure_client(
    config: AzureConfig,
    timeout: Option<Duration>,
) -> Result<Client<AzureConfig>> {
    Ok(Client::with_config(config).with_http_client(http_client(timeout)?))
}

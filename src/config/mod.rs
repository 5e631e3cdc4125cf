//! Configuration module for GeoAware.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{
    AgentSettings, AzureSettings, GeminiSettings, GeneralSettings, ModelSettings, Settings,
};

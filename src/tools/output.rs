//! Tool output variants.

use crate::image::ImageHandle;
use serde_json::Value;

/// An image to be shown to the user and appended to the agent's image store.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutput {
    pub image: ImageHandle,
    pub caption: Option<String>,
}

impl ImageOutput {
    pub fn new(image: ImageHandle) -> Self {
        Self {
            image,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Structured output: `output` goes to the model, `payload` to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomOutput {
    pub output: String,
    pub payload: Value,
}

impl CustomOutput {
    pub fn new(output: impl Into<String>, payload: Value) -> Self {
        Self {
            output: output.into(),
            payload,
        }
    }
}

/// Everything a tool can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    /// Plain structured value, shown to the model as compact JSON.
    Json(Value),
    Image(ImageOutput),
    Custom(CustomOutput),
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        ToolOutput::Text(text.into())
    }

    /// Textual form of the plain variants.
    ///
    /// Image and custom outputs are summarized by the turn cycle instead.
    pub fn as_plain_text(&self) -> Option<String> {
        match self {
            ToolOutput::Text(s) => Some(s.clone()),
            ToolOutput::Json(v) => Some(v.to_string()),
            ToolOutput::Image(_) | ToolOutput::Custom(_) => None,
        }
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        ToolOutput::Text(s)
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        ToolOutput::Text(s.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(v: Value) -> Self {
        ToolOutput::Json(v)
    }
}

impl From<ImageOutput> for ToolOutput {
    fn from(out: ImageOutput) -> Self {
        ToolOutput::Image(out)
    }
}

impl From<CustomOutput> for ToolOutput {
    fn from(out: CustomOutput) -> Self {
        ToolOutput::Custom(out)
    }
}

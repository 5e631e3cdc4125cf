//! General-purpose tools available to every agent session.

use super::{CustomOutput, ImageOutput, Tool, ToolArgs, ToolOutput, ToolType};
use crate::error::Result;
use crate::image::ImageHandle;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// All builtin tools.
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CurrentTime),
        Arc::new(LoadImage),
        Arc::new(ImageInfo),
        Arc::new(AskUser),
    ]
}

/// Report the current local date and time.
pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time."
    }

    async fn run(&self, _args: ToolArgs) -> Result<ToolOutput> {
        let now = chrono::Local::now();
        Ok(ToolOutput::text(now.format("%Y-%m-%d %H:%M:%S %Z").to_string()))
    }
}

/// Load an image file from disk and show it to the user.
pub struct LoadImage;

#[async_trait]
impl Tool for LoadImage {
    fn name(&self) -> &str {
        "load_image"
    }

    fn description(&self) -> &str {
        "Load an image file from the local disk and show it to the user. \
        The image becomes available to later tool calls."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the image file"
                }
            },
            "required": ["path"]
        })
    }

    async fn run(&self, args: ToolArgs) -> Result<ToolOutput> {
        let path = args.require_str("path")?;
        let expanded = shellexpand::tilde(path).to_string();
        let image = ImageHandle::load(&expanded).await?;
        Ok(ImageOutput::new(image).with_caption(path).into())
    }
}

/// Describe an uploaded image without decoding it.
pub struct ImageInfo;

#[async_trait]
impl Tool for ImageInfo {
    fn name(&self) -> &str {
        "image_info"
    }

    fn description(&self) -> &str {
        "Get the media type and size of an image. Pass the image as \"$image_<N>$\"."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "image": {
                    "type": "string",
                    "description": "Image reference, e.g. \"$image_0$\""
                }
            },
            "required": ["image"]
        })
    }

    async fn run(&self, args: ToolArgs) -> Result<ToolOutput> {
        let image = args.require_image("image")?;
        let output = format!("{} image, {} bytes", image.media_type(), image.len());
        let payload = json!({
            "media_type": image.media_type(),
            "bytes": image.len(),
        });
        Ok(CustomOutput::new(output, payload).into())
    }
}

/// Hand the conversation back to the user.
pub struct AskUser;

#[async_trait]
impl Tool for AskUser {
    fn name(&self) -> &str {
        "ask_user"
    }

    fn tool_type(&self) -> ToolType {
        ToolType::Aua
    }

    fn description(&self) -> &str {
        "Ask the user a question and wait for their answer before continuing."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question to ask"
                }
            },
            "required": ["question"]
        })
    }

    async fn run(&self, args: ToolArgs) -> Result<ToolOutput> {
        let question = args.get_str("question").unwrap_or_default();
        Ok(ToolOutput::text(format!("Asked the user: {}", question)))
    }
}

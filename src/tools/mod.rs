//! Tools the model can call, and the registry that dispatches them.
//!
//! Every tool exposes one async [`Tool::run`]. Tools that finish
//! immediately are wrapped by [`FnTool::sync`] at registration time, so the
//! registry never needs to know how a tool is implemented.

mod args;
pub mod builtin;
mod handler;
mod output;

pub use args::{ArgValue, ToolArgs};
pub use handler::{
    DispatchResult, DuplicateToolWarning, ToolHandler, ToolInvocation, TOOL_ERROR_SENTINEL,
};
pub use output::{CustomOutput, ImageOutput, ToolOutput};

use crate::error::Result;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;

/// How the turn cycle should treat a tool after it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolType {
    #[default]
    Ordinary,
    /// Awaiting user action: the conversation should pause for the user.
    #[serde(rename = "AUA")]
    Aua,
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolType::Ordinary => write!(f, "ordinary"),
            ToolType::Aua => write!(f, "AUA"),
        }
    }
}

/// A callable the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    fn tool_type(&self) -> ToolType {
        ToolType::Ordinary
    }

    /// One-line description rendered into the system prompt.
    fn description(&self) -> &str {
        ""
    }

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    /// Run the tool with named arguments.
    async fn run(&self, args: ToolArgs) -> Result<ToolOutput>;
}

type ToolFn = Box<dyn Fn(ToolArgs) -> BoxFuture<'static, Result<ToolOutput>> + Send + Sync>;

/// A tool built from a closure.
pub struct FnTool {
    name: String,
    tool_type: ToolType,
    description: String,
    parameters: Value,
    run: ToolFn,
}

impl FnTool {
    /// Wrap a closure that returns its result immediately.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ToolArgs) -> Result<ToolOutput> + Send + Sync + 'static,
    {
        Self::from_boxed(
            name.into(),
            Box::new(move |args| futures::future::ready(f(args)).boxed()),
        )
    }

    /// Wrap a closure returning a future.
    pub fn asynchronous<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
    {
        Self::from_boxed(name.into(), Box::new(move |args| f(args).boxed()))
    }

    fn from_boxed(name: String, run: ToolFn) -> Self {
        Self {
            name,
            tool_type: ToolType::Ordinary,
            description: String::new(),
            parameters: json!({"type": "object", "properties": {}}),
            run,
        }
    }

    pub fn with_type(mut self, tool_type: ToolType) -> Self {
        self.tool_type = tool_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn tool_type(&self) -> ToolType {
        self.tool_type
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn run(&self, args: ToolArgs) -> Result<ToolOutput> {
        (self.run)(args).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("tool_type", &self.tool_type)
            .finish()
    }
}

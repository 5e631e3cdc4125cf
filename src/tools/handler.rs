//! Tool registry and batch dispatch.

use super::{Tool, ToolArgs, ToolOutput, ToolType};
use crate::error::{GeoAwareError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result text substituted for a tool that failed during a batch.
pub const TOOL_ERROR_SENTINEL: &str = "An error occurred while running the tool.";

/// Non-fatal notice that a registration replaced an existing tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateToolWarning {
    pub name: String,
}

impl std::fmt::Display for DuplicateToolWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tool '{}' already exists. Overwriting.", self.name)
    }
}

/// One tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub args: ToolArgs,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Outputs of one batch, keyed by tool name in call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchResult {
    results: Vec<(String, ToolOutput)>,
    /// Set when any dispatched tool is tagged [`ToolType::Aua`].
    pub aua: bool,
}

impl DispatchResult {
    // A repeated name keeps its first position and takes the latest output.
    fn record(&mut self, name: String, output: ToolOutput) {
        match self.results.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = output,
            None => self.results.push((name, output)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolOutput> {
        self.results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, out)| out)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl IntoIterator for DispatchResult {
    type Item = (String, ToolOutput);
    type IntoIter = std::vec::IntoIter<(String, ToolOutput)>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Registry of tools, keyed by [`Tool::name`].
pub struct ToolHandler {
    tools: HashMap<String, Arc<dyn Tool>>,
    debug: bool,
    tool_timeout: Option<Duration>,
}

impl ToolHandler {
    /// Create a registry seeded with `tools`.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self> {
        let mut handler = Self {
            tools: HashMap::new(),
            debug: false,
            tool_timeout: None,
        };
        handler.add_all(tools)?;
        Ok(handler)
    }

    /// In debug mode a failing tool aborts the batch instead of being masked.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Deadline applied to every tool invocation.
    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    fn validate(tool: &dyn Tool) -> Result<()> {
        let name = tool.name();
        if name.is_empty() {
            return Err(GeoAwareError::InvalidTool("tool name is empty".to_string()));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(GeoAwareError::InvalidTool(format!(
                "tool name '{}' contains whitespace",
                name
            )));
        }
        if !tool.parameters().is_object() {
            return Err(GeoAwareError::InvalidTool(format!(
                "parameters of '{}' must be a JSON object schema",
                name
            )));
        }
        Ok(())
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn add(&mut self, tool: Arc<dyn Tool>) -> Result<Option<DuplicateToolWarning>> {
        Self::validate(tool.as_ref())?;
        Ok(self.insert(tool))
    }

    /// Register several tools.
    ///
    /// Every tool is validated before any is inserted, so an invalid tool
    /// leaves the registry unchanged.
    pub fn add_all(
        &mut self,
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<Vec<DuplicateToolWarning>> {
        let tools: Vec<Arc<dyn Tool>> = tools.into_iter().collect();
        for tool in &tools {
            Self::validate(tool.as_ref())?;
        }
        Ok(tools.into_iter().filter_map(|t| self.insert(t)).collect())
    }

    fn insert(&mut self, tool: Arc<dyn Tool>) -> Option<DuplicateToolWarning> {
        let name = tool.name().to_string();
        let previous = self.tools.insert(name.clone(), tool);
        previous.map(|_| {
            let warning = DuplicateToolWarning { name };
            warn!("{}", warning);
            warning
        })
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&Arc<dyn Tool>> {
        self.tools
            .get(name)
            .ok_or_else(|| GeoAwareError::UnknownTool(name.to_string()))
    }

    /// Run a single named tool.
    pub async fn call(&self, name: &str, args: ToolArgs) -> Result<ToolOutput> {
        let tool = self.lookup(name)?;
        match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, tool.run(args))
                .await
                .map_err(|_| GeoAwareError::Timeout(limit, format!("tool '{}'", name)))?,
            None => tool.run(args).await,
        }
    }

    /// Run every call in order, isolating failures per call.
    ///
    /// An unknown tool name aborts the batch. A tool that fails is recorded
    /// as [`TOOL_ERROR_SENTINEL`] unless debug mode is on.
    pub async fn dispatch_batch(&self, calls: Vec<ToolInvocation>) -> Result<DispatchResult> {
        let mut result = DispatchResult::default();

        for call in calls {
            let tool = self.lookup(&call.name)?;
            if tool.tool_type() == ToolType::Aua {
                result.aua = true;
            }

            info!("Agent calling tool: {} with args: {}", call.name, call.args.to_json());
            let output = match self.call(&call.name, call.args.clone()).await {
                Ok(output) => output,
                Err(e) if self.debug => {
                    error!(
                        "Tool {} failed with args {}: {}",
                        call.name,
                        call.args.to_json(),
                        e
                    );
                    return Err(GeoAwareError::ToolFailed {
                        name: call.name,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    debug!("Tool {} failed: {}", call.name, e);
                    ToolOutput::text(TOOL_ERROR_SENTINEL)
                }
            };

            result.record(call.name, output);
        }

        Ok(result)
    }
}

impl std::fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandler")
            .field("tools", &self.names())
            .field("debug", &self.debug)
            .field("tool_timeout", &self.tool_timeout)
            .finish()
    }
}

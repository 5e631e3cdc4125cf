//! Conversation states: instructions plus the tools available in them.

use crate::tools::Tool;
use std::sync::Arc;

/// A named set of instructions and tools rendered into the system prompt.
#[derive(Clone)]
pub struct State {
    name: String,
    instructions: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl State {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Current state: {}", self.name)?;
        if !self.instructions.is_empty() {
            writeln!(f, "{}", self.instructions)?;
        }
        if self.tools.is_empty() {
            return write!(f, "No tools are available.");
        }
        write!(f, "Available tools:")?;
        for tool in &self.tools {
            write!(f, "\n- {} [{}]", tool.name(), tool.tool_type())?;
            if !tool.description().is_empty() {
                write!(f, ": {}", tool.description())?;
            }
            write!(f, "\n  args schema: {}", tool.parameters())?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tools: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("State")
            .field("name", &self.name)
            .field("tools", &tools)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnTool, ToolType};
    use serde_json::json;

    #[test]
    fn test_render_lists_tools() {
        let state = State::new("explore", "Help the user explore maps.")
            .with_tool(Arc::new(
                FnTool::sync("show_map", |_| Ok("".into()))
                    .with_description("Render a map")
                    .with_parameters(json!({
                        "type": "object",
                        "properties": {"place": {"type": "string"}}
                    })),
            ))
            .with_tool(Arc::new(
                FnTool::sync("ask_user", |_| Ok("".into())).with_type(ToolType::Aua),
            ));

        let rendered = state.to_string();
        assert!(rendered.starts_with("Current state: explore\nHelp the user explore maps.\n"));
        assert!(rendered.contains("- show_map [ordinary]: Render a map"));
        assert!(rendered.contains(r#""place":{"type":"string"}"#));
        assert!(rendered.contains("- ask_user [AUA]"));
    }

    #[test]
    fn test_render_without_tools() {
        let state = State::new("idle", "");
        assert_eq!(state.to_string(), "Current state: idle\nNo tools are available.");
    }
}

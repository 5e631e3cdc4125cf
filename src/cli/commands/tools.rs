//! Tools command implementation.

use crate::cli::Output;
use crate::tools::builtin::default_tools;
use anyhow::Result;

/// List the builtin tools and their argument schemas.
pub fn run_tools() -> Result<()> {
    Output::header("Available tools");

    for tool in default_tools() {
        Output::list_item(&format!("{} ({})", tool.name(), tool.tool_type()));
        if !tool.description().is_empty() {
            Output::kv("description", tool.description());
        }
        Output::kv("args", &tool.parameters().to_string());
    }

    Ok(())
}

//! Agent turn cycle.
//!
//! Each turn sends the transcript to the model, parses the JSON reply for
//! tool calls, runs them through the [`ToolHandler`](crate::tools::ToolHandler)
//! and feeds the results back as a `{"tool_results": ...}` user message.

mod parser;
mod runner;
mod state;

pub use parser::{extract_info, info_field, ResponseInfo};
pub use runner::{Agent, AgentConfig, TurnReport, DEFAULT_SYSTEM_PROMPT, IMAGE_SHOWN_TO_USER};
pub use state::State;

//! GeoAware - a conversational agent harness with tool dispatch
//!
//! Sends a running chat transcript to a hosted model, parses the model's
//! JSON reply for tool calls (which may take uploaded images as arguments),
//! runs those tools and feeds the results back for the next turn.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `chat` - Append-only conversation transcript
//! - `image` - Opaque image handles referenced as `$image_<N>$`
//! - `tools` - Tool trait, output variants and the dispatching registry
//! - `agent` - Reply parser and the turn cycle
//! - `model` - Gemini and Azure OpenAI backends behind one trait
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use geoaware::agent::{Agent, AgentConfig, State, DEFAULT_SYSTEM_PROMPT};
//! use geoaware::config::Settings;
//! use geoaware::model::create_model;
//! use geoaware::tools::builtin::default_tools;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let model = create_model(&settings.model)?;
//!     let state = State::new("assistant", "Help the user.").with_tools(default_tools());
//!
//!     let mut agent = Agent::new(state, model, AgentConfig::from_settings(&settings))?;
//!     agent.set_system_prompt(DEFAULT_SYSTEM_PROMPT);
//!     agent.add_user_message("What time is it?");
//!
//!     let report = agent.run_turn().await?;
//!     println!("{}", report.audio);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod model;
pub mod openai;
pub mod tools;

pub use error::{GeoAwareError, Result};

//! Agent turn cycle: model call, parse, dispatch, fold.

use super::parser::{extract_info, info_field, ResponseInfo};
use super::state::State;
use crate::chat::ChatBuilder;
use crate::config::Settings;
use crate::error::{GeoAwareError, Result};
use crate::image::ImageHandle;
use crate::model::ChatModel;
use crate::tools::{
    CustomOutput, DuplicateToolWarning, ImageOutput, Tool, ToolHandler, ToolInvocation, ToolOutput,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Text the model sees in place of an image a tool showed to the user.
pub const IMAGE_SHOWN_TO_USER: &str = "Image shown to user";

/// Default system prompt describing the reply format.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that can call tools on the user's behalf.

Always reply with a single JSON object and nothing else:
{"tool_calls": [{"name": "<tool name>", "args": {"<arg name>": <value>}}], "audio": "<what to say to the user>"}

Guidelines:
- Use an empty "tool_calls" list when no tool is needed.
- Images are referenced by position. Pass one to a tool as "$image_<N>$", e.g. "$image_0$".
- Tool results arrive in the next user message as {"tool_results": {...}}.
- Keep "audio" short and conversational; it is read aloud to the user."#;

/// Construction-time agent options.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// Surface tool failures instead of masking them.
    pub debug: bool,
    /// Deadline for one model round trip.
    pub model_timeout: Option<Duration>,
    /// Deadline for one tool invocation.
    pub tool_timeout: Option<Duration>,
}

impl AgentConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            debug: settings.agent.debug,
            model_timeout: settings.model.request_timeout(),
            tool_timeout: settings.agent.tool_timeout(),
        }
    }
}

/// What one turn produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    /// Images to show to the user, by tool name.
    pub display_outputs: BTreeMap<String, ImageOutput>,
    /// Text fed back to the model, by tool name.
    pub text_outputs: BTreeMap<String, String>,
    /// A tool asked to wait for the user.
    pub aua: bool,
    /// The model's spoken/text reply.
    pub audio: String,
    /// Structured outputs, by tool name.
    pub custom_outputs: BTreeMap<String, CustomOutput>,
}

impl TurnReport {
    /// True when no tool ran this turn.
    pub fn is_final(&self) -> bool {
        self.text_outputs.is_empty()
    }
}

/// One conversation with a model and a set of tools.
pub struct Agent {
    model: Box<dyn ChatModel>,
    messages: ChatBuilder,
    state: State,
    tool_handler: ToolHandler,
    images: Vec<ImageHandle>,
    model_timeout: Option<Duration>,
}

impl Agent {
    /// Create an agent whose tools are seeded from `state`.
    pub fn new(state: State, model: Box<dyn ChatModel>, config: AgentConfig) -> Result<Self> {
        let tool_handler = ToolHandler::new(state.tools().iter().cloned())?
            .with_debug(config.debug)
            .with_tool_timeout(config.tool_timeout);

        Ok(Self {
            model,
            messages: ChatBuilder::new(),
            state,
            tool_handler,
            images: Vec::new(),
            model_timeout: config.model_timeout,
        })
    }

    /// Append the system prompt followed by the rendered state.
    pub fn set_system_prompt(&mut self, prompt: &str) {
        self.messages
            .system_message(format!("{}\n{}", prompt, self.state));
    }

    /// Append a user message, listing uploaded images when there are any.
    pub fn add_user_message(&mut self, message: &str) {
        if self.images.is_empty() {
            self.messages.user_message(message);
            return;
        }

        let names = (0..self.images.len())
            .map(|i| format!("image_{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        self.messages.user_message(format!(
            "{}\nThe user has uploaded the following images: {}\n\
            An image can be inserted as an argument directly - \"args\": {{\"<arg_name>\": \"$image_1$\"}}",
            message, names
        ));
    }

    pub fn add_assistant_message(&mut self, message: &str) {
        self.messages.assistant_message(message);
    }

    /// Add an image to the store and return its index.
    pub fn add_input_image(&mut self, image: ImageHandle) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) -> Result<Option<DuplicateToolWarning>> {
        self.tool_handler.add(tool)
    }

    pub fn add_tools(
        &mut self,
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<Vec<DuplicateToolWarning>> {
        self.tool_handler.add_all(tools)
    }

    pub fn messages(&self) -> &ChatBuilder {
        &self.messages
    }

    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }

    pub fn tools(&self) -> &ToolHandler {
        &self.tool_handler
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Call the model and record its raw reply in the transcript.
    pub async fn get_assistant_response(&mut self) -> Result<String> {
        debug!("Requesting completion for {} messages", self.messages.len());

        let generate = self.model.generate(self.messages.messages());
        let completion = match self.model_timeout {
            Some(limit) => tokio::time::timeout(limit, generate).await.map_err(|_| {
                GeoAwareError::Timeout(limit, format!("model '{}'", self.model.name()))
            })??,
            None => generate.await?,
        };

        let answer = completion.content()?.to_string();
        self.add_assistant_message(&answer);
        Ok(answer)
    }

    /// Parse a reply against the current image store.
    pub fn extract_info(&self, response: &str) -> Result<(Vec<ToolInvocation>, ResponseInfo)> {
        extract_info(response, &self.images)
    }

    /// Run one full turn.
    pub async fn agent_loop(&mut self) -> Result<TurnReport> {
        let response = self.get_assistant_response().await?;
        let (tool_calls, info) = self.extract_info(&response)?;

        if tool_calls.is_empty() {
            debug!("Model requested no tools");
            return Ok(TurnReport {
                audio: info_field(&info, "audio")?.to_string(),
                ..TurnReport::default()
            });
        }

        info!("Model requested {} tool call(s)", tool_calls.len());
        let results = self.tool_handler.dispatch_batch(tool_calls).await?;

        let mut report = TurnReport {
            aua: results.aua,
            ..TurnReport::default()
        };
        // Results go back to the model in the order it requested them.
        let mut tool_results = Map::new();
        for (name, output) in results {
            let text = match output {
                ToolOutput::Image(out) => {
                    self.add_input_image(out.image.clone());
                    report.display_outputs.insert(name.clone(), out);
                    IMAGE_SHOWN_TO_USER.to_string()
                }
                ToolOutput::Custom(out) => {
                    let text = out.output.clone();
                    report.custom_outputs.insert(name.clone(), out);
                    text
                }
                ToolOutput::Text(text) => text,
                ToolOutput::Json(value) => value.to_string(),
            };
            tool_results.insert(name.clone(), Value::String(text.clone()));
            report.text_outputs.insert(name, text);
        }

        let envelope = json!({ "tool_results": tool_results }).to_string();
        self.add_user_message(&envelope);

        report.audio = info_field(&info, "audio")?.to_string();
        Ok(report)
    }

    /// Alias for [`Agent::agent_loop`].
    pub async fn run_turn(&mut self) -> Result<TurnReport> {
        self.agent_loop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatMessage, Role};
    use crate::model::{Choice, Completion};
    use crate::tools::{FnTool, ToolType, TOOL_ERROR_SENTINEL};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model that replays canned replies in order.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Completion>>,
        delay: Option<Duration>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            let replies = replies
                .iter()
                .map(|r| Completion {
                    choices: vec![Choice {
                        message: ChatMessage::new(Role::Assistant, *r),
                    }],
                })
                .collect();
            Self {
                replies: Mutex::new(replies),
                delay: None,
            }
        }

        fn empty() -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Completion::default()])),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _messages: &[ChatMessage]) -> Result<Completion> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    fn map_image() -> ImageHandle {
        ImageHandle::from_bytes(vec![1, 2, 3], "image/png")
    }

    fn geo_state() -> State {
        State::new("explore", "Help with maps.")
            .with_tool(Arc::new(FnTool::sync("show_map", |_| {
                Ok(ImageOutput::new(map_image()).into())
            })))
            .with_tool(Arc::new(FnTool::sync("distance", |_| {
                Ok(ToolOutput::Json(json!({"km": 12.5})))
            })))
            .with_tool(Arc::new(FnTool::sync("lookup", |_| {
                Ok(CustomOutput::new("Found Oslo", json!({"lat": 59.9, "lon": 10.7})).into())
            })))
            .with_tool(Arc::new(FnTool::sync("broken", |_| {
                Err(GeoAwareError::InvalidInput("no data".to_string()))
            })))
            .with_tool(Arc::new(
                FnTool::sync("ask_user", |args| {
                    Ok(ToolOutput::text(args.get_str("question").unwrap_or_default()))
                })
                .with_type(ToolType::Aua),
            ))
    }

    fn agent(model: ScriptedModel) -> Agent {
        let mut agent = Agent::new(geo_state(), Box::new(model), AgentConfig::default()).unwrap();
        agent.set_system_prompt(DEFAULT_SYSTEM_PROMPT);
        agent
    }

    #[tokio::test]
    async fn test_show_map_end_to_end() {
        let mut agent = agent(ScriptedModel::new(&[
            r#"{"tool_calls":[{"name":"show_map","args":{}}],"audio":""}"#,
        ]));
        agent.add_user_message("show me a map");
        let before = agent.messages().len();

        let report = agent.run_turn().await.unwrap();

        assert_eq!(agent.images().len(), 1);
        assert!(report.display_outputs.contains_key("show_map"));
        assert_eq!(report.text_outputs["show_map"], IMAGE_SHOWN_TO_USER);
        assert!(!report.aua);
        assert_eq!(report.audio, "");

        let new_messages = &agent.messages().messages()[before..];
        assert_eq!(new_messages.len(), 2);
        assert_eq!(new_messages[0].role, Role::Assistant);
        assert_eq!(
            new_messages[0].content,
            r#"{"tool_calls":[{"name":"show_map","args":{}}],"audio":""}"#
        );
        assert_eq!(new_messages[1].role, Role::User);
        assert!(new_messages[1]
            .content
            .starts_with(r#"{"tool_results":{"show_map":"Image shown to user"}}"#));
        // The shown image is now addressable as image_0.
        assert!(new_messages[1].content.contains("uploaded the following images: image_0"));
    }

    #[tokio::test]
    async fn test_mixed_outputs_are_folded_by_variant() {
        let mut agent = agent(ScriptedModel::new(&[
            r#"{"tool_calls":[
                {"name":"distance","args":{}},
                {"name":"lookup","args":{}},
                {"name":"broken","args":{}},
                {"name":"ask_user","args":{"question":"Which city?"}}
            ],"audio":"Working on it"}"#,
        ]));
        agent.add_user_message("how far is Oslo?");

        let report = agent.run_turn().await.unwrap();

        assert!(report.aua);
        assert_eq!(report.audio, "Working on it");
        assert!(report.display_outputs.is_empty());
        assert_eq!(report.text_outputs["distance"], r#"{"km":12.5}"#);
        assert_eq!(report.text_outputs["lookup"], "Found Oslo");
        assert_eq!(report.text_outputs["broken"], TOOL_ERROR_SENTINEL);
        assert_eq!(report.text_outputs["ask_user"], "Which city?");
        assert_eq!(report.custom_outputs["lookup"].payload, json!({"lat": 59.9, "lon": 10.7}));

        let envelope: Value =
            serde_json::from_str(&agent.messages().last().unwrap().content).unwrap();
        assert_eq!(envelope["tool_results"]["lookup"], "Found Oslo");
        assert_eq!(envelope["tool_results"]["broken"], TOOL_ERROR_SENTINEL);
    }

    #[tokio::test]
    async fn test_tool_results_follow_call_order() {
        let mut agent = agent(ScriptedModel::new(&[
            r#"{"tool_calls":[
                {"name":"lookup","args":{}},
                {"name":"distance","args":{}},
                {"name":"broken","args":{}}
            ],"audio":""}"#,
        ]));
        agent.add_user_message("where is Oslo?");

        agent.run_turn().await.unwrap();

        assert_eq!(
            agent.messages().last().unwrap().content,
            format!(
                r#"{{"tool_results":{{"lookup":"Found Oslo","distance":"{{\"km\":12.5}}","broken":"{}"}}}}"#,
                TOOL_ERROR_SENTINEL
            )
        );
    }

    #[tokio::test]
    async fn test_missing_audio_after_tools_keeps_appends() {
        let mut agent = agent(ScriptedModel::new(&[
            r#"{"tool_calls":[{"name":"show_map","args":{}}]}"#,
        ]));
        agent.add_user_message("show me a map");
        let before = agent.messages().len();

        let err = agent.run_turn().await.unwrap_err();

        assert!(matches!(err, GeoAwareError::MissingField(field) if field == "audio"));
        assert_eq!(agent.images().len(), 1);
        let new_messages = &agent.messages().messages()[before..];
        assert_eq!(new_messages.len(), 2);
        assert_eq!(new_messages[0].role, Role::Assistant);
        assert!(new_messages[1]
            .content
            .starts_with(r#"{"tool_results":{"show_map":"Image shown to user"}}"#));
    }

    #[tokio::test]
    async fn test_no_tool_calls_short_circuits() {
        let mut agent = agent(ScriptedModel::new(&[r#"{"tool_calls":[],"audio":"Hello!"}"#]));
        agent.add_user_message("hi");
        let before = agent.messages().len();

        let report = agent.run_turn().await.unwrap();

        assert!(report.is_final());
        assert_eq!(report.audio, "Hello!");
        assert!(!report.aua);
        assert_eq!(agent.messages().len(), before + 1);
    }

    #[tokio::test]
    async fn test_image_argument_reaches_tool() {
        let mut agent = agent(ScriptedModel::new(&[
            r#"{"tool_calls":[{"name":"inspect","args":{"img":"$image_0$"}}],"audio":""}"#,
        ]));
        agent
            .add_tool(Arc::new(FnTool::sync("inspect", |args| {
                Ok(ToolOutput::text(args.require_image("img")?.media_type()))
            })))
            .unwrap();
        assert_eq!(agent.add_input_image(map_image()), 0);
        agent.add_user_message("what is this?");

        let report = agent.run_turn().await.unwrap();
        assert_eq!(report.text_outputs["inspect"], "image/png");
    }

    #[tokio::test]
    async fn test_malformed_reply_leaves_state_untouched() {
        let mut agent = agent(ScriptedModel::new(&[r#"{"tool_calls":"#]));
        agent.add_input_image(map_image());
        agent.add_user_message("hi");
        let tools_before = agent.tools().len();
        let messages_before = agent.messages().len();

        let err = agent.run_turn().await.unwrap_err();

        assert!(matches!(err, GeoAwareError::MalformedResponse(_)));
        assert_eq!(agent.images().len(), 1);
        assert_eq!(agent.tools().len(), tools_before);
        // Only the raw assistant reply was recorded.
        assert_eq!(agent.messages().len(), messages_before + 1);
    }

    #[tokio::test]
    async fn test_empty_completion_is_no_response() {
        let mut agent = agent(ScriptedModel::empty());
        agent.add_user_message("hi");
        let before = agent.messages().len();

        let err = agent.run_turn().await.unwrap_err();
        assert!(matches!(err, GeoAwareError::NoResponse));
        assert_eq!(agent.messages().len(), before);
    }

    #[tokio::test]
    async fn test_missing_audio_field_is_an_error() {
        let mut agent = agent(ScriptedModel::new(&[r#"{"tool_calls":[]}"#]));
        agent.add_user_message("hi");

        let err = agent.run_turn().await.unwrap_err();
        assert!(matches!(err, GeoAwareError::MissingField(field) if field == "audio"));
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts_turn() {
        let mut agent = agent(ScriptedModel::new(&[
            r#"{"tool_calls":[{"name":"teleport","args":{}}],"audio":""}"#,
        ]));
        agent.add_user_message("go");

        let err = agent.run_turn().await.unwrap_err();
        assert!(matches!(err, GeoAwareError::UnknownTool(name) if name == "teleport"));
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let mut model = ScriptedModel::new(&[r#"{"tool_calls":[],"audio":""}"#]);
        model.delay = Some(Duration::from_secs(5));
        let config = AgentConfig {
            model_timeout: Some(Duration::from_millis(20)),
            ..AgentConfig::default()
        };
        let mut agent = Agent::new(geo_state(), Box::new(model), config).unwrap();
        agent.add_user_message("hi");

        let err = agent.run_turn().await.unwrap_err();
        assert!(matches!(err, GeoAwareError::Timeout(..)));
    }

    #[test]
    fn test_system_prompt_includes_state() {
        let agent = agent(ScriptedModel::new(&[]));
        let system = &agent.messages().messages()[0];
        assert_eq!(system.role, Role::System);
        assert!(system.content.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(system.content.contains("Current state: explore"));
        assert!(system.content.contains("- show_map [ordinary]"));
    }
}

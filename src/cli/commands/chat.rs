//! Interactive chat command driving the agent turn cycle.

use crate::agent::{Agent, AgentConfig, State, TurnReport, DEFAULT_SYSTEM_PROMPT};
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::image::ImageHandle;
use crate::model::create_model;
use crate::tools::builtin::default_tools;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Instructions for the default conversation state.
const ASSISTANT_INSTRUCTIONS: &str =
    "Use the tools below when they help answer the user. Ask the user when you need more details.";

/// Run the interactive chat command.
pub async fn run_chat(
    backend: Option<String>,
    images: &[String],
    debug: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Some(backend) = backend {
        settings.model.backend = backend;
    }
    settings.agent.debug |= debug;

    // Pre-flight checks
    let backend = match preflight::check(&settings.model) {
        Ok(backend) => backend,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Set the credentials in your environment or in a .env file.");
            return Err(e.into());
        }
    };

    let model = create_model(&settings.model)?;
    let state = State::new("assistant", ASSISTANT_INSTRUCTIONS).with_tools(default_tools());
    let mut agent = Agent::new(state, model, AgentConfig::from_settings(&settings))?;
    agent.set_system_prompt(
        settings
            .agent
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT),
    );

    for path in images {
        upload_image(&mut agent, path).await?;
    }

    let image_dir = settings.temp_dir();
    let max_auto_turns = settings.agent.max_auto_turns;

    println!("\n{}", style("GeoAware Chat").bold().cyan());
    println!(
        "{}\n",
        style(format!(
            "Backend: {}. Type your message, '/image <path>' to upload an image, or 'exit' to quit.",
            backend
        ))
        .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if let Some(path) = input.strip_prefix("/image ") {
            if let Err(e) = upload_image(&mut agent, path.trim()).await {
                Output::error(&format!("Error: {}", e));
            }
            continue;
        }

        agent.add_user_message(input);
        if let Err(e) = run_turns(&mut agent, &image_dir, max_auto_turns).await {
            Output::error(&format!("Error: {}", e));
        }
    }

    Ok(())
}

async fn upload_image(agent: &mut Agent, path: &str) -> Result<()> {
    let image = ImageHandle::load(Settings::expand_path(path)).await?;
    let index = agent.add_input_image(image);
    Output::success(&format!("Uploaded {} as $image_{}$", path, index));
    Ok(())
}

/// Run turns until the model stops calling tools or waits for the user.
async fn run_turns(agent: &mut Agent, image_dir: &Path, max_auto_turns: usize) -> Result<()> {
    for turn in 0..=max_auto_turns {
        debug!("Chat turn {}", turn + 1);

        let spinner = Output::spinner("Thinking...");
        let report = agent.run_turn().await;
        spinner.finish_and_clear();
        let report = report?;

        show_report(&report, image_dir).await?;

        if report.is_final() || report.aua {
            return Ok(());
        }
    }

    Output::warning(&format!(
        "Stopped after {} automatic turns. Waiting for your input.",
        max_auto_turns
    ));
    Ok(())
}

async fn show_report(report: &TurnReport, image_dir: &Path) -> Result<()> {
    for (name, text) in &report.text_outputs {
        Output::tool_result(name, text);
    }

    for (name, output) in &report.display_outputs {
        let path = save_image(&output.image, image_dir).await?;
        let caption = output.caption.as_deref().unwrap_or(name);
        Output::info(&format!("{} -> {}", caption, path.display()));
    }

    if !report.audio.is_empty() {
        println!("\n{} {}\n", style("GeoAware:").cyan().bold(), report.audio);
    }
    Ok(())
}

async fn save_image(image: &ImageHandle, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.{}", uuid::Uuid::new_v4(), image.extension()));
    tokio::fs::write(&path, image.bytes()).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_image_uses_media_extension() {
        let dir = tempfile::tempdir().unwrap();
        let image = ImageHandle::from_bytes(vec![7, 7], "image/webp");

        let path = save_image(&image, &dir.path().join("shown")).await.unwrap();

        assert_eq!(path.extension().unwrap(), "webp");
        assert_eq!(std::fs::read(&path).unwrap(), vec![7, 7]);
    }
}

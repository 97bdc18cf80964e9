mod chat;
mod cli;
mod config;
mod error;
mod llm;
mod logging;
mod tui;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use cli::{Cli, Commands};
use tracing::info;

use chat::ChatController;
use config::SessionConfig;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    config::load_env(None)?;

    let cli = Cli::parse();

    if let Some(path) = &cli.session.env_file {
        config::load_env(Some(path))?;
    }

    match cli.command {
        Some(Commands::Config) => {
            logging::init_stderr()?;
            let session = SessionConfig::from_args(&cli.session)?;
            println!("{}", session);
        }
        Some(Commands::Ask { message }) => {
            logging::init_stderr()?;
            let session = SessionConfig::from_args(&cli.session)?;
            return ask(session, &message.join(" ")).await;
        }
        None => {
            let log_file = cli
                .session
                .log_file
                .clone()
                .unwrap_or_else(logging::default_log_file);
            logging::init_file(&log_file)?;

            let session = SessionConfig::from_args(&cli.session)?;
            info!(config = ?session, "starting interactive chat");

            let client = llm::create_client(&session)?;
            tui::run(ChatController::new(session, client)).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// One turn without the UI; prints the reply, or the error banner and a
/// failing exit status.
async fn ask(session: SessionConfig, text: &str) -> Result<ExitCode> {
    let client = llm::create_client(&session)?;
    let mut controller = ChatController::new(session, client);

    controller.send(text).await;

    match turn_outcome(&controller) {
        Ok(replies) => {
            for reply in replies {
                println!("{}", reply);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(banners) => {
            for banner in banners {
                eprintln!("{}", banner);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Assistant replies of a finished turn, or its banners if it failed.
fn turn_outcome(controller: &ChatController) -> std::result::Result<Vec<&str>, Vec<&str>> {
    let transcript = controller.transcript();
    let banners: Vec<&str> = transcript.errors().collect();
    if !banners.is_empty() {
        return Err(banners);
    }

    Ok(transcript
        .messages()
        .filter(|message| message.author == chat::Author::Assistant)
        .map(|message| message.text.as_str())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use crate::llm::fake::ScriptedClient;
    use crate::llm::InferenceError;
    use std::sync::Arc;

    fn session() -> SessionConfig {
        SessionConfig::new(Provider::HuggingFace).with_api_key("hf_test")
    }

    #[tokio::test]
    async fn test_successful_turn_yields_reply() {
        let client = Arc::new(ScriptedClient::fragments(&["x = ", "4"]));
        let mut controller = ChatController::new(session(), client);
        controller.send("solve 2x = 8").await;

        assert_eq!(turn_outcome(&controller), Ok(vec!["x = 4"]));
    }

    #[tokio::test]
    async fn test_failed_turn_yields_banner() {
        let client = Arc::new(ScriptedClient::failing(InferenceError::Stream(
            "Model is loading".to_string(),
        )));
        let mut controller = ChatController::new(session(), client);
        controller.send("hello").await;

        let banners = turn_outcome(&controller).unwrap_err();
        assert_eq!(banners.len(), 1);
        assert!(banners[0].starts_with("⚠️ Error: "));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_request() {
        let client = Arc::new(ScriptedClient::fragments(&["unused"]));
        let mut controller =
            ChatController::new(SessionConfig::new(Provider::HuggingFace), client.clone());
        controller.send("hello").await;

        assert!(turn_outcome(&controller).is_err());
        assert!(client.requests().is_empty());
    }
}

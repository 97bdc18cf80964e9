use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Streaming homework-help chat in your terminal", long_about = None)]
pub struct Cli {
    /// Optional command to run; without one the interactive chat starts
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a one-off message and print the response
    Ask {
        /// The message to send
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    #[value(name = "huggingface", alias = "hf")]
    HuggingFace,
    Ollama,
}

#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Inference backend
    #[arg(long, global = true, env = "CHAT_PROVIDER", value_enum)]
    pub provider: Option<ProviderArg>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CHAT_MODEL")]
    pub model: Option<String>,

    /// Base URL of the inference endpoint
    #[arg(long, global = true, env = "CHAT_BASE_URL")]
    pub base_url: Option<String>,

    /// Maximum number of tokens to generate
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Prompt template offered by the "use template" action
    #[arg(long, global = true, env = "CHAT_TEMPLATE")]
    pub template: Option<String>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Where the interactive chat writes its log
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_starts_chat() {
        let cli = Cli::try_parse_from(["homework-chat"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_ask_collects_words_and_global_flags() {
        let cli = Cli::try_parse_from([
            "homework-chat",
            "ask",
            "what",
            "is",
            "osmosis",
            "--provider",
            "hf",
            "--max-tokens",
            "100",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Ask { message }) => assert_eq!(message.join(" "), "what is osmosis"),
            _ => panic!("expected ask"),
        }
        assert_eq!(cli.session.provider, Some(ProviderArg::HuggingFace));
        assert_eq!(cli.session.max_tokens, Some(100));
    }

    #[test]
    fn test_ask_requires_message() {
        assert!(Cli::try_parse_from(["homework-chat", "ask"]).is_err());
    }
}

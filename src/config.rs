use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::Path;

use crate::cli::{ProviderArg, SessionArgs};

pub const API_KEY_VAR: &str = "HF_API_KEY";

pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-72B-Instruct";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";
pub const DEFAULT_HF_BASE_URL: &str = "https://router.huggingface.co";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MAX_TOKENS: u32 = 250;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const SYSTEM_PROMPT: &str = "You are a helpful homework assistant for high school students. \
Provide clear, educational explanations that help students learn. \
Keep responses concise and encouraging.";

pub const DEFAULT_TEMPLATE: &str =
    "Explain [topic] to me like I'm in high school, with one worked example.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    HuggingFace,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::HuggingFace => "huggingface",
            Provider::Ollama => "ollama",
        }
    }

    /// Whether requests must carry an API key.
    pub fn needs_credential(&self) -> bool {
        matches!(self, Provider::HuggingFace)
    }
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::HuggingFace => Provider::HuggingFace,
            ProviderArg::Ollama => Provider::Ollama,
        }
    }
}

/// Settings for one chat session, fixed once the session starts.
#[derive(Clone, PartialEq)]
pub struct SessionConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub template: String,
}

impl SessionConfig {
    /// Defaults for a provider, with no credential.
    pub fn new(provider: Provider) -> Self {
        let (model, base_url) = match provider {
            Provider::HuggingFace => (DEFAULT_MODEL, DEFAULT_HF_BASE_URL),
            Provider::Ollama => (DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_BASE_URL),
        };

        Self {
            provider,
            api_key: None,
            model: model.to_string(),
            base_url: base_url.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = normalize_key(Some(api_key.into()));
        self
    }

    /// Resolve the session from command-line arguments and the environment.
    pub fn from_args(args: &SessionArgs) -> Result<Self> {
        let provider = args.provider.map(Provider::from).unwrap_or(Provider::HuggingFace);
        let mut config = Self::new(provider);

        if let Some(model) = &args.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &args.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(max_tokens) = args.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = args.temperature {
            config.temperature = temperature;
        }
        if let Some(template) = &args.template {
            config.template = template.clone();
        }
        if let Some(api_key) = resolve_api_key() {
            config = config.with_api_key(api_key);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            bail!("max tokens must be greater than zero");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            );
        }
        if self.model.trim().is_empty() {
            bail!("model identifier must not be empty");
        }
        Ok(())
    }

    /// True when the provider can be called with what we have.
    pub fn has_credential(&self) -> bool {
        !self.provider.needs_credential() || self.api_key.is_some()
    }

    fn masked_key(&self) -> String {
        match &self.api_key {
            Some(key) => {
                let visible: String = key.chars().take(4).collect();
                format!("{}****", visible)
            }
            None => "<not set>".to_string(),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.masked_key())
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "provider:      {}", self.provider.as_str())?;
        writeln!(f, "base url:      {}", self.base_url)?;
        writeln!(f, "model:         {}", self.model)?;
        writeln!(f, "api key:       {}", self.masked_key())?;
        writeln!(f, "max tokens:    {}", self.max_tokens)?;
        writeln!(f, "temperature:   {}", self.temperature)?;
        writeln!(f, "template:      {}", self.template)?;
        write!(f, "system prompt: {}", self.system_prompt)
    }
}

/// Load `path` if given, otherwise a `.env` in the working directory if one
/// exists. Variables already set in the process win.
pub fn load_env(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

/// The runtime environment takes precedence over a key baked in at build time.
fn resolve_api_key() -> Option<String> {
    normalize_key(std::env::var(API_KEY_VAR).ok())
        .or_else(|| normalize_key(option_env!("HF_API_KEY").map(str::to_string)))
}

fn normalize_key(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

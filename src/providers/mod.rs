//! LLM backends behind a single request/response interface.

mod chat;
mod cloud;
mod local;

pub use chat::{ChatMessage, ChatRequest, ChatResponse};
pub use cloud::CloudClient;
pub use local::LocalClient;

use crate::config::{AiProvider, Settings};
use crate::error::{ConfigurationError, GenerationError};
use tracing::info;

/// Sampling temperature sent with every request; low for repeatable output
pub const TEMPERATURE: f32 = 0.2;
/// Response length ceiling sent with every request
pub const MAX_TOKENS: u32 = 4096;

/// A model backend that turns a system + user message pair into text.
pub trait GenerationClient {
    fn complete(&self, system_message: &str, user_message: &str) -> Result<String, GenerationError>;
}

/// Builds the backend selected by the configuration.
///
/// Credential problems are reported here, before any request is made.
pub fn build_client(settings: &Settings) -> Result<Box<dyn GenerationClient>, ConfigurationError> {
    let provider = settings.provider()?;
    let client: Box<dyn GenerationClient> = match provider {
        AiProvider::OpenAi => Box::new(CloudClient::new(settings)?),
        AiProvider::Ollama => Box::new(LocalClient::new(settings)?),
    };
    info!(provider = provider.as_str(), model = %settings.ai_model, "generation client ready");
    Ok(client)
}

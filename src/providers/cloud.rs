use crate::config::Settings;
use crate::error::{ConfigurationError, GenerationError};
use crate::providers::chat::ChatEndpoint;
use crate::providers::GenerationClient;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Hosted chat-completions API
#[derive(Debug, Clone)]
pub struct CloudClient {
    endpoint: ChatEndpoint,
}

impl CloudClient {
    pub fn new(settings: &Settings) -> Result<Self, ConfigurationError> {
        Self::from_parts(
            settings.ai_base_url.as_deref(),
            &settings.ai_model,
            settings.api_key(),
            Duration::from_secs(settings.ai_timeout_secs),
        )
    }

    /// Builds the client from explicit parts. A missing or blank key is
    /// rejected here so no request is ever sent without one.
    pub fn from_parts(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigurationError::MissingApiKey("openai".to_string()))?;

        let endpoint = ChatEndpoint::new(
            base_url.unwrap_or(DEFAULT_BASE_URL),
            model,
            Some(api_key),
            timeout,
        )?;
        Ok(Self { endpoint })
    }

    pub fn url(&self) -> &str {
        self.endpoint.url()
    }
}

impl GenerationClient for CloudClient {
    fn complete(&self, system_message: &str, user_message: &str) -> Result<String, GenerationError> {
        self.endpoint.send(system_message, user_message)
    }
}

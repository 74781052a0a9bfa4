use crate::config::Settings;
use crate::error::{ConfigurationError, GenerationError};
use crate::providers::chat::ChatEndpoint;
use crate::providers::GenerationClient;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

/// Model server on the local machine; no credential needed
#[derive(Debug, Clone)]
pub struct LocalClient {
    endpoint: ChatEndpoint,
}

impl LocalClient {
    pub fn new(settings: &Settings) -> Result<Self, ConfigurationError> {
        let endpoint = ChatEndpoint::new(
            settings.ai_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            &settings.ai_model,
            None,
            Duration::from_secs(settings.ai_timeout_secs),
        )?;
        Ok(Self { endpoint })
    }

    pub fn url(&self) -> &str {
        self.endpoint.url()
    }

    pub fn model(&self) -> &str {
        self.endpoint.model()
    }
}

impl GenerationClient for LocalClient {
    fn complete(&self, system_message: &str, user_message: &str) -> Result<String, GenerationError> {
        self.endpoint.send(system_message, user_message)
    }
}

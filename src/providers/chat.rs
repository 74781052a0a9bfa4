use crate::error::{ConfigurationError, GenerationError};
use crate::providers::{MAX_TOKENS, TEMPERATURE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub(crate) struct ChatEndpoint {
    url: String,
    model: String,
    api_key: Option<String>,
    http: reqwest::blocking::Client,
}

impl ChatEndpoint {
    pub(crate) fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;

        Ok(Self {
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            http,
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    /// Sends one system + user exchange and returns the first choice's text.
    pub(crate) fn send(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        };

        debug!(url = %self.url, model = %self.model, "sending completion request");

        let mut builder = self.http.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|e| GenerationError::Transport {
            endpoint: self.url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                message: provider_message(&body),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::MalformedResponse("response contained no choices".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Extracts `error.message` from an error body, falling back to the raw text
fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};

    fn endpoint(server: &Server, api_key: Option<&str>) -> ChatEndpoint {
        ChatEndpoint::new(
            &server.url_str("/v1"),
            "gpt-test",
            api_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn returns_first_choice_content() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/v1/chat/completions"),
                request::headers(contains(key("authorization"))),
            ])
            .respond_with(json_encoded(serde_json::json!({
                "id": "test",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "RSpec.describe User do\nend"}}
                ]
            }))),
        );

        let text = endpoint(&server, Some("sk-test")).send("system", "user").unwrap();
        assert_eq!(text, "RSpec.describe User do\nend");
    }

    #[test]
    fn maps_http_errors_to_provider_errors() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .respond_with(
                    status_code(401).body(r#"{"error": {"message": "Invalid API key"}}"#),
                ),
        );

        let err = endpoint(&server, Some("bad")).send("s", "u").unwrap_err();
        match err {
            GenerationError::Provider { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("Expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn empty_choices_are_malformed() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .respond_with(json_encoded(serde_json::json!({"choices": []}))),
        );

        let err = endpoint(&server, None).send("s", "u").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        let endpoint = ChatEndpoint::new(
            "http://127.0.0.1:9",
            "m",
            None,
            Duration::from_secs(2),
        )
        .unwrap();
        let err = endpoint.send("s", "u").unwrap_err();
        assert!(matches!(err, GenerationError::Transport { .. }));
    }

    #[test]
    fn provider_message_falls_back_to_body_text() {
        assert_eq!(provider_message("upstream timeout"), "upstream timeout");
        assert_eq!(provider_message(""), "empty response body");
    }
}

use serde::{Deserialize, Serialize};

/// A system message plus a user message carrying the `{{code}}` and
/// `{{context}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Messages ready to send to a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system_message: String,
    pub user_message: String,
}

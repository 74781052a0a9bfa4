//! Project configuration loaded from `.testgen.yml`.
//!
//! The settings value is built once by the CLI and handed by reference to
//! every component that needs it.

use crate::data::{FileKind, PromptTemplate, TestFramework};
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILE: &str = ".testgen.yml";
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Which LLM backend serves completions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    /// Hosted chat-completions API, needs a credential
    OpenAi,
    /// Locally reachable model server
    Ollama,
}

impl FromStr for AiProvider {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "cloud" => Ok(AiProvider::OpenAi),
            "ollama" | "local" => Ok(AiProvider::Ollama),
            other => Err(ConfigurationError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl AiProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Ollama => "ollama",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub test_framework: TestFramework,
    /// Directories (relative to the project root) whose files are watched
    pub watch_paths: Vec<String>,
    /// Directories never considered for generation
    pub exclude_paths: Vec<String>,
    pub ai_provider: String,
    pub ai_model: String,
    pub ai_api_key: Option<String>,
    /// Overrides the provider's default endpoint base
    pub ai_base_url: Option<String>,
    pub ai_timeout_secs: u64,
    /// Ask for a context note before each generation in watch mode
    pub interactive_mode: bool,
    /// Run the freshly written test file after generation
    pub auto_run_tests: bool,
    pub coverage_threshold: f64,
    /// Quiet period used to group file events into one batch
    pub debounce_ms: u64,
    /// Per-kind overrides; a `null` entry disables generation for that kind
    pub prompt_templates: BTreeMap<FileKind, Option<PromptTemplate>>,
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            test_framework: TestFramework::Rspec,
            watch_paths: vec!["app".to_string(), "lib".to_string()],
            exclude_paths: ["vendor", "node_modules", "tmp", "log", "db", "config"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ai_provider: "openai".to_string(),
            ai_model: "gpt-4o-mini".to_string(),
            ai_api_key: None,
            ai_base_url: None,
            ai_timeout_secs: 120,
            interactive_mode: false,
            auto_run_tests: false,
            coverage_threshold: 80.0,
            debounce_ms: 300,
            prompt_templates: BTreeMap::new(),
            project_root: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Loads settings for the project at `project_root`.
    ///
    /// An explicit `config_path` must exist. Without one, a missing
    /// `.testgen.yml` yields the defaults.
    pub fn load(project_root: &Path, config_path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let (path, required) = match config_path {
            Some(p) => (p.to_path_buf(), true),
            None => (project_root.join(CONFIG_FILE), false),
        };

        let mut settings = if path.exists() || required {
            let content = fs::read_to_string(&path).map_err(|source| ConfigurationError::Read {
                path: path.clone(),
                source,
            })?;
            Self::from_yaml(&content).map_err(|source| ConfigurationError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            Settings::default()
        };

        settings.project_root = project_root.to_path_buf();
        // Surface an unsupported provider before anything else runs.
        settings.provider()?;
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(content)
    }

    /// Default configuration file contents written by `testgen init`
    pub fn default_yaml() -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&Settings::default())
    }

    pub fn provider(&self) -> Result<AiProvider, ConfigurationError> {
        self.ai_provider.parse()
    }

    /// Configured credential, falling back to `OPENAI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.ai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }
}

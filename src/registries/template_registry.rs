use crate::config::Settings;
use crate::data::{FileKind, PromptTemplate, TestFramework};
use std::collections::HashMap;

/// Prompt templates keyed by file kind.
///
/// Starts from the built-in templates for the configured framework and then
/// applies the overrides from the configuration file.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<FileKind, PromptTemplate>,
}

impl TemplateRegistry {
    /// Creates a registry holding the built-in template for every
    /// generatable kind
    pub fn with_defaults(framework: TestFramework) -> Self {
        let templates = FileKind::GENERATABLE
            .iter()
            .filter_map(|kind| default_template(*kind, framework).map(|t| (*kind, t)))
            .collect();
        Self { templates }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::with_defaults(settings.test_framework);
        for (kind, template) in &settings.prompt_templates {
            match template {
                Some(t) if *kind != FileKind::Unknown => {
                    registry.templates.insert(*kind, t.clone());
                }
                Some(_) => {}
                None => {
                    registry.templates.remove(kind);
                }
            }
        }
        registry
    }

    /// An empty registry; every render yields nothing
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn insert(&mut self, kind: FileKind, template: PromptTemplate) {
        self.templates.insert(kind, template);
    }

    pub fn get(&self, kind: FileKind) -> Option<&PromptTemplate> {
        self.templates.get(&kind)
    }
}

fn default_template(kind: FileKind, framework: TestFramework) -> Option<PromptTemplate> {
    let focus = match kind {
        FileKind::Model => {
            "ActiveRecord models. Cover validations, associations, scopes, callbacks \
             and public instance methods"
        }
        FileKind::Controller => {
            "Rails controllers. Cover every action, response status codes, redirects, \
             rendered templates, strong parameters and authorization branches"
        }
        FileKind::Job => {
            "ActiveJob background jobs. Cover enqueueing, the perform method, queue \
             names and error handling"
        }
        FileKind::Service => {
            "service objects. Cover the public interface, success and failure paths \
             and collaborator interactions"
        }
        FileKind::Helper => "view helpers. Cover each helper method and its formatting edge cases",
        FileKind::Mailer => {
            "ActionMailer mailers. Cover recipients, subjects, senders and the rendered body"
        }
        FileKind::Library => {
            "plain Ruby library code. Cover the public API and edge cases without \
             loading Rails"
        }
        FileKind::Unknown => return None,
    };

    let style = match framework {
        TestFramework::Rspec => {
            "Use RSpec with `describe`/`context`/`it` blocks, `let` for setup and \
             FactoryBot where records are needed"
        }
        TestFramework::Minitest => {
            "Use Minitest with `ActiveSupport::TestCase` style classes and `test \"...\" do` blocks"
        }
    };

    let system = format!(
        "You are an expert Ruby on Rails developer who writes thorough {} tests for {}. {}. \
         Respond with only the Ruby test file, no explanations.",
        framework.display_name(),
        focus,
        style
    );

    let user = format!(
        "Write a complete {} test file for the following {}.\n\n\
         Source code:\n```ruby\n{{{{code}}}}\n```\n\n\
         Additional context:\n{{{{context}}}}",
        framework.display_name(),
        kind
    );

    Some(PromptTemplate::new(system, user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_generatable_kind() {
        let registry = TemplateRegistry::with_defaults(TestFramework::Rspec);
        for kind in FileKind::GENERATABLE {
            let template = registry.get(kind).expect("template");
            assert!(template.user.contains("{{code}}"));
            assert!(template.user.contains("{{context}}"));
        }
        assert!(registry.get(FileKind::Unknown).is_none());
    }

    #[test]
    fn defaults_mention_the_framework() {
        let registry = TemplateRegistry::with_defaults(TestFramework::Minitest);
        let template = registry.get(FileKind::Model).unwrap();
        assert!(template.system.contains("Minitest"));
        assert!(template.user.contains("Minitest"));
    }

    #[test]
    fn settings_override_and_disable_templates() {
        let mut settings = Settings::default();
        settings.prompt_templates.insert(
            FileKind::Service,
            Some(PromptTemplate::new("custom system", "custom {{code}}")),
        );
        settings.prompt_templates.insert(FileKind::Helper, None);
        settings.prompt_templates.insert(
            FileKind::Unknown,
            Some(PromptTemplate::new("never", "{{code}}")),
        );

        let registry = TemplateRegistry::from_settings(&settings);
        assert_eq!(registry.get(FileKind::Service).unwrap().system, "custom system");
        assert!(registry.get(FileKind::Helper).is_none());
        assert!(registry.get(FileKind::Unknown).is_none());
        assert!(registry.get(FileKind::Model).is_some());
    }
}

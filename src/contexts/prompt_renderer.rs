use crate::data::{FileKind, RenderedPrompt};
use crate::registries::TemplateRegistry;

/// Substituted when no context could be assembled
pub const NO_CONTEXT: &str = "No additional context provided.";

/// Fills the per-kind prompt templates.
pub struct PromptRenderer {
    registry: TemplateRegistry,
}

impl PromptRenderer {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn has_template(&self, kind: FileKind) -> bool {
        self.registry.get(kind).is_some()
    }

    /// Renders the messages for one file.
    ///
    /// Returns `None` when no template is registered for `kind`; callers
    /// must skip the file rather than call the model.
    pub fn render(&self, kind: FileKind, source: &str, context: &str) -> Option<RenderedPrompt> {
        let template = self.registry.get(kind)?;
        let context = if context.trim().is_empty() {
            NO_CONTEXT
        } else {
            context
        };

        Some(RenderedPrompt {
            system_message: template.system.clone(),
            user_message: replace_placeholders(&template.user, source, context),
        })
    }
}

/// Replaces `{{code}}` and `{{context}}` in a single pass.
///
/// Substituted text is never rescanned, so a source file that happens to
/// contain a placeholder token is inserted verbatim. Unknown placeholders
/// are left untouched.
fn replace_placeholders(template: &str, code: &str, context: &str) -> String {
    let mut result = String::with_capacity(template.len() + code.len() + context.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(end_pos) = rest[start..].find("}}") else {
            break;
        };
        let end = start + end_pos;
        let replacement = match rest[start + 2..end].trim() {
            "code" => Some(code),
            "context" => Some(context),
            _ => None,
        };

        match replacement {
            Some(value) => {
                result.push_str(&rest[..start]);
                result.push_str(value);
                rest = &rest[end + 2..];
            }
            None => {
                // An unknown name may hide a real placeholder after its opening braces.
                result.push_str(&rest[..start + 2]);
                rest = &rest[start + 2..];
            }
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PromptTemplate, TestFramework};

    fn renderer_with(kind: FileKind, user: &str) -> PromptRenderer {
        let mut registry = TemplateRegistry::empty();
        registry.insert(kind, PromptTemplate::new("system text", user));
        PromptRenderer::new(registry)
    }

    #[test]
    fn substitutes_code_and_context() {
        let renderer = renderer_with(FileKind::Model, "Code:\n{{code}}\nContext: {{context}}");
        let prompt = renderer
            .render(FileKind::Model, "class User; end", "Users have accounts.")
            .unwrap();

        assert_eq!(prompt.system_message, "system text");
        assert_eq!(
            prompt.user_message,
            "Code:\nclass User; end\nContext: Users have accounts."
        );
    }

    #[test]
    fn blank_context_uses_sentinel() {
        let renderer = renderer_with(FileKind::Model, "{{code}} | {{context}}");
        let prompt = renderer.render(FileKind::Model, "x = 1", "  \n").unwrap();
        assert_eq!(prompt.user_message, format!("x = 1 | {}", NO_CONTEXT));
    }

    #[test]
    fn missing_template_renders_nothing() {
        let renderer = renderer_with(FileKind::Model, "{{code}}");
        assert!(renderer.render(FileKind::Controller, "x", "").is_none());

        let defaults = PromptRenderer::new(TemplateRegistry::with_defaults(TestFramework::Rspec));
        assert!(defaults.render(FileKind::Unknown, "x", "").is_none());
    }

    #[test]
    fn substituted_code_is_not_rescanned() {
        let renderer = renderer_with(FileKind::Library, "{{code}} / {{context}}");
        let prompt = renderer
            .render(FileKind::Library, "puts '{{context}}'", "ctx")
            .unwrap();
        assert_eq!(prompt.user_message, "puts '{{context}}' / ctx");
    }

    #[test]
    fn unknown_placeholders_survive() {
        assert_eq!(
            replace_placeholders("{{name}} {{code}} {{", "c", "x"),
            "{{name}} c {{"
        );
    }

    #[test]
    fn stray_opening_braces_do_not_swallow_a_placeholder() {
        assert_eq!(
            replace_placeholders("{{ see {{code}} and {{context}}", "c", "x"),
            "{{ see c and x"
        );
        assert_eq!(replace_placeholders("{{{{code}}}}", "c", "x"), "{{c}}");
    }

    #[test]
    fn default_templates_leave_no_placeholder_behind() {
        let renderer = PromptRenderer::new(TemplateRegistry::with_defaults(TestFramework::Rspec));
        for kind in FileKind::GENERATABLE {
            let prompt = renderer.render(kind, "class Foo; end", "").unwrap();
            assert!(prompt.user_message.contains("class Foo; end"));
            assert!(prompt.user_message.contains(NO_CONTEXT));
            assert!(!prompt.user_message.contains("{{"));
        }
    }
}

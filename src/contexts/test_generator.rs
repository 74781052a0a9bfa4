use crate::config::Settings;
use crate::contexts::{merge_notes, ContextBuilder, ContextPrompt, PostProcessor, PromptRenderer};
use crate::data::{test_path_for, FileKind, SourceFile, TestFramework};
use crate::error::PipelineError;
use crate::providers::GenerationClient;
use crate::registries::TemplateRegistry;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Why a file produced no test. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownKind,
    NoTestPath,
    NoTemplate,
    EmptyResponse,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::UnknownKind => write!(f, "not a recognized Rails file"),
            SkipReason::NoTestPath => write!(f, "no conventional test location"),
            SkipReason::NoTemplate => write!(f, "no prompt template configured"),
            SkipReason::EmptyResponse => write!(f, "nothing generated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The test file was written (overwriting any previous version)
    Written { kind: FileKind, test_path: PathBuf },
    /// Dry run: everything up to the model call succeeded
    Planned { kind: FileKind, test_path: PathBuf },
    Skipped(SkipReason),
}

/// Runs the classify → context → prompt → model → clean → write pipeline
/// for one file.
pub struct TestGenerator {
    project_root: PathBuf,
    framework: TestFramework,
    context_builder: ContextBuilder,
    renderer: PromptRenderer,
    client: Box<dyn GenerationClient>,
    post_processor: PostProcessor,
    prompt: Option<Box<dyn ContextPrompt>>,
    dry_run: bool,
}

impl TestGenerator {
    pub fn new(settings: &Settings, client: Box<dyn GenerationClient>) -> Self {
        Self {
            project_root: settings.project_root.clone(),
            framework: settings.test_framework,
            context_builder: ContextBuilder::new(settings.project_root.clone()),
            renderer: PromptRenderer::new(TemplateRegistry::from_settings(settings)),
            client,
            post_processor: PostProcessor::new(settings.test_framework),
            prompt: None,
            dry_run: false,
        }
    }

    pub fn with_post_processor(mut self, post_processor: PostProcessor) -> Self {
        self.post_processor = post_processor;
        self
    }

    pub fn with_context_prompt(mut self, prompt: Box<dyn ContextPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Generates the test for `path` (relative to the project root).
    pub fn generate(&self, path: &Path, note: Option<&str>) -> Result<GenerationOutcome, PipelineError> {
        let source = SourceFile::read(&self.project_root, path)?;
        if source.kind == FileKind::Unknown {
            debug!("skipping {}: unknown file kind", path.display());
            return Ok(GenerationOutcome::Skipped(SkipReason::UnknownKind));
        }

        let Some(test_path) = test_path_for(&source.path, source.kind, self.framework) else {
            return Ok(GenerationOutcome::Skipped(SkipReason::NoTestPath));
        };

        if !self.renderer.has_template(source.kind) {
            debug!("skipping {}: no template for {}", path.display(), source.kind);
            return Ok(GenerationOutcome::Skipped(SkipReason::NoTemplate));
        }

        // The operator is only asked about files that will reach the model.
        let asked = match &self.prompt {
            Some(prompt) if !self.dry_run => prompt.ask(path),
            _ => None,
        };
        let note = merge_notes(note, asked);

        let context = self.context_builder.build(&source.path, &source.content, note.as_deref());
        let Some(prompt) = self.renderer.render(source.kind, &source.content, &context) else {
            return Ok(GenerationOutcome::Skipped(SkipReason::NoTemplate));
        };

        if self.dry_run {
            return Ok(GenerationOutcome::Planned {
                kind: source.kind,
                test_path,
            });
        }

        info!("generating {} test for {}", source.kind, path.display());
        let raw = self
            .client
            .complete(&prompt.system_message, &prompt.user_message)?;

        let Some(content) = self.post_processor.clean(Some(&raw), source.kind) else {
            return Ok(GenerationOutcome::Skipped(SkipReason::EmptyResponse));
        };

        let output_path = self.project_root.join(&test_path);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        fs::write(&output_path, content).map_err(|e| PipelineError::io(&output_path, e))?;
        info!("wrote {}", test_path.display());

        Ok(GenerationOutcome::Written {
            kind: source.kind,
            test_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::NoSyntaxCheck;
    use crate::error::GenerationError;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FixedClient {
        reply: Result<String, String>,
        calls: Rc<Cell<usize>>,
    }

    impl GenerationClient for FixedClient {
        fn complete(&self, _system: &str, _user: &str) -> Result<String, GenerationError> {
            self.calls.set(self.calls.get() + 1);
            self.reply
                .clone()
                .map_err(|message| GenerationError::Provider { status: 500, message })
        }
    }

    fn generator(root: &Path, reply: Result<&str, &str>) -> (TestGenerator, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let settings = Settings {
            project_root: root.to_path_buf(),
            ..Settings::default()
        };
        let client = FixedClient {
            reply: reply.map(str::to_string).map_err(str::to_string),
            calls: calls.clone(),
        };
        let generator = TestGenerator::new(&settings, Box::new(client)).with_post_processor(
            PostProcessor::with_checker(TestFramework::Rspec, Box::new(NoSyntaxCheck)),
        );
        (generator, calls)
    }

    fn write_source(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (generator, calls) = generator(dir.path(), Ok("x"));
        let err = generator.generate(Path::new("app/models/ghost.rb"), None).unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn empty_response_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "app/models/user.rb", "class User < ApplicationRecord\nend\n");
        let (generator, calls) = generator(dir.path(), Ok("```ruby\n```"));

        let outcome = generator.generate(Path::new("app/models/user.rb"), None).unwrap();
        assert_eq!(outcome, GenerationOutcome::Skipped(SkipReason::EmptyResponse));
        assert_eq!(calls.get(), 1);
        assert!(!dir.path().join("spec/models/user_spec.rb").exists());
    }

    #[test]
    fn dry_run_stops_before_the_model() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "app/jobs/sync_job.rb", "class SyncJob < ApplicationJob\nend\n");
        let (generator, calls) = generator(dir.path(), Ok("unused"));
        let generator = generator.with_dry_run(true);

        let outcome = generator.generate(Path::new("app/jobs/sync_job.rb"), None).unwrap();
        assert_eq!(
            outcome,
            GenerationOutcome::Planned {
                kind: FileKind::Job,
                test_path: PathBuf::from("spec/jobs/sync_job_spec.rb"),
            }
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn rewrites_existing_test_file() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "app/helpers/users_helper.rb", "module UsersHelper\nend\n");
        write_source(dir.path(), "spec/helpers/users_helper_spec.rb", "old content");
        let (generator, _) = generator(dir.path(), Ok("RSpec.describe UsersHelper do\nend"));

        generator.generate(Path::new("app/helpers/users_helper.rb"), None).unwrap();
        let written = fs::read_to_string(dir.path().join("spec/helpers/users_helper_spec.rb")).unwrap();
        assert!(!written.contains("old content"));
        assert!(written.ends_with("RSpec.describe UsersHelper do\nend\n"));
    }

    struct CountingPrompt {
        asked: Rc<Cell<usize>>,
    }

    impl ContextPrompt for CountingPrompt {
        fn ask(&self, _path: &Path) -> Option<String> {
            self.asked.set(self.asked.get() + 1);
            Some("Refunds are partial".to_string())
        }
    }

    struct RecordingClient {
        prompts: Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl GenerationClient for RecordingClient {
        fn complete(&self, _system: &str, user: &str) -> Result<String, GenerationError> {
            self.prompts.borrow_mut().push(user.to_string());
            Ok("RSpec.describe Refund do\nend".to_string())
        }
    }

    #[test]
    fn asked_note_is_merged_with_the_fixed_note() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "app/models/refund.rb", "class Refund < ApplicationRecord\nend\n");
        let settings = Settings {
            project_root: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let prompts = Rc::new(std::cell::RefCell::new(Vec::new()));
        let asked = Rc::new(Cell::new(0));
        let generator = TestGenerator::new(&settings, Box::new(RecordingClient { prompts: prompts.clone() }))
            .with_post_processor(PostProcessor::with_checker(TestFramework::Rspec, Box::new(NoSyntaxCheck)))
            .with_context_prompt(Box::new(CountingPrompt { asked: asked.clone() }));

        generator
            .generate(Path::new("app/models/refund.rb"), Some("Billing domain"))
            .unwrap();

        assert_eq!(asked.get(), 1);
        assert!(prompts.borrow()[0].contains("Billing domain\n\nRefunds are partial"));
    }

    #[test]
    fn operator_is_not_asked_when_nothing_reaches_the_model() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "app/jobs/sync_job.rb", "class SyncJob < ApplicationJob\nend\n");
        write_source(dir.path(), "app/mailers/user_mailer.rb", "class UserMailer < ApplicationMailer\nend\n");
        let asked = Rc::new(Cell::new(0));

        let (dry, _) = generator(dir.path(), Ok("unused"));
        let dry = dry
            .with_dry_run(true)
            .with_context_prompt(Box::new(CountingPrompt { asked: asked.clone() }));
        dry.generate(Path::new("app/jobs/sync_job.rb"), None).unwrap();

        let mut settings = Settings {
            project_root: dir.path().to_path_buf(),
            ..Settings::default()
        };
        settings.prompt_templates.insert(FileKind::Mailer, None);
        let untemplated = TestGenerator::new(&settings, Box::new(RecordingClient { prompts: Rc::default() }))
            .with_context_prompt(Box::new(CountingPrompt { asked: asked.clone() }));
        let outcome = untemplated
            .generate(Path::new("app/mailers/user_mailer.rb"), None)
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Skipped(SkipReason::NoTemplate));
        assert_eq!(asked.get(), 0);
    }

    #[test]
    fn provider_failure_surfaces_as_generation_error() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "app/services/charge.rb", "class Charge\nend\n");
        let (generator, _) = generator(dir.path(), Err("overloaded"));

        let err = generator.generate(Path::new("app/services/charge.rb"), None).unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }
}

use crate::data::{FileKind, SupportFile, TestFramework};
use regex::Regex;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const FROZEN_STRING_PRAGMA: &str = "# frozen_string_literal: true";

/// Tokens showing a generated test depends on the Rails application
const RAILS_INDICATORS: &[&str] = &[
    "Rails",
    "ActiveRecord",
    "ApplicationRecord",
    "ActionController",
    "ApplicationController",
    "ActionDispatch",
    "ActiveJob",
    "ApplicationJob",
    "ActionMailer",
    "ApplicationMailer",
    "ActiveSupport",
    "type: :model",
    "type: :controller",
    "type: :request",
    "type: :job",
    "type: :mailer",
    "type: :helper",
    "validate_presence_of",
    "validate_uniqueness_of",
    "belong_to",
    "have_many",
    "have_one",
    "have_and_belong_to_many",
    "FactoryBot",
];

/// Best-effort syntax validation of generated Ruby
pub trait SyntaxCheck {
    /// Returns the parser's complaint when the source does not parse.
    fn check(&self, source: &str) -> Result<(), String>;
}

/// Runs `ruby -c` on the generated text. A missing interpreter is not a
/// failure; the check is simply skipped.
pub struct RubySyntaxCheck;

impl SyntaxCheck for RubySyntaxCheck {
    fn check(&self, source: &str) -> Result<(), String> {
        let mut child = match Command::new("ruby")
            .arg("-c")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!("skipping syntax check, ruby unavailable: {}", e);
                return Ok(());
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(source.as_bytes()) {
                debug!("skipping syntax check, failed to write to ruby: {}", e);
                return Ok(());
            }
        }

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => {
                debug!("skipping syntax check, failed to read ruby output: {}", e);
                return Ok(());
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

/// Accepts everything
pub struct NoSyntaxCheck;

impl SyntaxCheck for NoSyntaxCheck {
    fn check(&self, _source: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Turns raw model output into a test file.
pub struct PostProcessor {
    framework: TestFramework,
    checker: Box<dyn SyntaxCheck>,
}

impl PostProcessor {
    pub fn new(framework: TestFramework) -> Self {
        Self::with_checker(framework, Box::new(RubySyntaxCheck))
    }

    pub fn with_checker(framework: TestFramework, checker: Box<dyn SyntaxCheck>) -> Self {
        Self { framework, checker }
    }

    /// Cleans a model response.
    ///
    /// Returns `None` when there is nothing to write. Cleaning an already
    /// cleaned text returns it unchanged.
    pub fn clean(&self, raw: Option<&str>, kind: FileKind) -> Option<String> {
        let body = strip_fences(raw?);
        if body.is_empty() {
            return None;
        }

        let require = if self.references_support_file(body) {
            None
        } else {
            Some(self.framework.require_line(self.support_file_for(body, kind)))
        };

        let (header, rest) = split_magic_header(body);
        let mut sections: Vec<&str> = vec![header.unwrap_or(FROZEN_STRING_PRAGMA)];
        if let Some(require) = require.as_deref() {
            sections.push(require);
        }
        if !rest.is_empty() {
            sections.push(rest);
        }

        let mut cleaned = sections.join("\n\n");
        cleaned.push('\n');

        if let Err(message) = self.checker.check(&cleaned) {
            warn!("generated test may contain syntax errors: {}", message);
        }

        Some(cleaned)
    }

    fn references_support_file(&self, body: &str) -> bool {
        support_require_regex(self.framework).is_match(body)
    }

    fn support_file_for(&self, body: &str, kind: FileKind) -> SupportFile {
        if kind.is_framework_integrated() || RAILS_INDICATORS.iter().any(|t| body.contains(t)) {
            SupportFile::FullApplication
        } else {
            SupportFile::Plain
        }
    }
}

/// Matches a `require` of either support file, with or without a relative path.
fn support_require_regex(framework: TestFramework) -> &'static Regex {
    static RSPEC: OnceLock<Regex> = OnceLock::new();
    static MINITEST: OnceLock<Regex> = OnceLock::new();
    let cell = match framework {
        TestFramework::Rspec => &RSPEC,
        TestFramework::Minitest => &MINITEST,
    };
    cell.get_or_init(|| {
        let names = [SupportFile::FullApplication, SupportFile::Plain]
            .map(|kind| regex::escape(framework.support_file(kind)))
            .join("|");
        Regex::new(&format!(
            r#"(?m)^\s*require(?:_relative)?[\s(]+['"](?:[\w.-]*/)*(?:{})(?:\.rb)?['"]"#,
            names
        ))
        .expect("valid support require regex")
    })
}

/// Splits off the leading comment block when it carries the
/// `frozen_string_literal` magic comment. Ruby only honours the pragma there.
fn split_magic_header(body: &str) -> (Option<&str>, &str) {
    let mut end = 0;
    let mut has_pragma = false;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if !trimmed.starts_with('#') {
            break;
        }
        if trimmed.contains("frozen_string_literal:") {
            has_pragma = true;
        }
        end += line.len();
    }

    if has_pragma {
        (Some(body[..end].trim_end()), body[end..].trim_start())
    } else {
        (None, body)
    }
}

/// Removes a leading fence line (with or without a language tag) and a
/// trailing fence, then trims.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => "",
        };
    }
    if let Some(stripped) = text.trim_end().strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

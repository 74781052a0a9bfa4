use crate::data::TestFramework;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Architectural role of a source file, derived from where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Model,
    Controller,
    Job,
    Service,
    Helper,
    Mailer,
    Library,
    Unknown,
}

/// Classification rules, checked in order. The first match wins.
const RULES: [(&str, FileKind); 7] = [
    ("app/models/", FileKind::Model),
    ("app/controllers/", FileKind::Controller),
    ("app/jobs/", FileKind::Job),
    ("app/services/", FileKind::Service),
    ("app/helpers/", FileKind::Helper),
    ("app/mailers/", FileKind::Mailer),
    ("lib/", FileKind::Library),
];

impl FileKind {
    /// Every kind that can carry a prompt template
    pub const GENERATABLE: [FileKind; 7] = [
        FileKind::Model,
        FileKind::Controller,
        FileKind::Job,
        FileKind::Service,
        FileKind::Helper,
        FileKind::Mailer,
        FileKind::Library,
    ];

    /// Classifies a path by its directory segments.
    pub fn classify(path: &Path) -> FileKind {
        let normalized = normalize(path);
        RULES
            .iter()
            .find(|(pattern, _)| segment_position(&normalized, pattern).is_some())
            .map(|(_, kind)| *kind)
            .unwrap_or(FileKind::Unknown)
    }

    /// Kinds whose tests need the full Rails application loaded
    pub fn is_framework_integrated(self) -> bool {
        !matches!(self, FileKind::Library | FileKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Model => "model",
            FileKind::Controller => "controller",
            FileKind::Job => "job",
            FileKind::Service => "service",
            FileKind::Helper => "helper",
            FileKind::Mailer => "mailer",
            FileKind::Library => "library",
            FileKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the companion test path for a source file.
///
/// Maps:
/// - app/models/user.rb → spec/models/user_spec.rb (RSpec)
/// - app/models/user.rb → test/models/user_test.rb (Minitest)
/// - lib/util.rb → spec/lib/util_spec.rb
///
/// Returns `None` for `Unknown` or when the path lacks the anchoring segment.
pub fn test_path_for(path: &Path, kind: FileKind, framework: TestFramework) -> Option<PathBuf> {
    let anchor = match kind {
        FileKind::Unknown => return None,
        FileKind::Library => "lib/",
        _ => "app/",
    };

    let normalized = normalize(path);
    let start = segment_position(&normalized, anchor)?;
    let prefix = &normalized[..start];
    let rest = &normalized[start + anchor.len()..];

    let test_root = match kind {
        FileKind::Library => format!("{}/lib/", framework.test_root()),
        _ => format!("{}/", framework.test_root()),
    };

    let (dir, file_name) = match rest.rsplit_once('/') {
        Some((dir, file_name)) => (format!("{}/", dir), file_name),
        None => (String::new(), rest),
    };
    if file_name.is_empty() {
        return None;
    }

    let test_file_name = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            format!("{}{}.{}", stem, framework.file_suffix(), ext)
        }
        _ => format!("{}{}", file_name, framework.file_suffix()),
    };

    Some(PathBuf::from(format!(
        "{}{}{}{}",
        prefix, test_root, dir, test_file_name
    )))
}

/// True for files that are themselves tests, by location or by name.
pub fn is_test_file(path: &Path) -> bool {
    let normalized = normalize(path);
    if segment_position(&normalized, "spec/").is_some()
        || segment_position(&normalized, "test/").is_some()
    {
        return true;
    }

    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| stem.ends_with("_spec") || stem.ends_with("_test"))
        .unwrap_or(false)
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Byte offset where `pattern` starts as a whole directory segment.
fn segment_position(path: &str, pattern: &str) -> Option<usize> {
    if path.starts_with(pattern) {
        return Some(0);
    }
    path.find(&format!("/{}", pattern)).map(|i| i + 1)
}

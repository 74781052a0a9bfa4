use crate::data::FileKind;
use regex::Regex;
use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const MIGRATIONS_DIR: &str = "db/migrate";
const ROUTES_FILE: &str = "config/routes.rb";
const RECENT_MIGRATIONS: usize = 3;

/// Project-wide findings, scanned once per builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ProjectContext {
    recent_migrations: Vec<String>,
    has_routes: bool,
}

/// Assembles the free-text context handed to the model next to the source.
///
/// The project scan is memoized: the first file that needs it pays for the
/// directory listing, every later file in the same run reuses it.
pub struct ContextBuilder {
    project_root: PathBuf,
    project: OnceCell<ProjectContext>,
}

impl ContextBuilder {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            project: OnceCell::new(),
        }
    }

    /// Builds the context for one file. Never fails; with no signal at all
    /// the result is empty.
    pub fn build(&self, path: &Path, source: &str, user_note: Option<&str>) -> String {
        let note = user_note.map(str::trim).filter(|n| !n.is_empty());
        let project = self.project_context_for(FileKind::classify(path));
        let related = file_context(source);

        [note.map(str::to_string), project, related]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn project_context_for(&self, kind: FileKind) -> Option<String> {
        match kind {
            FileKind::Model => {
                let migrations = &self.project().recent_migrations;
                if migrations.is_empty() {
                    return None;
                }
                let lines: Vec<String> = migrations.iter().map(|m| format!("- {}", m)).collect();
                Some(format!("Recent migrations:\n{}", lines.join("\n")))
            }
            FileKind::Controller if self.project().has_routes => {
                Some(format!("Routes are defined in {}.", ROUTES_FILE))
            }
            _ => None,
        }
    }

    fn project(&self) -> &ProjectContext {
        self.project.get_or_init(|| {
            let context = ProjectContext {
                recent_migrations: recent_migrations(&self.project_root.join(MIGRATIONS_DIR)),
                has_routes: self.project_root.join(ROUTES_FILE).is_file(),
            };
            debug!(
                migrations = context.recent_migrations.len(),
                routes = context.has_routes,
                "scanned project context"
            );
            context
        })
    }
}

/// The last few migration file names in lexicographic order
fn recent_migrations(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rb"))
        .filter_map(|path| path.file_name().and_then(|s| s.to_str()).map(str::to_string))
        .collect();
    names.sort();

    let skip = names.len().saturating_sub(RECENT_MIGRATIONS);
    names.split_off(skip)
}

fn relationship_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*((?:belongs_to|has_many|has_one|has_and_belongs_to_many)[ \t]+:\w+|(?:include|extend|prepend)[ \t]+[A-Z][\w:]*|class[ \t]+[A-Z][\w:]*[ \t]*<[ \t]*[A-Z][\w:]*)",
        )
        .expect("valid relationship regex")
    })
}

/// Association, inclusion and inheritance declarations found in the source
fn file_context(source: &str) -> Option<String> {
    let mut found: Vec<&str> = Vec::new();
    for caps in relationship_regex().captures_iter(source) {
        if let Some(token) = caps.get(1).map(|m| m.as_str()) {
            if !found.contains(&token) {
                found.push(token);
            }
        }
    }

    if found.is_empty() {
        return None;
    }

    let lines: Vec<String> = found.iter().map(|t| format!("- {}", t)).collect();
    Some(format!("Related declarations in this file:\n{}", lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_MODEL: &str = r#"class User < ApplicationRecord
  include Searchable
  belongs_to :account
  has_many :posts
  has_many :posts
  validates :email, presence: true
end
"#;

    fn project_with_migrations(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let migrate = dir.path().join(MIGRATIONS_DIR);
        fs::create_dir_all(&migrate).unwrap();
        for name in names {
            fs::write(migrate.join(name), "").unwrap();
        }
        dir
    }

    #[test]
    fn reports_relationship_tokens_in_order_without_duplicates() {
        let context = file_context(USER_MODEL).unwrap();
        assert_eq!(
            context,
            "Related declarations in this file:\n\
             - class User < ApplicationRecord\n\
             - include Searchable\n\
             - belongs_to :account\n\
             - has_many :posts"
        );
    }

    #[test]
    fn plain_ruby_has_no_file_context() {
        assert!(file_context("module Util\n  def self.pad(s) = s\nend\n").is_none());
    }

    #[test]
    fn model_context_lists_last_three_migrations() {
        let dir = project_with_migrations(&[
            "20240101000000_create_users.rb",
            "20240301000000_add_email_to_users.rb",
            "20240201000000_create_posts.rb",
            "20240401000000_create_accounts.rb",
            "README.md",
        ]);
        let builder = ContextBuilder::new(dir.path());

        let context = builder.build(Path::new("app/models/user.rb"), "", None);
        assert_eq!(
            context,
            "Recent migrations:\n\
             - 20240201000000_create_posts.rb\n\
             - 20240301000000_add_email_to_users.rb\n\
             - 20240401000000_create_accounts.rb"
        );
    }

    #[test]
    fn controller_context_notes_routes_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join(ROUTES_FILE), "Rails.application.routes.draw {}").unwrap();
        let builder = ContextBuilder::new(dir.path());

        let context = builder.build(Path::new("app/controllers/users_controller.rb"), "", None);
        assert_eq!(context, "Routes are defined in config/routes.rb.");

        // Migrations are only reported for models.
        let lib = builder.build(Path::new("lib/util.rb"), "", None);
        assert!(lib.is_empty());
    }

    #[test]
    fn joins_blocks_with_blank_lines_in_order() {
        let dir = project_with_migrations(&["20240101000000_create_users.rb"]);
        let builder = ContextBuilder::new(dir.path());

        let context = builder.build(
            Path::new("app/models/user.rb"),
            USER_MODEL,
            Some("  Users must belong to exactly one account.  "),
        );
        let blocks: Vec<&str> = context.split("\n\n").collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], "Users must belong to exactly one account.");
        assert!(blocks[1].starts_with("Recent migrations:"));
        assert!(blocks[2].starts_with("Related declarations in this file:"));
    }

    #[test]
    fn empty_signals_give_empty_context() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ContextBuilder::new(dir.path());
        assert_eq!(builder.build(Path::new("app/models/user.rb"), "", Some("   ")), "");
    }

    #[test]
    fn project_scan_is_memoized() {
        let dir = project_with_migrations(&["20240101000000_create_users.rb"]);
        let builder = ContextBuilder::new(dir.path());
        let first = builder.build(Path::new("app/models/user.rb"), "", None);

        fs::write(
            dir.path().join(MIGRATIONS_DIR).join("20250101000000_create_orders.rb"),
            "",
        )
        .unwrap();
        let second = builder.build(Path::new("app/models/user.rb"), "", None);
        assert_eq!(first, second);
    }
}

use serde::{Deserialize, Serialize};

/// The Ruby test framework generated files target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFramework {
    #[default]
    Rspec,
    Minitest,
}

/// Which bootstrap file a generated test requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportFile {
    /// Boots the whole Rails application
    FullApplication,
    /// Loads only the test framework
    Plain,
}

impl TestFramework {
    /// Top-level directory holding this framework's tests
    pub fn test_root(self) -> &'static str {
        match self {
            TestFramework::Rspec => "spec",
            TestFramework::Minitest => "test",
        }
    }

    /// Suffix appended to the source file stem
    pub fn file_suffix(self) -> &'static str {
        match self {
            TestFramework::Rspec => "_spec",
            TestFramework::Minitest => "_test",
        }
    }

    pub fn support_file(self, kind: SupportFile) -> &'static str {
        match (self, kind) {
            (TestFramework::Rspec, SupportFile::FullApplication) => "rails_helper",
            (TestFramework::Rspec, SupportFile::Plain) => "spec_helper",
            (TestFramework::Minitest, SupportFile::FullApplication) => "test_helper",
            (TestFramework::Minitest, SupportFile::Plain) => "minitest/autorun",
        }
    }

    /// The `require` line for a support file
    pub fn require_line(self, kind: SupportFile) -> String {
        format!("require '{}'", self.support_file(kind))
    }

    /// Human-readable name used in prompts and console output
    pub fn display_name(self) -> &'static str {
        match self {
            TestFramework::Rspec => "RSpec",
            TestFramework::Minitest => "Minitest",
        }
    }
}

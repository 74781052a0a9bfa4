mod change_set;
mod file_kind;
mod framework;
mod prompt_template;
mod source_file;

pub use change_set::ChangeSet;
pub use file_kind::{is_test_file, test_path_for, FileKind};
pub use framework::{SupportFile, TestFramework};
pub use prompt_template::{PromptTemplate, RenderedPrompt};
pub use source_file::SourceFile;

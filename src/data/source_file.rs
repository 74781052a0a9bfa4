use crate::data::FileKind;
use crate::error::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot of a source file taken when generation starts
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root
    pub path: PathBuf,
    pub content: String,
    pub kind: FileKind,
}

impl SourceFile {
    /// Reads `path` (relative to `project_root`) and classifies it.
    pub fn read(project_root: &Path, path: &Path) -> Result<Self, PipelineError> {
        let full_path = project_root.join(path);
        if !full_path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(&full_path).map_err(|e| PipelineError::io(&full_path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            content,
            kind: FileKind::classify(path),
        })
    }
}

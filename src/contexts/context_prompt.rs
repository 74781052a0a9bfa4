use std::io::{self, BufRead, Write};
use std::path::Path;

/// Asks the operator for an optional note before a file is generated
pub trait ContextPrompt {
    fn ask(&self, path: &Path) -> Option<String>;
}

/// Reads a single line from stdin; an empty line means "no note"
pub struct StdinContextPrompt;

impl ContextPrompt for StdinContextPrompt {
    fn ask(&self, path: &Path) -> Option<String> {
        print!(
            "Business context for {} (press Enter to skip): ",
            path.display()
        );
        io::stdout().flush().ok()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

/// Joins the run-wide note with the one asked for a single file.
pub fn merge_notes(fixed: Option<&str>, asked: Option<String>) -> Option<String> {
    let fixed = fixed.map(str::trim).filter(|n| !n.is_empty());
    match (fixed, asked) {
        (Some(fixed), Some(asked)) => Some(format!("{}\n\n{}", fixed, asked)),
        (fixed, asked) => fixed.map(str::to_string).or(asked),
    }
}

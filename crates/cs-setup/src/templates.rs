// templates.rs — Slash-command templates written into the commands directory.
//
// Templates are only written when missing so local edits survive updates.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SetupError;

/// `(file name, body)` for every shipped command template.
pub const COMMAND_TEMPLATES: &[(&str, &str)] = &[
    (
        "generate-tests.md",
        "# Generate Tests\n\n\
         Write tests for $ARGUMENTS.\n\n\
         1. Read the code under test and the existing tests next to it.\n\
         2. Cover the happy path, edge cases and error handling.\n\
         3. Follow the project's existing test framework and naming.\n\
         4. Run the tests and fix failures before finishing.\n",
    ),
    (
        "plan-feature.md",
        "# Plan Feature\n\n\
         Produce an implementation plan for: $ARGUMENTS\n\n\
         - List the files that will change and why.\n\
         - Call out data model or API changes.\n\
         - Identify risks and open questions.\n\
         - Do not write code yet.\n",
    ),
    (
        "review-code.md",
        "# Review Code\n\n\
         Review $ARGUMENTS (or the current diff when empty).\n\n\
         Check correctness, error handling, naming, test coverage and security.\n\
         Report findings grouped by severity with file and line references.\n",
    ),
    (
        "fix-github-issue.md",
        "# Fix GitHub Issue\n\n\
         Fix issue #$ARGUMENTS.\n\n\
         1. Read the issue with `gh issue view $ARGUMENTS`.\n\
         2. Reproduce the problem, ideally with a failing test.\n\
         3. Implement the smallest fix that makes the test pass.\n\
         4. Summarize the root cause and the change.\n",
    ),
    (
        "debug-logs.md",
        "# Debug Logs\n\n\
         Investigate the failure described in $ARGUMENTS.\n\n\
         Read the relevant logs, correlate timestamps with recent changes and\n\
         propose the most likely root cause before changing any code.\n",
    ),
    (
        "refactor-code.md",
        "# Refactor Code\n\n\
         Refactor $ARGUMENTS without changing behavior.\n\n\
         Keep each step small, run the tests after every step and stop if a\n\
         test starts failing.\n",
    ),
];

/// Write every template that does not exist yet; returns the files written.
pub fn write_missing(commands_dir: &Path) -> Result<Vec<PathBuf>, SetupError> {
    fs::create_dir_all(commands_dir).map_err(|e| SetupError::io(commands_dir, e))?;
    let mut written = Vec::new();
    for (name, body) in COMMAND_TEMPLATES {
        let path = commands_dir.join(name);
        if path.exists() {
            tracing::debug!(path = %path.display(), "preserving existing command template");
            continue;
        }
        fs::write(&path, body).map_err(|e| SetupError::io(&path, e))?;
        written.push(path);
    }
    if !written.is_empty() {
        tracing::info!(count = written.len(), "command templates written");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_all_templates_into_fresh_dir() {
        let dir = TempDir::new().unwrap();
        let commands = dir.path().join(".claude/commands");
        let written = write_missing(&commands).unwrap();
        assert_eq!(written.len(), COMMAND_TEMPLATES.len());
        assert!(commands.join("review-code.md").is_file());
    }

    #[test]
    fn existing_templates_are_not_overwritten() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plan-feature.md"), "my plan").unwrap();
        let written = write_missing(dir.path()).unwrap();
        assert_eq!(written.len(), COMMAND_TEMPLATES.len() - 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("plan-feature.md")).unwrap(),
            "my plan"
        );
        assert!(write_missing(dir.path()).unwrap().is_empty());
    }
}

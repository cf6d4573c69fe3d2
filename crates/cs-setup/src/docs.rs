// docs.rs — Documentation sink: where `fetch documentation` actions go.
//
// Retrieving framework documentation over the network is outside this crate.
// The executor hands the framework list to a `DocumentationSink`; the default
// `StubDocumentation` writes per-framework placeholders and the combined
// `parsed-docs.md` so freshness tracking has a file to look at.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::SetupError;
use crate::layout::ProjectPaths;

/// Receives documentation requests for a project's frameworks.
pub trait DocumentationSink {
    /// Produce documentation for `frameworks`; returns the files written.
    fn fetch(&self, paths: &ProjectPaths, frameworks: &[String]) -> Result<Vec<PathBuf>, SetupError>;

    /// Sink name for logs.
    fn name(&self) -> &str;
}

/// Offline sink that writes placeholder documentation.
#[derive(Debug, Default)]
pub struct StubDocumentation {
    generated_at: Option<DateTime<Utc>>,
}

impl StubDocumentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the "generated on" stamp (tests).
    pub fn at(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at: Some(generated_at),
        }
    }
}

impl DocumentationSink for StubDocumentation {
    fn fetch(&self, paths: &ProjectPaths, frameworks: &[String]) -> Result<Vec<PathBuf>, SetupError> {
        let fetched_dir = paths.docs_dir.join("fetched");
        fs::create_dir_all(&fetched_dir).map_err(|e| SetupError::io(&fetched_dir, e))?;

        let mut written = Vec::new();
        let mut sections = Vec::new();
        for framework in frameworks {
            let body = format!(
                "No offline documentation is bundled for {fw}.\n\
                 Replace this file with the {fw} reference material your team relies on.\n",
                fw = framework
            );
            let path = fetched_dir.join(format!("{}.md", framework));
            fs::write(&path, &body).map_err(|e| SetupError::io(&path, e))?;
            tracing::debug!(framework = %framework, path = %path.display(), "placeholder documentation written");
            sections.push((framework.as_str(), body));
            written.push(path);
        }

        let generated_at = self.generated_at.unwrap_or_else(Utc::now);
        let mut combined = String::from("# Project Documentation\n\n");
        combined.push_str(&format!("> Generated on {}\n\n", generated_at.to_rfc3339()));
        combined.push_str("## Table of Contents\n\n");
        for (framework, _) in &sections {
            combined.push_str(&format!("- [{}](#{})\n", framework, framework.to_lowercase()));
        }
        combined.push_str("\n---\n\n");
        for (framework, body) in &sections {
            combined.push_str(&format!("## {}\n\n{}\n---\n\n", framework, body));
        }

        let combined_path = &paths.parsed_docs_file;
        fs::write(combined_path, combined).map_err(|e| SetupError::io(combined_path, e))?;
        tracing::info!(
            sink = self.name(),
            frameworks = frameworks.len(),
            path = %combined_path.display(),
            "documentation written"
        );
        written.push(combined_path.clone());
        Ok(written)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stub_writes_per_framework_files_and_combined_doc() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::for_project(dir.path());
        let at = DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let frameworks = vec!["astro".to_string(), "react".to_string()];

        let written = StubDocumentation::at(at).fetch(&paths, &frameworks).unwrap();

        assert_eq!(written.len(), 3);
        assert!(paths.docs_dir.join("fetched/astro.md").is_file());
        let combined = fs::read_to_string(&paths.parsed_docs_file).unwrap();
        assert!(combined.contains("> Generated on 2026-03-01T00:00:00+00:00"));
        assert!(combined.contains("- [react](#react)"));
        assert!(combined.contains("## astro"));
    }
}

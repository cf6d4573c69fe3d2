// layout.rs — On-disk layout of a project's assistant setup.
//
// `SetupLayout` holds the relative names (configurable); `ProjectPaths`
// resolves them against a project root. Everything that reads or writes the
// setup goes through `ProjectPaths` so a config override moves every reader
// and writer together.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Relative file and directory names making up a setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupLayout {
    /// Settings directory under the project root.
    pub settings_dir: PathBuf,
    /// Policy document inside `settings_dir`.
    pub settings_file: String,
    /// Per-user override template inside `settings_dir`.
    pub local_settings_file: String,
    /// Command templates directory inside `settings_dir`.
    pub commands_dir: String,
    /// Project note under the project root.
    pub note_file: PathBuf,
    /// Documentation directory under the project root.
    pub docs_dir: PathBuf,
    /// Combined documentation file inside `docs_dir`.
    pub parsed_docs_file: String,
    /// Where superseded scripts are moved, relative to the project root.
    pub scripts_backup_dir: PathBuf,
}

impl Default for SetupLayout {
    fn default() -> Self {
        Self {
            settings_dir: PathBuf::from(".claude"),
            settings_file: "settings.json".to_string(),
            local_settings_file: "settings.local.json".to_string(),
            commands_dir: "commands".to_string(),
            note_file: PathBuf::from("CLAUDE.md"),
            docs_dir: PathBuf::from("docs"),
            parsed_docs_file: "parsed-docs.md".to_string(),
            scripts_backup_dir: PathBuf::from("scripts/backup"),
        }
    }
}

impl SetupLayout {
    /// Resolve this layout against a project root.
    pub fn resolve(&self, root: impl AsRef<Path>) -> ProjectPaths {
        let root = root.as_ref().to_path_buf();
        let settings_dir = root.join(&self.settings_dir);
        let docs_dir = root.join(&self.docs_dir);
        ProjectPaths {
            settings_file: settings_dir.join(&self.settings_file),
            local_settings_file: settings_dir.join(&self.local_settings_file),
            commands_dir: settings_dir.join(&self.commands_dir),
            note_file: root.join(&self.note_file),
            parsed_docs_file: docs_dir.join(&self.parsed_docs_file),
            scripts_backup_dir: root.join(&self.scripts_backup_dir),
            settings_dir,
            docs_dir,
            root,
        }
    }
}

/// Absolute paths of every setup artifact for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub settings_dir: PathBuf,
    pub settings_file: PathBuf,
    pub local_settings_file: PathBuf,
    pub commands_dir: PathBuf,
    pub note_file: PathBuf,
    pub docs_dir: PathBuf,
    pub parsed_docs_file: PathBuf,
    pub scripts_backup_dir: PathBuf,
}

impl ProjectPaths {
    /// Default layout for a project root.
    pub fn for_project(root: impl AsRef<Path>) -> Self {
        SetupLayout::default().resolve(root)
    }

    /// Name used in generated notes: the root directory's last component.
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "project".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_paths() {
        let paths = ProjectPaths::for_project("/work/my-app");
        assert_eq!(paths.settings_file, PathBuf::from("/work/my-app/.claude/settings.json"));
        assert_eq!(
            paths.local_settings_file,
            PathBuf::from("/work/my-app/.claude/settings.local.json")
        );
        assert_eq!(paths.commands_dir, PathBuf::from("/work/my-app/.claude/commands"));
        assert_eq!(paths.note_file, PathBuf::from("/work/my-app/CLAUDE.md"));
        assert_eq!(paths.parsed_docs_file, PathBuf::from("/work/my-app/docs/parsed-docs.md"));
        assert_eq!(paths.project_name(), "my-app");
    }

    #[test]
    fn layout_override_moves_every_path() {
        let layout: SetupLayout = toml::from_str(
            r#"
settings_dir = ".assistant"
note_file = "NOTES.md"
"#,
        )
        .unwrap();
        let paths = layout.resolve("/p");
        assert_eq!(paths.settings_file, PathBuf::from("/p/.assistant/settings.json"));
        assert_eq!(paths.commands_dir, PathBuf::from("/p/.assistant/commands"));
        assert_eq!(paths.note_file, PathBuf::from("/p/NOTES.md"));
        // Unset fields keep their defaults.
        assert_eq!(paths.docs_dir, PathBuf::from("/p/docs"));
    }
}

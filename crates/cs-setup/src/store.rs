// store.rs — SettingsStore: persistence for the policy document.
//
// The document lives at `<settings_dir>/<settings_file>` as pretty-printed
// JSON. Before an existing document is replaced it is copied to a sibling
// `<stem>.backup.<epoch-millis>.json`. Backups are opened with `create_new`
// so one is never overwritten, and nothing in this crate deletes them: even
// a reset wipe leaves them in place.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use cs_policy::PolicyDocument;

use crate::error::SetupError;
use crate::layout::{ProjectPaths, SetupLayout};

/// Starting point for a per-user override file; never overwritten once present.
const LOCAL_SETTINGS_TEMPLATE: &str = r#"{
  "permissions": {
    "allow": [],
    "ask": [],
    "deny": []
  }
}
"#;

/// Upper bound on suffix bumps when backups collide within one millisecond.
const MAX_BACKUP_ATTEMPTS: i64 = 1000;

/// File-backed store for a project's policy document.
pub struct SettingsStore {
    paths: ProjectPaths,
}

impl SettingsStore {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    /// Store for `root` under the given layout.
    pub fn for_project(root: impl AsRef<Path>, layout: &SetupLayout) -> Self {
        Self::new(layout.resolve(root))
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn settings_path(&self) -> &Path {
        &self.paths.settings_file
    }

    pub fn exists(&self) -> bool {
        self.paths.settings_file.is_file()
    }

    /// Raw document text, `None` if no document exists.
    pub fn read_raw(&self) -> Result<Option<String>, SetupError> {
        let path = &self.paths.settings_file;
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SetupError::io(path, e)),
        }
    }

    /// Write a document (creates or overwrites), creating the settings dir if needed.
    pub fn write(&self, document: &PolicyDocument) -> Result<PathBuf, SetupError> {
        let dir = &self.paths.settings_dir;
        fs::create_dir_all(dir).map_err(|e| SetupError::io(dir, e))?;

        let path = self.paths.settings_file.clone();
        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');
        fs::write(&path, json).map_err(|e| SetupError::io(&path, e))?;
        tracing::info!(path = %path.display(), "policy document written");
        Ok(path)
    }

    /// Write the local override template unless one already exists.
    ///
    /// Returns whether a file was created.
    pub fn write_local_template(&self) -> Result<bool, SetupError> {
        let path = &self.paths.local_settings_file;
        if path.exists() {
            tracing::debug!(path = %path.display(), "preserving existing local settings");
            return Ok(false);
        }
        let dir = &self.paths.settings_dir;
        fs::create_dir_all(dir).map_err(|e| SetupError::io(dir, e))?;
        fs::write(path, LOCAL_SETTINGS_TEMPLATE).map_err(|e| SetupError::io(path, e))?;
        tracing::info!(path = %path.display(), "local settings template created");
        Ok(true)
    }

    /// Copy the current document to a timestamped backup.
    ///
    /// Returns `None` when there is nothing to back up.
    pub fn backup(&self) -> Result<Option<PathBuf>, SetupError> {
        self.backup_at(Utc::now().timestamp_millis())
    }

    pub(crate) fn backup_at(&self, millis: i64) -> Result<Option<PathBuf>, SetupError> {
        let source = &self.paths.settings_file;
        let content = match fs::read(source) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SetupError::Backup {
                    path: source.display().to_string(),
                    source: e,
                })
            }
        };

        let stem = self.settings_stem();
        let mut attempt = 0;
        loop {
            let candidate = self
                .paths
                .settings_dir
                .join(format!("{}.backup.{}.json", stem, millis + attempt));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut file) => {
                    file.write_all(&content).map_err(|e| SetupError::Backup {
                        path: candidate.display().to_string(),
                        source: e,
                    })?;
                    tracing::info!(backup = %candidate.display(), "backup created");
                    return Ok(Some(candidate));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_BACKUP_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => {
                    return Err(SetupError::Backup {
                        path: candidate.display().to_string(),
                        source: e,
                    })
                }
            }
        }
    }

    /// Existing backups, oldest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, SetupError> {
        let dir = &self.paths.settings_dir;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let stem = self.settings_stem();
        let mut backups: Vec<(i64, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| SetupError::io(dir, e))? {
            let entry = entry.map_err(|e| SetupError::io(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(millis) = backup_millis(&name, &stem) {
                backups.push((millis, entry.path()));
            }
        }
        backups.sort();
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Remove the settings directory contents for a reset, keeping backups.
    pub fn wipe(&self) -> Result<(), SetupError> {
        let dir = &self.paths.settings_dir;
        if !dir.exists() {
            return Ok(());
        }
        let stem = self.settings_stem();
        let mut kept = 0usize;
        for entry in fs::read_dir(dir).map_err(|e| SetupError::io(dir, e))? {
            let entry = entry.map_err(|e| SetupError::io(dir, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if backup_millis(&name, &stem).is_some() {
                kept += 1;
                continue;
            }
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| SetupError::io(&path, e))?;
        }
        tracing::info!(dir = %dir.display(), backups_kept = kept, "existing setup removed");
        Ok(())
    }

    fn settings_stem(&self) -> String {
        self.paths
            .settings_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "settings".to_string())
    }
}

/// The millisecond suffix of `<stem>.backup.<millis>.json`, if `name` is one.
fn backup_millis(name: &str, stem: &str) -> Option<i64> {
    name.strip_prefix(stem)?
        .strip_prefix(".backup.")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

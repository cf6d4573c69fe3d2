//! Setup configuration and profile file loading

use std::path::Path;

use cs_policy::{ProjectProfile, DEFAULT_TARGET_VERSION};
use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::layout::SetupLayout;
use crate::options::RunOptions;

/// Top-level setup configuration from `--config FILE`.
///
/// TOML when the file ends in `.toml`, JSON otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Schema version stamped on compiled documents; persisted documents
    /// carrying any other version are stale.
    pub target_version: String,

    /// Fetched documentation older than this many days marks the setup stale.
    pub note_max_age_days: u32,

    /// Abort an update when the pre-write backup cannot be created.
    /// Default: false (the failure is logged and the update proceeds).
    pub strict_backup: bool,

    /// Layout overrides
    pub layout: SetupLayout,

    /// Run options applied underneath command-line flags
    pub options: RunOptions,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            target_version: default_target_version(),
            note_max_age_days: default_note_max_age_days(),
            strict_backup: false,
            layout: SetupLayout::default(),
            options: RunOptions::default(),
        }
    }
}

fn default_target_version() -> String {
    DEFAULT_TARGET_VERSION.to_string()
}

fn default_note_max_age_days() -> u32 {
    7
}

impl SetupConfig {
    /// Load setup config from a TOML or JSON file.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let content = std::fs::read_to_string(path).map_err(|e| SetupError::io(path, e))?;
        let parsed = if has_extension(path, &["toml"]) {
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| SetupError::Config {
            path: path.display().to_string(),
            message,
        })
    }

    /// Try to load config, returning defaults (with a warning) on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded setup config");
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "config load failed, continuing with defaults");
                Self::default()
            }
        }
    }
}

/// Load an analyzer-produced project profile (YAML for `.yaml`/`.yml`, JSON otherwise).
pub fn load_profile(path: &Path) -> Result<ProjectProfile, SetupError> {
    let content = std::fs::read_to_string(path).map_err(|e| SetupError::io(path, e))?;
    let parsed = if has_extension(path, &["yaml", "yml"]) {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| SetupError::Profile {
        path: path.display().to_string(),
        message,
    })
}

/// Like [`load_profile`], degrading to an empty profile on failure.
pub fn load_profile_or_default(path: &Path) -> ProjectProfile {
    load_profile(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "profile load failed, continuing with an empty profile");
        ProjectProfile::default()
    })
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

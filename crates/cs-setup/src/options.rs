// options.rs — Run options consumed by the planner, compiler and executor.

use std::path::PathBuf;

use cs_policy::{CompilerOptions, ProjectProfile};
use serde::{Deserialize, Serialize};

/// Flags for one setup run. Booleans default to false, lists to empty.
///
/// The wire form is camelCase so a JSON config file can carry the same keys
/// the command line exposes (`docsOnly`, `includeDestructive`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Accepted for compatibility; runs never prompt.
    pub yes: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub docs_only: bool,
    pub no_docs: bool,
    pub commands_only: bool,
    pub settings_only: bool,
    pub update: bool,
    pub reset: bool,
    pub safe_only: bool,
    pub include_destructive: bool,
    /// Replaces the profile's frameworks when non-empty.
    pub framework: Vec<String>,
    /// Replaces the profile's languages when non-empty.
    pub language: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub dev: bool,
}

impl RunOptions {
    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            safe_only: self.safe_only,
            include_destructive: self.include_destructive,
        }
    }

    /// Layer these options over `base`: a flag set in either is set, and
    /// non-empty lists or present paths here win.
    pub fn merged_over(self, base: &RunOptions) -> RunOptions {
        let pick = |own: Vec<String>, fallback: &Vec<String>| {
            if own.is_empty() {
                fallback.clone()
            } else {
                own
            }
        };
        RunOptions {
            dry_run: self.dry_run || base.dry_run,
            yes: self.yes || base.yes,
            quiet: self.quiet || base.quiet,
            verbose: self.verbose || base.verbose,
            docs_only: self.docs_only || base.docs_only,
            no_docs: self.no_docs || base.no_docs,
            commands_only: self.commands_only || base.commands_only,
            settings_only: self.settings_only || base.settings_only,
            update: self.update || base.update,
            reset: self.reset || base.reset,
            safe_only: self.safe_only || base.safe_only,
            include_destructive: self.include_destructive || base.include_destructive,
            framework: pick(self.framework, &base.framework),
            language: pick(self.language, &base.language),
            output_dir: self.output_dir.or_else(|| base.output_dir.clone()),
            config: self.config.or_else(|| base.config.clone()),
            dev: self.dev || base.dev,
        }
    }

    /// Apply `--language` / `--framework` overrides to an analyzed profile.
    pub fn apply_overrides(&self, mut profile: ProjectProfile) -> ProjectProfile {
        if !self.language.is_empty() {
            tracing::debug!(languages = ?self.language, "forcing languages");
            profile = profile.with_languages(self.language.iter().map(|l| l.trim().to_lowercase()));
        }
        if !self.framework.is_empty() {
            tracing::debug!(frameworks = ?self.framework, "forcing frameworks");
            profile =
                profile.with_frameworks(self.framework.iter().map(|f| f.trim().to_lowercase()));
        }
        profile
    }
}

// state.rs — Existing-setup detection and the setup status state machine.
//
// `ExistingSetupState` is a read-only snapshot taken once at run start. It
// records which setup artifacts exist, whether any of them is stale, and
// which conflicts need resolving. `SetupStatus` is derived from it:
//
//   NoSetup ──create full-setup──▶ Current ──staleness trigger──▶ NeedsUpdate
//      ▲                              ▲                                │
//      └───────── reset (any) ────────┴──────────reconcile─────────────┘

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use cs_policy::DocumentShape;
use serde::Serialize;

use crate::layout::ProjectPaths;
use crate::note;
use crate::planner::Action;
use crate::reconciler::{check_staleness, document_version, Staleness};

/// Scripts from the previous documentation tooling that the setup replaces.
pub const LEGACY_SCRIPTS: &[&str] = &[
    "scripts/fetch-docs.js",
    "scripts/extract-content.js",
    "scripts/fetch-docs.sh",
    "scripts/update-docs.sh",
];

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Something in the existing setup that blocks or muddies a clean run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// A superseded script, by project-relative path.
    OldScript(String),
    /// Settings directory present without a policy document.
    IncompleteSetup,
    /// Policy document present but not parseable.
    InvalidSettings,
    /// Project note still carries template placeholders.
    NotePlaceholders,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::OldScript(path) => write!(f, "Old script found: {}", path),
            Conflict::IncompleteSetup => {
                write!(f, "Incomplete .claude setup (missing settings.json)")
            }
            Conflict::InvalidSettings => write!(f, "Invalid settings.json format"),
            Conflict::NotePlaceholders => write!(f, "CLAUDE.md contains template placeholders"),
        }
    }
}

impl Serialize for Conflict {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lifecycle status of a project's setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetupStatus {
    NoSetup,
    Current,
    NeedsUpdate,
}

impl SetupStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, next: &SetupStatus) -> bool {
        // Reset is always allowed.
        if *next == SetupStatus::NoSetup {
            return true;
        }
        matches!(
            (self, next),
            (SetupStatus::NoSetup, SetupStatus::Current)
                | (SetupStatus::Current, SetupStatus::NeedsUpdate)
                | (SetupStatus::NeedsUpdate, SetupStatus::Current)
                // A partial setup gains its missing pieces without a full rebuild.
                | (SetupStatus::Current, SetupStatus::Current)
        )
    }

    /// Status after an action completes.
    pub fn after(self, action: &Action) -> SetupStatus {
        match action {
            Action::CreateFullSetup => SetupStatus::Current,
            Action::UpdateConfiguration if self == SetupStatus::NeedsUpdate => SetupStatus::Current,
            _ => self,
        }
    }
}

impl std::fmt::Display for SetupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupStatus::NoSetup => write!(f, "no-setup"),
            SetupStatus::Current => write!(f, "current"),
            SetupStatus::NeedsUpdate => write!(f, "needs-update"),
        }
    }
}

/// What detection compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionPolicy {
    pub target_version: String,
    pub shape: DocumentShape,
    /// Fetched documentation older than this is stale.
    pub note_max_age_days: u32,
}

impl DetectionPolicy {
    pub fn new(target_version: impl Into<String>) -> Self {
        Self {
            target_version: target_version.into(),
            shape: DocumentShape::Tiered,
            note_max_age_days: 7,
        }
    }

    pub fn with_note_max_age_days(mut self, days: u32) -> Self {
        self.note_max_age_days = days;
        self
    }
}

/// Snapshot of the setup found on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingSetupState {
    pub has_setup: bool,
    pub has_policy_document: bool,
    pub has_project_note: bool,
    pub has_commands: bool,
    /// Version declared by the policy document (`None` if absent or unreadable).
    pub document_version: Option<String>,
    pub is_stale: bool,
    /// The policy document itself is stale (version, fields, schema, corruption).
    pub settings_stale: bool,
    /// The project note is too short or still titled from the template.
    pub note_stale: bool,
    /// The combined documentation file is older than the configured age.
    pub docs_stale: bool,
    /// Human-readable staleness triggers, in detection order.
    pub stale_reasons: Vec<String>,
    pub conflicts: Vec<Conflict>,
}

impl ExistingSetupState {
    /// Inspect a project's setup.
    pub fn detect(paths: &ProjectPaths, policy: &DetectionPolicy) -> Self {
        Self::detect_at(paths, policy, SystemTime::now())
    }

    /// Inspect a project's setup, judging file ages against `now`.
    pub fn detect_at(paths: &ProjectPaths, policy: &DetectionPolicy, now: SystemTime) -> Self {
        let mut state = Self::default();

        let has_settings_dir = paths.settings_dir.is_dir();
        if has_settings_dir {
            state.has_setup = true;
            state.has_commands = fs::read_dir(&paths.commands_dir)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
        }

        if paths.settings_file.is_file() {
            state.has_policy_document = true;
            state.inspect_policy_document(&paths.settings_file, policy);
        }

        if paths.note_file.is_file() {
            state.has_setup = true;
            state.has_project_note = true;
            match fs::read_to_string(&paths.note_file) {
                Ok(content) => {
                    if note::note_is_stale(&content) {
                        state.note_stale = true;
                        state.mark_stale("project note is empty or still a template");
                    }
                    if note::has_template_placeholders(&content) {
                        state.conflicts.push(Conflict::NotePlaceholders);
                    }
                }
                Err(e) => tracing::warn!(
                    path = %paths.note_file.display(),
                    error = %e,
                    "project note unreadable"
                ),
            }
        }

        if let Some(age) = file_age(&paths.parsed_docs_file, now) {
            let max_age = Duration::from_secs(u64::from(policy.note_max_age_days) * SECONDS_PER_DAY);
            if age > max_age {
                state.docs_stale = true;
                state.mark_stale(format!(
                    "documentation is older than {} days",
                    policy.note_max_age_days
                ));
            }
        }

        for script in LEGACY_SCRIPTS {
            if paths.root.join(script).exists() {
                state.conflicts.push(Conflict::OldScript(script.to_string()));
            }
        }
        if has_settings_dir && !state.has_policy_document {
            state.conflicts.push(Conflict::IncompleteSetup);
        }

        tracing::debug!(
            status = %state.status(),
            conflicts = state.conflicts.len(),
            "existing setup detected"
        );
        state
    }

    fn inspect_policy_document(&mut self, path: &Path, policy: &DetectionPolicy) {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "settings unreadable");
                self.conflicts.push(Conflict::InvalidSettings);
                self.settings_stale = true;
                self.mark_stale("settings file is unreadable");
                return;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => self.document_version = document_version(&value, policy.shape),
            Err(_) => self.conflicts.push(Conflict::InvalidSettings),
        }

        if let Staleness::Stale(reason) =
            check_staleness(Some(&raw), policy.shape, &policy.target_version)
        {
            self.settings_stale = true;
            self.mark_stale(reason.to_string());
        }
    }

    fn mark_stale(&mut self, reason: impl Into<String>) {
        self.is_stale = true;
        self.stale_reasons.push(reason.into());
    }

    /// A reset discards whatever was detected.
    pub fn apply_reset(self, reset: bool) -> Self {
        if reset {
            tracing::debug!("reset requested, treating project as unconfigured");
            Self::default()
        } else {
            self
        }
    }

    pub fn status(&self) -> SetupStatus {
        if !self.has_setup {
            SetupStatus::NoSetup
        } else if self.is_stale {
            SetupStatus::NeedsUpdate
        } else {
            SetupStatus::Current
        }
    }

    pub fn has_conflict(&self, conflict: &Conflict) -> bool {
        self.conflicts.contains(conflict)
    }
}

fn file_age(path: &Path, now: SystemTime) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    // A modification time in the future counts as brand new.
    Some(now.duration_since(modified).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn policy() -> DetectionPolicy {
        DetectionPolicy::new("2.0.0")
    }

    fn long_note() -> String {
        format!("# app\n\n{}", "Useful guidance for the assistant. ".repeat(5))
    }

    #[test]
    fn empty_project_has_no_setup() {
        let dir = TempDir::new().unwrap();
        let state = ExistingSetupState::detect(&ProjectPaths::for_project(dir.path()), &policy());
        assert_eq!(state, ExistingSetupState::default());
        assert_eq!(state.status(), SetupStatus::NoSetup);
    }

    #[test]
    fn old_version_document_is_stale() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::for_project(dir.path());
        fs::create_dir_all(&paths.settings_dir).unwrap();
        fs::write(&paths.settings_file, r#"{"version":"1.0.0"}"#).unwrap();
        fs::write(&paths.note_file, long_note()).unwrap();

        let state = ExistingSetupState::detect(&paths, &policy());
        assert!(state.has_setup);
        assert!(state.has_policy_document);
        assert_eq!(state.document_version.as_deref(), Some("1.0.0"));
        assert!(state.is_stale);
        assert!(state.settings_stale);
        assert!(!state.note_stale);
        assert!(state.stale_reasons[0].contains("1.0.0"));
        assert_eq!(state.status(), SetupStatus::NeedsUpdate);
        assert!(state.conflicts.is_empty());
    }

    #[test]
    fn invalid_json_is_a_conflict_and_stale() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::for_project(dir.path());
        fs::create_dir_all(&paths.settings_dir).unwrap();
        fs::write(&paths.settings_file, "{ broken").unwrap();

        let state = ExistingSetupState::detect(&paths, &policy());
        assert!(state.has_conflict(&Conflict::InvalidSettings));
        assert!(state.is_stale);
        assert_eq!(state.document_version, None);
    }

    #[test]
    fn settings_dir_without_document_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::for_project(dir.path());
        fs::create_dir_all(&paths.commands_dir).unwrap();
        fs::write(paths.commands_dir.join("review-code.md"), "x").unwrap();

        let state = ExistingSetupState::detect(&paths, &policy());
        assert!(state.has_setup);
        assert!(state.has_commands);
        assert!(!state.has_policy_document);
        assert_eq!(state.conflicts, vec![Conflict::IncompleteSetup]);
        assert_eq!(
            state.conflicts[0].to_string(),
            "Incomplete .claude setup (missing settings.json)"
        );
    }

    #[test]
    fn placeholder_note_and_legacy_scripts_are_conflicts() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::for_project(dir.path());
        fs::write(
            &paths.note_file,
            format!("# [Your Project Name]\n\n{} -->\n", note::DESCRIPTION_PLACEHOLDER),
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("scripts/fetch-docs.sh"), "#!/bin/sh").unwrap();

        let state = ExistingSetupState::detect(&paths, &policy());
        assert!(state.has_project_note);
        assert!(state.is_stale);
        assert_eq!(
            state.conflicts,
            vec![
                Conflict::NotePlaceholders,
                Conflict::OldScript("scripts/fetch-docs.sh".to_string()),
            ]
        );
        assert_eq!(state.conflicts[1].to_string(), "Old script found: scripts/fetch-docs.sh");
    }

    #[test]
    fn old_documentation_marks_setup_stale() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::for_project(dir.path());
        fs::write(&paths.note_file, long_note()).unwrap();
        fs::create_dir_all(&paths.docs_dir).unwrap();
        fs::write(&paths.parsed_docs_file, "# docs").unwrap();

        let fresh = ExistingSetupState::detect(&paths, &policy());
        assert!(!fresh.is_stale);

        let later = SystemTime::now() + Duration::from_secs(8 * SECONDS_PER_DAY);
        let old = ExistingSetupState::detect_at(&paths, &policy(), later);
        assert!(old.is_stale);
        assert!(old.docs_stale);
        assert!(!old.settings_stale);
        assert!(old.stale_reasons[0].contains("7 days"));

        let lenient = policy().with_note_max_age_days(30);
        assert!(!ExistingSetupState::detect_at(&paths, &lenient, later).is_stale);
    }

    #[test]
    fn short_note_is_stale_without_touching_settings() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::for_project(dir.path());
        fs::write(&paths.note_file, "# app\nshort note\n").unwrap();

        let state = ExistingSetupState::detect(&paths, &policy());
        assert!(state.note_stale);
        assert!(!state.settings_stale);
        assert!(!state.docs_stale);
        assert_eq!(state.status(), SetupStatus::NeedsUpdate);
    }

    #[test]
    fn reset_always_yields_no_setup() {
        let state = ExistingSetupState {
            has_setup: true,
            has_policy_document: true,
            is_stale: true,
            conflicts: vec![Conflict::InvalidSettings],
            ..Default::default()
        };
        assert_eq!(state.clone().apply_reset(false).status(), SetupStatus::NeedsUpdate);
        assert_eq!(state.apply_reset(true).status(), SetupStatus::NoSetup);
    }

    #[test]
    fn status_transitions() {
        assert!(SetupStatus::NoSetup.can_transition_to(&SetupStatus::Current));
        assert!(SetupStatus::Current.can_transition_to(&SetupStatus::NeedsUpdate));
        assert!(SetupStatus::NeedsUpdate.can_transition_to(&SetupStatus::Current));
        assert!(SetupStatus::NeedsUpdate.can_transition_to(&SetupStatus::NoSetup));
        assert!(!SetupStatus::NoSetup.can_transition_to(&SetupStatus::NeedsUpdate));

        assert_eq!(
            SetupStatus::NoSetup.after(&Action::CreateFullSetup),
            SetupStatus::Current
        );
        assert_eq!(
            SetupStatus::NeedsUpdate.after(&Action::UpdateConfiguration),
            SetupStatus::Current
        );
        assert_eq!(
            SetupStatus::NeedsUpdate.after(&Action::UpdateCommands),
            SetupStatus::NeedsUpdate
        );
    }
}

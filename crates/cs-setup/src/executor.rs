// executor.rs — Runs planned actions against a project directory.
//
// Actions run strictly in order, one at a time. The first fatal error aborts
// the rest of the list; actions that already completed stay applied (there
// is no rollback). In dry-run mode each action is logged and nothing is
// written.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use cs_policy::{validate, DocumentShape, PolicyCompiler, ProjectProfile};

use crate::config::SetupConfig;
use crate::docs::DocumentationSink;
use crate::error::SetupError;
use crate::layout::ProjectPaths;
use crate::note;
use crate::options::RunOptions;
use crate::planner::Action;
use crate::reconciler::UpdateReconciler;
use crate::state::{Conflict, DetectionPolicy, ExistingSetupState, SetupStatus};
use crate::store::SettingsStore;
use crate::templates;

/// Everything an action needs to run.
pub struct SetupContext<'a> {
    pub paths: ProjectPaths,
    pub profile: &'a ProjectProfile,
    pub options: &'a RunOptions,
    pub config: &'a SetupConfig,
    pub compiler: &'a PolicyCompiler,
    pub docs: &'a dyn DocumentationSink,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Actions that ran to completion, in order.
    pub completed: Vec<Action>,
    /// Files created or overwritten.
    pub written: Vec<PathBuf>,
    /// Backups taken before overwriting the policy document.
    pub backups: Vec<PathBuf>,
    /// Setup status after the run, as detection sees it on disk.
    pub status: SetupStatus,
}

/// Executes action lists for one project.
pub struct Executor<'a> {
    ctx: SetupContext<'a>,
    store: SettingsStore,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: SetupContext<'a>) -> Self {
        let store = SettingsStore::new(ctx.paths.clone());
        Self { ctx, store }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Run `actions` in order starting from `status`.
    pub fn run(&self, actions: &[Action], status: SetupStatus) -> Result<ExecutionReport, SetupError> {
        let mut report = ExecutionReport {
            completed: Vec::new(),
            written: Vec::new(),
            backups: Vec::new(),
            status,
        };

        if self.ctx.options.dry_run {
            for action in actions {
                tracing::info!(action = %action, "dry run: would execute");
            }
            return Ok(report);
        }

        // A reset only wipes when the plan rebuilds what it removes.
        if self.ctx.options.reset && actions.contains(&Action::CreateFullSetup) {
            self.store.wipe()?;
            report.status = SetupStatus::NoSetup;
        }

        for action in actions {
            tracing::info!(action = %action, "executing");
            if let Err(e) = self.execute(action, &mut report) {
                tracing::error!(action = %action, error = %e, "action failed, aborting remaining actions");
                return Err(e);
            }
            let next = report.status.after(action);
            tracing::debug!(from = %report.status, to = %next, "status advanced");
            report.status = next;
            report.completed.push(action.clone());
        }

        // Triggers the plan did not cover (stale docs under --no-docs) survive the run.
        let policy = DetectionPolicy::new(self.ctx.compiler.target_version())
            .with_note_max_age_days(self.ctx.config.note_max_age_days);
        let detected = ExistingSetupState::detect(&self.ctx.paths, &policy).status();
        if detected == SetupStatus::NeedsUpdate {
            tracing::warn!(
                expected = %report.status,
                "setup still needs an update after this run"
            );
        }
        report.status = detected;
        Ok(report)
    }

    fn execute(&self, action: &Action, report: &mut ExecutionReport) -> Result<(), SetupError> {
        match action {
            Action::CreateFullSetup => self.create_full_setup(report),
            Action::CreateSettings => self.create_settings(report),
            Action::UpdateConfiguration => self.update_configuration(report),
            Action::UpdateCommands => {
                report
                    .written
                    .extend(templates::write_missing(&self.ctx.paths.commands_dir)?);
                Ok(())
            }
            Action::GenerateProjectNote => self.generate_note(report),
            Action::FetchDocumentation { frameworks } => {
                let written = self.ctx.docs.fetch(&self.ctx.paths, frameworks)?;
                report.written.extend(written);
                Ok(())
            }
            Action::ResolveConflicts { conflicts } => self.resolve_conflicts(conflicts, report),
        }
    }

    fn create_full_setup(&self, report: &mut ExecutionReport) -> Result<(), SetupError> {
        let paths = &self.ctx.paths;
        create_dir(&paths.settings_dir)?;
        create_dir(&paths.commands_dir)?;
        self.create_settings(report)?;
        report
            .written
            .extend(templates::write_missing(&paths.commands_dir)?);
        self.generate_note(report)?;
        create_dir(&paths.docs_dir)
    }

    /// Compile, validate and write a fresh document, backing up any existing one.
    fn create_settings(&self, report: &mut ExecutionReport) -> Result<(), SetupError> {
        let document = self
            .ctx
            .compiler
            .compile(self.ctx.profile, &self.ctx.options.compiler_options())?;
        validate(&document.to_json_value()?, DocumentShape::Tiered)?;

        if let Some(backup) = self.backup_existing()? {
            report.backups.push(backup);
        }
        report.written.push(self.store.write(&document)?);
        if self.store.write_local_template()? {
            report.written.push(self.ctx.paths.local_settings_file.clone());
        }
        Ok(())
    }

    fn backup_existing(&self) -> Result<Option<PathBuf>, SetupError> {
        match self.store.backup() {
            Ok(path) => Ok(path),
            Err(e) if self.ctx.config.strict_backup => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "backup failed, continuing");
                Ok(None)
            }
        }
    }

    fn update_configuration(&self, report: &mut ExecutionReport) -> Result<(), SetupError> {
        if !self.store.exists() {
            tracing::debug!("no policy document to reconcile");
            return Ok(());
        }
        let reconciler = UpdateReconciler::new(self.ctx.compiler)
            .with_strict_backup(self.ctx.config.strict_backup);
        let result = reconciler.reconcile(
            &self.store,
            self.ctx.profile,
            &self.ctx.options.compiler_options(),
        )?;

        match &result.stale_reason {
            Some(reason) => tracing::info!(%reason, "reconciling stale settings"),
            None => tracing::info!("settings current, refreshing"),
        }
        report.backups.extend(result.backup_reference);
        report.written.push(self.store.write(&result.merged_document)?);
        Ok(())
    }

    fn generate_note(&self, report: &mut ExecutionReport) -> Result<(), SetupError> {
        let path = &self.ctx.paths.note_file;
        let content = note::render(&self.ctx.paths.project_name(), self.ctx.profile);
        fs::write(path, content).map_err(|e| SetupError::io(path, e))?;
        tracing::info!(path = %path.display(), "project note written");
        report.written.push(path.clone());
        Ok(())
    }

    fn resolve_conflicts(
        &self,
        conflicts: &[Conflict],
        report: &mut ExecutionReport,
    ) -> Result<(), SetupError> {
        for conflict in conflicts {
            match conflict {
                Conflict::OldScript(script) => {
                    let moved = self.move_script(script)?;
                    report.written.push(moved);
                }
                // Handled by the create/update/generate actions planned alongside.
                other => tracing::debug!(conflict = %other, "no file changes needed"),
            }
        }
        Ok(())
    }

    fn move_script(&self, script: &str) -> Result<PathBuf, SetupError> {
        let from = self.ctx.paths.root.join(script);
        let backup_dir = &self.ctx.paths.scripts_backup_dir;
        create_dir(backup_dir)?;

        let name = Path::new(script)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.replace('/', "_"));
        let mut to = backup_dir.join(&name);
        if to.exists() {
            to = backup_dir.join(format!("{}.{}", name, Utc::now().timestamp_millis()));
        }
        fs::rename(&from, &to).map_err(|e| SetupError::io(&from, e))?;
        tracing::info!(from = %from.display(), to = %to.display(), "legacy script moved");
        Ok(to)
    }
}

fn create_dir(path: &Path) -> Result<(), SetupError> {
    fs::create_dir_all(path).map_err(|e| SetupError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::StubDocumentation;
    use tempfile::TempDir;

    struct FailingDocs;

    impl DocumentationSink for FailingDocs {
        fn fetch(&self, _: &ProjectPaths, _: &[String]) -> Result<Vec<PathBuf>, SetupError> {
            Err(SetupError::Documentation {
                sink: "failing".to_string(),
                message: "offline".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn compiler() -> PolicyCompiler {
        PolicyCompiler::with_builtin_registry("2.0.0").unwrap()
    }

    #[test]
    fn full_setup_creates_every_artifact() {
        let dir = TempDir::new().unwrap();
        let compiler = compiler();
        let profile = ProjectProfile::default().with_languages(["rust"]);
        let options = RunOptions::default();
        let config = SetupConfig::default();
        let docs = StubDocumentation::new();
        let executor = Executor::new(SetupContext {
            paths: ProjectPaths::for_project(dir.path()),
            profile: &profile,
            options: &options,
            config: &config,
            compiler: &compiler,
            docs: &docs,
        });

        let report = executor
            .run(&[Action::CreateFullSetup], SetupStatus::NoSetup)
            .unwrap();

        let paths = executor.store().paths();
        assert!(paths.settings_file.is_file());
        assert!(paths.local_settings_file.is_file());
        assert!(paths.commands_dir.join("generate-tests.md").is_file());
        assert!(paths.note_file.is_file());
        assert!(paths.docs_dir.is_dir());
        assert_eq!(report.status, SetupStatus::Current);
        assert!(report.backups.is_empty());

        let state = ExistingSetupState::detect(paths, &DetectionPolicy::new("2.0.0"));
        assert_eq!(state.status(), SetupStatus::Current);
        assert!(state.conflicts.is_empty());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let compiler = compiler();
        let profile = ProjectProfile::default();
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let config = SetupConfig::default();
        let docs = StubDocumentation::new();
        let executor = Executor::new(SetupContext {
            paths: ProjectPaths::for_project(dir.path()),
            profile: &profile,
            options: &options,
            config: &config,
            compiler: &compiler,
            docs: &docs,
        });

        let report = executor
            .run(&[Action::CreateFullSetup], SetupStatus::NoSetup)
            .unwrap();
        assert!(report.completed.is_empty());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn fatal_error_aborts_remaining_actions() {
        let dir = TempDir::new().unwrap();
        let compiler = compiler();
        let profile = ProjectProfile::default().with_frameworks(["react"]);
        let options = RunOptions::default();
        let config = SetupConfig::default();
        let docs = FailingDocs;
        let executor = Executor::new(SetupContext {
            paths: ProjectPaths::for_project(dir.path()),
            profile: &profile,
            options: &options,
            config: &config,
            compiler: &compiler,
            docs: &docs,
        });

        let actions = vec![
            Action::UpdateCommands,
            Action::FetchDocumentation {
                frameworks: vec!["react".to_string()],
            },
            Action::GenerateProjectNote,
        ];
        let err = executor.run(&actions, SetupStatus::Current).unwrap_err();
        assert!(matches!(err, SetupError::Documentation { .. }));

        let paths = executor.store().paths();
        // The first action's effects remain; the last never ran.
        assert!(paths.commands_dir.join("review-code.md").is_file());
        assert!(!paths.note_file.exists());
    }

    #[test]
    fn legacy_scripts_move_to_backup_dir() {
        let dir = TempDir::new().unwrap();
        let scripts = dir.path().join("scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("fetch-docs.js"), "old").unwrap();
        fs::create_dir_all(scripts.join("backup")).unwrap();
        fs::write(scripts.join("backup/fetch-docs.js"), "older").unwrap();

        let compiler = compiler();
        let profile = ProjectProfile::default();
        let options = RunOptions::default();
        let config = SetupConfig::default();
        let docs = StubDocumentation::new();
        let executor = Executor::new(SetupContext {
            paths: ProjectPaths::for_project(dir.path()),
            profile: &profile,
            options: &options,
            config: &config,
            compiler: &compiler,
            docs: &docs,
        });

        let action = Action::ResolveConflicts {
            conflicts: vec![
                Conflict::OldScript("scripts/fetch-docs.js".to_string()),
                Conflict::IncompleteSetup,
            ],
        };
        let report = executor.run(&[action], SetupStatus::Current).unwrap();

        assert!(!scripts.join("fetch-docs.js").exists());
        assert_eq!(
            fs::read_to_string(scripts.join("backup/fetch-docs.js")).unwrap(),
            "older"
        );
        assert_eq!(report.written.len(), 1);
        assert_eq!(fs::read_to_string(&report.written[0]).unwrap(), "old");
    }

    fn configured_project(dir: &Path, compiler: &PolicyCompiler) {
        let profile = ProjectProfile::default().with_frameworks(["react"]);
        let options = RunOptions {
            no_docs: true,
            ..Default::default()
        };
        let config = SetupConfig::default();
        let docs = StubDocumentation::new();
        Executor::new(SetupContext {
            paths: ProjectPaths::for_project(dir),
            profile: &profile,
            options: &options,
            config: &config,
            compiler,
            docs: &docs,
        })
        .run(&[Action::CreateFullSetup], SetupStatus::NoSetup)
        .unwrap();
    }

    #[test]
    fn reset_without_full_setup_keeps_settings() {
        let dir = TempDir::new().unwrap();
        let compiler = compiler();
        configured_project(dir.path(), &compiler);

        let profile = ProjectProfile::default().with_frameworks(["react"]);
        let options = RunOptions {
            reset: true,
            docs_only: true,
            ..Default::default()
        };
        let config = SetupConfig::default();
        let docs = StubDocumentation::new();
        let executor = Executor::new(SetupContext {
            paths: ProjectPaths::for_project(dir.path()),
            profile: &profile,
            options: &options,
            config: &config,
            compiler: &compiler,
            docs: &docs,
        });
        let actions = vec![Action::FetchDocumentation {
            frameworks: vec!["react".to_string()],
        }];
        let report = executor.run(&actions, SetupStatus::Current).unwrap();

        let paths = executor.store().paths();
        assert!(paths.settings_file.is_file());
        assert!(paths.commands_dir.join("review-code.md").is_file());
        assert!(paths.parsed_docs_file.is_file());
        assert_eq!(report.status, SetupStatus::Current);
    }

    /// Paths whose backups land in a directory that does not exist, so
    /// every backup attempt fails while the document itself stays writable.
    fn paths_with_missing_backup_dir(root: &Path) -> ProjectPaths {
        let mut paths = ProjectPaths::for_project(root);
        fs::create_dir_all(&paths.settings_dir).unwrap();
        fs::write(&paths.settings_file, r#"{"version":"1.0.0"}"#).unwrap();
        paths.settings_dir = root.join("missing").join("backups");
        paths
    }

    #[test]
    fn failed_backup_still_updates_configuration() {
        let dir = TempDir::new().unwrap();
        let paths = paths_with_missing_backup_dir(dir.path());
        let settings_file = paths.settings_file.clone();
        let compiler = compiler();
        let profile = ProjectProfile::default();
        let options = RunOptions::default();
        let config = SetupConfig::default();
        let docs = StubDocumentation::new();
        let executor = Executor::new(SetupContext {
            paths,
            profile: &profile,
            options: &options,
            config: &config,
            compiler: &compiler,
            docs: &docs,
        });

        let report = executor
            .run(&[Action::UpdateConfiguration], SetupStatus::NeedsUpdate)
            .unwrap();

        assert!(report.backups.is_empty());
        assert_eq!(report.completed, vec![Action::UpdateConfiguration]);
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&settings_file).unwrap()).unwrap();
        assert_eq!(written["schemaVersion"], "2.0.0");
    }

    #[test]
    fn strict_backup_aborts_update_on_failed_backup() {
        let dir = TempDir::new().unwrap();
        let paths = paths_with_missing_backup_dir(dir.path());
        let settings_file = paths.settings_file.clone();
        let compiler = compiler();
        let profile = ProjectProfile::default();
        let options = RunOptions::default();
        let config = SetupConfig {
            strict_backup: true,
            ..Default::default()
        };
        let docs = StubDocumentation::new();
        let executor = Executor::new(SetupContext {
            paths,
            profile: &profile,
            options: &options,
            config: &config,
            compiler: &compiler,
            docs: &docs,
        });

        let err = executor
            .run(&[Action::UpdateConfiguration], SetupStatus::NeedsUpdate)
            .unwrap_err();

        assert!(matches!(err, SetupError::Backup { .. }));
        assert_eq!(
            fs::read_to_string(&settings_file).unwrap(),
            r#"{"version":"1.0.0"}"#
        );
    }
}

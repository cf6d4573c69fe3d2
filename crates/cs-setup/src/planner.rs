// planner.rs — Action Planner.
//
// Turns an ExistingSetupState + ProjectProfile + RunOptions into the ordered
// list of actions the executor runs. Pure and deterministic: identical
// inputs always yield an identical, identically ordered list.
//
// Precedence (first match wins):
// 1. docs-only     → fetch documentation (only with frameworks), nothing else
// 2. commands-only → update commands
// 3. settings-only → create settings
// 4. normal path   → full setup, or the targeted create/update/generate/resolve
//                    actions, then fetch documentation last unless no-docs
//
// A stale note or stale documentation never triggers a settings reconcile;
// only a stale policy document (or --update) does.

use cs_policy::ProjectProfile;
use serde::ser::SerializeMap;
use serde::Serialize;

use crate::options::RunOptions;
use crate::state::{Conflict, ExistingSetupState};

/// The verb of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Generate,
    Fetch,
    Resolve,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Generate => "generate",
            ActionKind::Fetch => "fetch",
            ActionKind::Resolve => "resolve",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a setup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateFullSetup,
    CreateSettings,
    UpdateConfiguration,
    UpdateCommands,
    GenerateProjectNote,
    FetchDocumentation { frameworks: Vec<String> },
    ResolveConflicts { conflicts: Vec<Conflict> },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateFullSetup | Action::CreateSettings => ActionKind::Create,
            Action::UpdateConfiguration | Action::UpdateCommands => ActionKind::Update,
            Action::GenerateProjectNote => ActionKind::Generate,
            Action::FetchDocumentation { .. } => ActionKind::Fetch,
            Action::ResolveConflicts { .. } => ActionKind::Resolve,
        }
    }

    pub fn target(&self) -> &'static str {
        match self {
            Action::CreateFullSetup => "full-setup",
            Action::CreateSettings => "settings",
            Action::UpdateConfiguration => "configuration",
            Action::UpdateCommands => "commands",
            Action::GenerateProjectNote => "project-note",
            Action::FetchDocumentation { .. } => "documentation",
            Action::ResolveConflicts { .. } => "conflicts",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::FetchDocumentation { frameworks } => {
                write!(f, "Fetch documentation for {}", frameworks.join(", "))
            }
            Action::ResolveConflicts { conflicts } => {
                let conflicts: Vec<String> = conflicts.iter().map(ToString::to_string).collect();
                write!(f, "Resolve conflicts: {}", conflicts.join(", "))
            }
            other => {
                let verb = match other.kind() {
                    ActionKind::Create => "Create",
                    ActionKind::Update => "Update",
                    ActionKind::Generate => "Generate",
                    ActionKind::Fetch => "Fetch",
                    ActionKind::Resolve => "Resolve",
                };
                write!(f, "{} {}", verb, other.target())
            }
        }
    }
}

/// Serialized as `{"type", "target"}` plus the payload field, if any.
impl Serialize for Action {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.kind())?;
        map.serialize_entry("target", self.target())?;
        match self {
            Action::FetchDocumentation { frameworks } => {
                map.serialize_entry("frameworks", frameworks)?
            }
            Action::ResolveConflicts { conflicts } => map.serialize_entry("conflicts", conflicts)?,
            _ => {}
        }
        map.end()
    }
}

/// Plan the actions for one run.
pub fn plan(existing: &ExistingSetupState, profile: &ProjectProfile, options: &RunOptions) -> Vec<Action> {
    let frameworks: Vec<String> = profile.frameworks.iter().cloned().collect();

    if options.docs_only {
        if frameworks.is_empty() {
            return Vec::new();
        }
        return vec![Action::FetchDocumentation { frameworks }];
    }
    if options.commands_only {
        return vec![Action::UpdateCommands];
    }
    if options.settings_only {
        return vec![Action::CreateSettings];
    }

    let mut actions = Vec::new();
    if !existing.has_setup || options.reset {
        actions.push(Action::CreateFullSetup);
    } else {
        // Each staleness trigger is cleared by the action that owns its artifact.
        if (existing.has_policy_document && existing.settings_stale) || options.update {
            actions.push(Action::UpdateConfiguration);
        }
        if !existing.has_policy_document {
            actions.push(Action::CreateSettings);
        }
        if !existing.has_project_note
            || existing.note_stale
            || existing.has_conflict(&Conflict::NotePlaceholders)
        {
            actions.push(Action::GenerateProjectNote);
        }
        if !existing.conflicts.is_empty() {
            actions.push(Action::ResolveConflicts {
                conflicts: existing.conflicts.clone(),
            });
        }
    }

    if !options.no_docs && !frameworks.is_empty() {
        actions.push(Action::FetchDocumentation { frameworks });
    }
    actions
}

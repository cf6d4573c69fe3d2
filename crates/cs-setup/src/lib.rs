//! # cs-setup
//!
//! Setup lifecycle for claude-setup: detect what a project already has,
//! plan what to do about it, and carry the plan out.
//!
//! ## Key components
//!
//! - [`ExistingSetupState`]: read-only snapshot of the on-disk setup, with
//!   the derived [`SetupStatus`] (NoSetup → Current ⇄ NeedsUpdate)
//! - [`plan`]: the Action Planner: state + profile + options → ordered [`Action`]s
//! - [`UpdateReconciler`]: staleness checks and the backup → compile → merge
//!   → validate update path
//! - [`SettingsStore`]: JSON persistence with write-once timestamped backups
//! - [`Executor`]: runs an action list in order, aborting on the first fatal error
//! - [`DocumentationSink`]: seam for documentation retrieval ([`StubDocumentation`]
//!   writes offline placeholders)

pub mod config;
pub mod docs;
pub mod error;
pub mod executor;
pub mod layout;
pub mod note;
pub mod options;
pub mod planner;
pub mod reconciler;
pub mod state;
pub mod store;
pub mod templates;

pub use config::{load_profile, load_profile_or_default, SetupConfig};
pub use cs_policy::ProjectProfile;
pub use docs::{DocumentationSink, StubDocumentation};
pub use error::SetupError;
pub use executor::{ExecutionReport, Executor, SetupContext};
pub use layout::{ProjectPaths, SetupLayout};
pub use options::RunOptions;
pub use planner::{plan, Action, ActionKind};
pub use reconciler::{check_staleness, merge, StaleReason, Staleness, UpdateReconciler, UpdateResult};
pub use state::{Conflict, DetectionPolicy, ExistingSetupState, SetupStatus};
pub use store::SettingsStore;

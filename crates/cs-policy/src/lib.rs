//! # cs-policy
//!
//! Permission policy compiler for claude-setup.
//!
//! Turns a [`ProjectProfile`] into a [`PolicyDocument`]: the allow / ask /
//! deny permission tiers, post-edit hooks and environment that the coding
//! assistant's runtime enforces. Every document leaving the [`PolicyCompiler`]
//! has passed the [`validate`] schema check.
//!
//! ## Key invariants
//!
//! - **Floor deny set**: credential files and irreversible destructive
//!   commands are denied under every option combination.
//! - **Disjoint tiers**: a pattern string lives in exactly one tier; when two
//!   contributions disagree the stricter tier wins.
//! - **Shape is explicit**: the validator is always told which document shape
//!   (tiered or legacy) to check; it never guesses from content.

pub mod compiler;
pub mod document;
pub mod error;
pub mod profile;
pub mod registry;
pub mod safety;
pub mod validator;

pub use compiler::{CompilerOptions, PolicyCompiler, DEFAULT_TARGET_VERSION, FLOOR_DENY};
pub use document::{
    DefaultMode, DocumentShape, HookCommand, HookMatcher, LegacyDocument, LegacyPermissions,
    PermissionTier, Permissions, PolicyDocument, ValidatedDocument,
};
pub use error::{format_field_errors, FieldError, RegistryError, ValidationError};
pub use profile::{PackageManager, ProjectProfile};
pub use registry::{CapabilityKey, CapabilityRegistry, RuleContribution};
pub use safety::RepositorySafetyPolicy;
pub use validator::validate;

// reconciler.rs — Update Reconciler.
//
// Decides whether a persisted policy document is stale and folds a freshly
// compiled document into it.
//
// Staleness triggers, checked in order (first match wins):
// 1. The document cannot be parsed (corrupted)
// 2. Its version differs from the target version (exact string compare)
// 3. A required top-level field is absent
// 4. It fails schema validation for its shape
//
// Reconciliation steps, in order:
// a. Back up the persisted document (failure is a warning unless strict)
// b. Parse it; anything unreadable is treated as absent
// c. Compile a fresh document
// d. Merge: the fresh document wins except for user-owned fields
// e. Version and lastUpdated always come from the fresh document
// f. Validate the merged document; failure here is fatal

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use cs_policy::{
    format_field_errors, validate, CompilerOptions, DocumentShape, FieldError, PolicyCompiler,
    PolicyDocument, ProjectProfile,
};
use serde_json::Value;

use crate::error::SetupError;
use crate::store::SettingsStore;

/// Why a persisted document must be regenerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    Corrupted { message: String },
    VersionMismatch { found: String, target: String },
    MissingFields { fields: Vec<String> },
    InvalidSchema { errors: Vec<FieldError> },
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaleReason::Corrupted { message } => {
                write!(f, "settings file is corrupted: {}", message)
            }
            StaleReason::VersionMismatch { found, target } => {
                write!(f, "version mismatch: {} → {}", found, target)
            }
            StaleReason::MissingFields { fields } => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
            StaleReason::InvalidSchema { errors } => {
                write!(f, "settings validation failed:\n{}", format_field_errors(errors))
            }
        }
    }
}

/// Result of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// No persisted document.
    Missing,
    /// Persisted document matches the target version and validates.
    Current,
    Stale(StaleReason),
}

impl Staleness {
    pub fn needs_update(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }

    pub fn reason(&self) -> Option<&StaleReason> {
        match self {
            Staleness::Stale(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Classify a persisted document against a target version.
pub fn check_staleness(raw: Option<&str>, shape: DocumentShape, target_version: &str) -> Staleness {
    let Some(raw) = raw else {
        return Staleness::Missing;
    };

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            return Staleness::Stale(StaleReason::Corrupted {
                message: e.to_string(),
            })
        }
    };
    let Some(object) = value.as_object() else {
        return Staleness::Stale(StaleReason::Corrupted {
            message: "expected a JSON object".to_string(),
        });
    };

    let found = document_version(&value, shape).unwrap_or_else(|| "unknown".to_string());
    if found != target_version {
        return Staleness::Stale(StaleReason::VersionMismatch {
            found,
            target: target_version.to_string(),
        });
    }

    let missing: Vec<String> = shape
        .required_fields()
        .iter()
        .filter(|field| object.get(**field).map_or(true, Value::is_null))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Staleness::Stale(StaleReason::MissingFields { fields: missing });
    }

    match validate(&value, shape) {
        Ok(_) => Staleness::Current,
        Err(err) => Staleness::Stale(StaleReason::InvalidSchema { errors: err.errors }),
    }
}

/// The version a document declares, consulting the shape's version keys in order.
pub fn document_version(value: &Value, shape: DocumentShape) -> Option<String> {
    shape
        .version_keys()
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Fold a fresh document into an old one.
///
/// Every field comes from `fresh` except `customInstructions` and `created`,
/// which are carried over from `old` when it has usable values.
pub fn merge(old: Option<&Value>, mut fresh: PolicyDocument) -> PolicyDocument {
    let Some(old) = old else {
        return fresh;
    };

    if let Some(instructions) = old
        .get("customInstructions")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
    {
        fresh.custom_instructions = Some(instructions.to_string());
    }

    if let Some(raw) = old.get("created").and_then(Value::as_str) {
        match parse_created(raw) {
            Some(created) => fresh.created = Some(created),
            None => tracing::debug!(created = raw, "ignoring unparseable creation timestamp"),
        }
    }

    fresh
}

/// RFC 3339, or a bare date (as legacy documents sometimes carry) at midnight UTC.
fn parse_created(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Outcome of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// Backup written before the update, if there was a document to back up.
    pub backup_reference: Option<PathBuf>,
    /// Validated document ready to persist.
    pub merged_document: PolicyDocument,
    /// Why the old document was stale; `None` if it was current or absent.
    pub stale_reason: Option<StaleReason>,
}

/// Reconciles persisted documents against freshly compiled ones.
///
/// The target version is the compiler's, so a single injected value drives
/// both stamping and staleness.
pub struct UpdateReconciler<'a> {
    compiler: &'a PolicyCompiler,
    shape: DocumentShape,
    strict_backup: bool,
}

impl<'a> UpdateReconciler<'a> {
    pub fn new(compiler: &'a PolicyCompiler) -> Self {
        Self {
            compiler,
            shape: DocumentShape::Tiered,
            strict_backup: false,
        }
    }

    /// Shape persisted documents are checked against (tiered by default).
    pub fn with_shape(mut self, shape: DocumentShape) -> Self {
        self.shape = shape;
        self
    }

    /// Make backup failure abort the update.
    pub fn with_strict_backup(mut self, strict: bool) -> Self {
        self.strict_backup = strict;
        self
    }

    pub fn target_version(&self) -> &str {
        self.compiler.target_version()
    }

    pub fn check_staleness(&self, raw: Option<&str>) -> Staleness {
        check_staleness(raw, self.shape, self.target_version())
    }

    pub fn reconcile(
        &self,
        store: &SettingsStore,
        profile: &ProjectProfile,
        options: &CompilerOptions,
    ) -> Result<UpdateResult, SetupError> {
        let raw = store.read_raw().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "existing settings unreadable, treating as absent");
            None
        });
        let staleness = self.check_staleness(raw.as_deref());
        if let Some(reason) = staleness.reason() {
            tracing::info!(%reason, "settings need update");
        }

        // (a) Backup before any write.
        let backup_reference = if raw.is_some() {
            match store.backup() {
                Ok(path) => path,
                Err(e) if self.strict_backup => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "backup failed, continuing with update");
                    None
                }
            }
        } else {
            None
        };

        // (b) Unreadable or non-object documents count as absent.
        let old = raw.as_deref().and_then(|raw| {
            match serde_json::from_str::<Value>(raw) {
                Ok(value) if value.is_object() => Some(value),
                Ok(_) => {
                    tracing::warn!("existing settings are not a JSON object, starting fresh");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not parse existing settings, starting fresh");
                    None
                }
            }
        });

        // (c)–(e)
        let fresh = self.compiler.compile(profile, options)?;
        let merged = merge(old.as_ref(), fresh);

        // (f)
        validate(&merged.to_json_value()?, DocumentShape::Tiered)?;

        Ok(UpdateResult {
            backup_reference,
            merged_document: merged,
            stale_reason: staleness.reason().cloned(),
        })
    }
}

// error.rs — Error types for the policy subsystem.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single schema violation, addressed by its field path.
///
/// Paths use dotted keys with bracketed indices, e.g. `permissions.allow[3]`
/// or `hooks.PostToolUse[0].hooks[1].timeout`. The document root is `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A document failed the schema check. Carries one entry per violation.
///
/// This is fatal to a run: the compiler and reconciler never hand back a
/// partially valid document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("policy document failed validation:\n{}", format_field_errors(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Convenience for a single violation.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(path, message)],
        }
    }

    /// The offending field paths, in report order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.path.as_str())
    }
}

/// Render violations one per line as `path: message`.
pub fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised while assembling the capability registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two entries were registered under the same capability key.
    #[error("duplicate capability key '{key}' in rule registry")]
    DuplicateKey { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_path() {
        let err = ValidationError::new(vec![
            FieldError::new("permissions.allow[0]", "expected string, found number"),
            FieldError::new("", "expected object, found array"),
        ]);
        let display = err.to_string();
        assert!(display.contains("permissions.allow[0]: expected string"));
        assert!(display.contains("(root): expected object"));
        assert_eq!(
            err.paths().collect::<Vec<_>>(),
            vec!["permissions.allow[0]", ""]
        );
    }

    #[test]
    fn registry_error_display_names_key() {
        let err = RegistryError::DuplicateKey {
            key: "language:rust".to_string(),
        };
        assert!(err.to_string().contains("language:rust"));
    }
}

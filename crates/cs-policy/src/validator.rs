// validator.rs — Structural schema check for policy documents.
//
// `validate` is pure and total: it never panics and never touches the
// filesystem. It walks a `serde_json::Value` and collects every violation
// (not just the first) so callers can report them all at once.
//
// Checks performed:
// - required fields and their JSON types
// - array elements are strings where patterns are expected
// - `defaultMode` is one of default / ask / deny
// - hook timeouts are non-negative integers (one key per hook), `continueOnError` is boolean
// - (tiered) no pattern appears in more than one permission tier

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::document::{
    DefaultMode, DocumentShape, LegacyDocument, PermissionTier, PolicyDocument, ValidatedDocument,
};
use crate::error::{FieldError, ValidationError};

/// Validate `document` against `shape`.
///
/// The caller decides the shape; it is never inferred from content.
pub fn validate(document: &Value, shape: DocumentShape) -> Result<ValidatedDocument, ValidationError> {
    let mut checker = Checker::default();
    match shape {
        DocumentShape::Tiered => checker.tiered(document),
        DocumentShape::Legacy => checker.legacy(document),
    }
    if !checker.errors.is_empty() {
        return Err(ValidationError::new(checker.errors));
    }

    // Structure is sound; the typed conversion is expected to succeed.
    let typed = match shape {
        DocumentShape::Tiered => serde_json::from_value::<PolicyDocument>(document.clone())
            .map(ValidatedDocument::Tiered),
        DocumentShape::Legacy => serde_json::from_value::<LegacyDocument>(document.clone())
            .map(ValidatedDocument::Legacy),
    };
    typed.map_err(|e| ValidationError::single("", e.to_string()))
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(path, message));
    }

    fn mismatch(&mut self, path: impl Into<String>, expected: &str, found: &Value) {
        self.fail(
            path,
            format!("expected {}, found {}", expected, type_name(found)),
        );
    }

    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.mismatch(path, "object", other);
                None
            }
        }
    }

    /// Look up a required key; records "required" when absent.
    fn required<'a>(&mut self, map: &'a Map<String, Value>, path: &str, key: &str) -> Option<&'a Value> {
        match map.get(key) {
            Some(value) => Some(value),
            None => {
                self.fail(child(path, key), "required field is missing");
                None
            }
        }
    }

    fn string(&mut self, value: &Value, path: &str) {
        if !value.is_string() {
            self.mismatch(path, "string", value);
        }
    }

    fn required_string(&mut self, map: &Map<String, Value>, path: &str, key: &str) {
        if let Some(value) = self.required(map, path, key) {
            self.string(value, &child(path, key));
        }
    }

    fn optional_string(&mut self, map: &Map<String, Value>, path: &str, key: &str) {
        if let Some(value) = map.get(key) {
            self.string(value, &child(path, key));
        }
    }

    fn optional_timestamp(&mut self, map: &Map<String, Value>, path: &str, key: &str) {
        let Some(value) = map.get(key) else { return };
        let field = child(path, key);
        match value.as_str() {
            Some(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => {}
            Some(s) => self.fail(field, format!("'{}' is not an RFC 3339 timestamp", s)),
            None => self.mismatch(field, "string", value),
        }
    }

    /// Check an array of pattern strings; returns the valid `(index, pattern)` pairs.
    fn string_array<'a>(&mut self, value: &'a Value, path: &str) -> Vec<(usize, &'a str)> {
        let Value::Array(items) = value else {
            self.mismatch(path, "array", value);
            return Vec::new();
        };
        let mut patterns = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(s) => patterns.push((i, s)),
                None => self.mismatch(index(path, i), "string", item),
            }
        }
        patterns
    }

    fn tiered(&mut self, document: &Value) {
        let Some(root) = self.object(document, "") else { return };

        self.optional_string(root, "", "$schema");
        self.required_string(root, "", "schemaVersion");

        if let Some(permissions) = self.required(root, "", "permissions") {
            self.tiered_permissions(permissions, "permissions");
        }
        if let Some(hooks) = root.get("hooks") {
            self.hooks(hooks, "hooks");
        }
        if let Some(env) = root.get("env") {
            self.env(env, "env");
        }

        self.optional_string(root, "", "customInstructions");
        self.optional_timestamp(root, "", "created");
        self.optional_timestamp(root, "", "lastUpdated");
    }

    fn tiered_permissions(&mut self, value: &Value, path: &str) {
        let Some(map) = self.object(value, path) else { return };

        // First tier (and index) each pattern was seen in.
        let mut placed: HashMap<&str, PermissionTier> = HashMap::new();
        for tier in PermissionTier::ALL {
            let key = tier.as_str();
            let field = child(path, key);
            let patterns = match (tier, map.get(key)) {
                (PermissionTier::Allow, None) => {
                    self.fail(field, "required field is missing");
                    continue;
                }
                (_, None) => continue,
                (_, Some(v)) => self.string_array(v, &field),
            };
            for (i, pattern) in patterns {
                match placed.get(pattern) {
                    Some(other) if *other != tier => self.fail(
                        index(&field, i),
                        format!("pattern '{}' also appears in {}", pattern, other),
                    ),
                    Some(_) => {}
                    None => {
                        placed.insert(pattern, tier);
                    }
                }
            }
        }

        if let Some(mode) = map.get("defaultMode") {
            let field = child(path, "defaultMode");
            match mode.as_str() {
                Some(s) if DefaultMode::VALUES.contains(&s) => {}
                Some(s) => self.fail(
                    field,
                    format!(
                        "invalid value '{}', expected one of: {}",
                        s,
                        DefaultMode::VALUES.join(", ")
                    ),
                ),
                None => self.mismatch(field, "string", mode),
            }
        }
    }

    fn hooks(&mut self, value: &Value, path: &str) {
        let Some(events) = self.object(value, path) else { return };
        for (event, matchers) in events {
            let event_path = child(path, event);
            let Value::Array(matchers) = matchers else {
                self.mismatch(event_path, "array", matchers);
                continue;
            };
            for (i, matcher) in matchers.iter().enumerate() {
                self.hook_matcher(matcher, &index(&event_path, i));
            }
        }
    }

    fn hook_matcher(&mut self, value: &Value, path: &str) {
        let Some(map) = self.object(value, path) else { return };
        self.required_string(map, path, "matcher");
        let Some(hooks) = self.required(map, path, "hooks") else { return };
        let hooks_path = child(path, "hooks");
        let Value::Array(hooks) = hooks else {
            self.mismatch(hooks_path, "array", hooks);
            return;
        };
        for (i, hook) in hooks.iter().enumerate() {
            self.hook_command(hook, &index(&hooks_path, i));
        }
    }

    fn hook_command(&mut self, value: &Value, path: &str) {
        let Some(map) = self.object(value, path) else { return };
        self.required_string(map, path, "type");
        self.required_string(map, path, "command");

        if map.contains_key("timeout") && map.contains_key("timeoutSeconds") {
            self.fail(
                child(path, "timeoutSeconds"),
                "duplicate of `timeout`; set only one",
            );
        }
        for key in ["timeout", "timeoutSeconds"] {
            let Some(timeout) = map.get(key) else { continue };
            let field = child(path, key);
            match timeout {
                Value::Number(n) if n.as_u64().is_some() => {}
                Value::Number(n) => self.fail(
                    field,
                    format!("must be a non-negative whole number of seconds, found {}", n),
                ),
                other => self.mismatch(field, "integer", other),
            }
        }
        if let Some(flag) = map.get("continueOnError") {
            if !flag.is_boolean() {
                self.mismatch(child(path, "continueOnError"), "boolean", flag);
            }
        }
    }

    fn env(&mut self, value: &Value, path: &str) {
        let Some(vars) = self.object(value, path) else { return };
        for (key, value) in vars {
            self.string(value, &child(path, key));
        }
    }

    fn legacy(&mut self, document: &Value) {
        let Some(root) = self.object(document, "") else { return };

        self.required_string(root, "", "name");
        self.required_string(root, "", "version");

        if let Some(permissions) = self.required(root, "", "permissions") {
            if let Some(map) = self.object(permissions, "permissions") {
                for key in ["allow", "deny"] {
                    if let Some(list) = self.required(map, "permissions", key) {
                        self.string_array(list, &child("permissions", key));
                    }
                }
            }
        }
        if let Some(rules) = self.required(root, "", "rules") {
            self.string_array(rules, "rules");
        }

        self.optional_string(root, "", "customInstructions");
        self.optional_string(root, "", "created");
        self.optional_string(root, "", "lastUpdated");
    }
}

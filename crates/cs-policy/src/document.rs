// document.rs — Policy document shapes.
//
// Two on-disk shapes coexist for backward compatibility:
//
// - Tiered (current): `permissions{allow, ask, deny, defaultMode}` plus
//   optional `hooks` and `env`, stamped with `schemaVersion`.
// - Legacy: `name, version, permissions{allow, deny}, rules[]`.
//
// Both are valid JSON objects with overlapping field names, so the shape is
// always carried explicitly as a `DocumentShape` tag and never inferred.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON schema reference written into every tiered document.
pub const SETTINGS_SCHEMA_URL: &str = "https://json.schemastore.org/claude-code-settings.json";

/// Hook event fired after the assistant uses a tool.
pub const POST_TOOL_USE: &str = "PostToolUse";

/// Hook event fired before the assistant uses a tool.
pub const PRE_TOOL_USE: &str = "PreToolUse";

/// The three permission tiers, ordered by strictness: `Allow < Ask < Deny`.
///
/// When two contributions place the same pattern in different tiers, the
/// greater (stricter) tier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionTier {
    Allow,
    Ask,
    Deny,
}

impl PermissionTier {
    pub const ALL: [PermissionTier; 3] =
        [PermissionTier::Allow, PermissionTier::Ask, PermissionTier::Deny];

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionTier::Allow => "allow",
            PermissionTier::Ask => "ask",
            PermissionTier::Deny => "deny",
        }
    }
}

impl std::fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the runtime does with a tool call that matches no pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultMode {
    #[default]
    Default,
    Ask,
    Deny,
}

impl DefaultMode {
    /// Accepted wire values, used by the validator's enum check.
    pub const VALUES: [&'static str; 3] = ["default", "ask", "deny"];
}

/// The permission block of a tiered document.
///
/// Patterns are opaque `Category(argument-glob)` tokens such as `Bash(rm:*)`
/// or `Read(**/.env*)`; they are compared as whole strings, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub ask: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub default_mode: DefaultMode,
}

impl Permissions {
    /// Patterns in a given tier.
    pub fn tier(&self, tier: PermissionTier) -> &[String] {
        match tier {
            PermissionTier::Allow => &self.allow,
            PermissionTier::Ask => &self.ask,
            PermissionTier::Deny => &self.deny,
        }
    }

    /// The tier a pattern was placed in, if any.
    pub fn tier_of(&self, pattern: &str) -> Option<PermissionTier> {
        PermissionTier::ALL
            .into_iter()
            .find(|tier| self.tier(*tier).iter().any(|p| p == pattern))
    }
}

/// One command run by a hook.
///
/// The timeout is written as `timeout` (what the enforcing runtime reads);
/// `timeoutSeconds` is accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookCommand {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    #[serde(
        rename = "timeout",
        alias = "timeoutSeconds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,
}

impl HookCommand {
    /// A shell command hook with a bounded timeout.
    pub fn command(command: impl Into<String>, timeout_seconds: u64, continue_on_error: bool) -> Self {
        Self {
            kind: "command".to_string(),
            command: command.into(),
            timeout_seconds: Some(timeout_seconds),
            continue_on_error: Some(continue_on_error),
        }
    }
}

/// A tool-name matcher plus the hooks it triggers (e.g. `Edit|Write`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookMatcher {
    pub matcher: String,
    pub hooks: Vec<HookCommand>,
}

impl HookMatcher {
    pub fn new(matcher: impl Into<String>, hooks: Vec<HookCommand>) -> Self {
        Self {
            matcher: matcher.into(),
            hooks,
        }
    }
}

/// The tiered policy document, the current on-disk shape of `settings.json`.
///
/// `customInstructions` and `created` are user-owned and survive
/// reconciliation; everything else is regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub schema_version: String,
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hooks: BTreeMap<String, Vec<HookMatcher>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PolicyDocument {
    /// Hook matchers registered for an event, empty if none.
    pub fn hooks_for(&self, event: &str) -> &[HookMatcher] {
        self.hooks.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every hook command across all events, in event then matcher order.
    pub fn hook_commands(&self) -> impl Iterator<Item = &HookCommand> {
        self.hooks
            .values()
            .flat_map(|matchers| matchers.iter().flat_map(|m| m.hooks.iter()))
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Permission block of the legacy shape (no `ask` tier).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegacyPermissions {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

/// The legacy policy document written by earlier releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDocument {
    pub name: String,
    pub version: String,
    pub permissions: LegacyPermissions,
    pub rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Which document shape a validation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentShape {
    #[default]
    Tiered,
    Legacy,
}

impl DocumentShape {
    /// Top-level fields whose absence makes a persisted document stale.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            DocumentShape::Tiered => &["schemaVersion", "permissions"],
            DocumentShape::Legacy => &["name", "version", "permissions", "rules"],
        }
    }

    /// Keys consulted, in order, for a document's version string.
    ///
    /// Tiered documents fall back to `version` so that files written before
    /// `schemaVersion` existed are still recognised (and found stale).
    pub fn version_keys(self) -> &'static [&'static str] {
        match self {
            DocumentShape::Tiered => &["schemaVersion", "version"],
            DocumentShape::Legacy => &["version"],
        }
    }
}

impl std::fmt::Display for DocumentShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentShape::Tiered => f.write_str("tiered"),
            DocumentShape::Legacy => f.write_str("legacy"),
        }
    }
}

/// A document that passed validation, tagged with the shape it passed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedDocument {
    Tiered(PolicyDocument),
    Legacy(LegacyDocument),
}

impl ValidatedDocument {
    pub fn shape(&self) -> DocumentShape {
        match self {
            ValidatedDocument::Tiered(_) => DocumentShape::Tiered,
            ValidatedDocument::Legacy(_) => DocumentShape::Legacy,
        }
    }

    pub fn custom_instructions(&self) -> Option<&str> {
        match self {
            ValidatedDocument::Tiered(doc) => doc.custom_instructions.as_deref(),
            ValidatedDocument::Legacy(doc) => doc.custom_instructions.as_deref(),
        }
    }

    pub fn into_tiered(self) -> Option<PolicyDocument> {
        match self {
            ValidatedDocument::Tiered(doc) => Some(doc),
            ValidatedDocument::Legacy(_) => None,
        }
    }
}

// compiler.rs — Policy Compiler.
//
// Compiles a ProjectProfile into a tiered PolicyDocument.
//
// The compiler:
// 1. Starts from a baseline: core safe reads (allow), mutating package and
//    VCS commands (ask), and the floor deny set
// 2. Applies registry contributions for every language, package manager,
//    framework, dependency and structure flag in the profile
// 3. Applies option modifiers: `safe_only` collapses allow to a fixed
//    read-only subset; otherwise `include_destructive` adds reversible,
//    path-scoped operations
// 4. Merges in the repository safety sub-policy (deny patterns + hooks)
// 5. Resolves tiers so each pattern lives in exactly one, stricter tier wins
// 6. Validates the result against the tiered schema
//
// The key invariant: the floor deny set is ALWAYS present in `deny` and no
// pattern is both allowed and denied. Both are checked before returning.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::document::{
    DefaultMode, DocumentShape, HookMatcher, PermissionTier, Permissions, PolicyDocument,
    SETTINGS_SCHEMA_URL,
};
use crate::error::{FieldError, RegistryError, ValidationError};
use crate::profile::ProjectProfile;
use crate::registry::CapabilityRegistry;
use crate::safety::RepositorySafetyPolicy;
use crate::validator::validate;

/// Schema version stamped on compiled documents unless configured otherwise.
pub const DEFAULT_TARGET_VERSION: &str = "2.0.0";

/// Denied under every option combination: credential files and
/// irreversible destructive commands.
pub const FLOOR_DENY: &[&str] = &[
    "Read(.env*)",
    "Read(**/.env*)",
    "Read(secrets/**)",
    "Read(credentials.*)",
    "Edit(.env*)",
    "Write(.env*)",
    "Bash(rm:*)",
    "Bash(rmdir:*)",
    "Bash(sudo:*)",
    // Can exfiltrate data.
    "Bash(curl:*)",
    "Bash(chmod:*)",
    "Bash(chown:*)",
    "Bash(dd:*)",
    "Bash(mkfs:*)",
];

/// Baseline allow set: reads, search, inspection and documentation fetches.
pub const CORE_ALLOW: &[&str] = &[
    "Read(**/*)",
    "Edit(**/*)",
    "Write(**/*)",
    "Glob(**/*)",
    "Grep(*)",
    "Bash(ls:*)",
    "Bash(cat:*)",
    "Bash(head:*)",
    "Bash(tail:*)",
    "Bash(pwd:*)",
    "Bash(which:*)",
    "Bash(git status:*)",
    "Bash(git diff:*)",
    "Bash(git log:*)",
    "Bash(git show:*)",
    "Bash(git branch:*)",
    "Bash(node --version:*)",
    "Bash(npm --version:*)",
    "Bash(uname:*)",
    "Bash(whoami:*)",
    "WebFetch(*)",
];

/// Baseline ask set: dependency changes, permanent VCS writes, long builds.
pub const CORE_ASK: &[&str] = &[
    "Bash(npm install:*)",
    "Bash(npm ci:*)",
    "Bash(yarn install:*)",
    "Bash(pnpm install:*)",
    "Bash(bun install:*)",
    "Bash(git commit:*)",
    "Bash(git push:*)",
    "Bash(npm run build:*)",
    "Bash(npm run test:*)",
];

/// The whole allow tier under `safe_only`: read-only inspection and
/// status-only version control.
pub const SAFE_ONLY_ALLOW: &[&str] = &[
    "Read(**/*)",
    "Glob(**/*)",
    "Grep(*)",
    "Bash(ls:*)",
    "Bash(cat:*)",
    "Bash(git status:*)",
];

/// Added by `include_destructive`: operations that are undoable or scoped by
/// glob to scratch and backup files.
pub const REVERSIBLE_DESTRUCTIVE_ALLOW: &[&str] = &[
    "Bash(touch:*.tmp)",
    "Bash(cp:*.bak)",
    "Bash(mv:*.bak)",
    "Bash(mkdir:*)",
    "Bash(git stash:*)",
    "Bash(git restore --staged:*)",
];

/// Options for the Policy Compiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Collapse the allow tier to [`SAFE_ONLY_ALLOW`]. Takes precedence over
    /// `include_destructive`.
    pub safe_only: bool,
    /// Append [`REVERSIBLE_DESTRUCTIVE_ALLOW`].
    pub include_destructive: bool,
}

/// Transforms project profiles into enforceable policy documents.
pub struct PolicyCompiler {
    registry: CapabilityRegistry,
    target_version: String,
}

impl PolicyCompiler {
    /// Create a compiler stamping documents with `target_version`.
    ///
    /// The version is injected rather than read from a constant so callers
    /// (and tests) can simulate version transitions.
    pub fn new(registry: CapabilityRegistry, target_version: impl Into<String>) -> Self {
        Self {
            registry,
            target_version: target_version.into(),
        }
    }

    /// Create a compiler over the built-in registry.
    pub fn with_builtin_registry(target_version: impl Into<String>) -> Result<Self, RegistryError> {
        Ok(Self::new(CapabilityRegistry::builtin()?, target_version))
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Compile a profile into a validated PolicyDocument.
    pub fn compile(
        &self,
        profile: &ProjectProfile,
        options: &CompilerOptions,
    ) -> Result<PolicyDocument, ValidationError> {
        self.compile_at(profile, options, Utc::now())
    }

    /// Compile with an explicit timestamp for `created` / `lastUpdated`.
    pub fn compile_at(
        &self,
        profile: &ProjectProfile,
        options: &CompilerOptions,
        now: DateTime<Utc>,
    ) -> Result<PolicyDocument, ValidationError> {
        let mut tiers = TierSet::default();
        let mut hooks = HookSet::default();
        let mut env = BTreeMap::new();

        tiers.extend(PermissionTier::Deny, FLOOR_DENY.iter().copied());

        if options.safe_only {
            // Step 3a: nothing but the fixed read-only subset.
            tracing::debug!("safe-only compile: discarding baseline and extension rules");
            tiers.extend(PermissionTier::Allow, SAFE_ONLY_ALLOW.iter().copied());
        } else {
            // Steps 1–2: baseline plus registry contributions.
            tiers.extend(PermissionTier::Allow, CORE_ALLOW.iter().copied());
            tiers.extend(PermissionTier::Ask, CORE_ASK.iter().copied());

            for (key, contribution) in self.registry.contributions_for(profile) {
                tracing::debug!(%key, "applying rule contribution");
                tiers.extend(PermissionTier::Allow, contribution.allow.iter().map(String::as_str));
                tiers.extend(PermissionTier::Ask, contribution.ask.iter().map(String::as_str));
                tiers.extend(PermissionTier::Deny, contribution.deny.iter().map(String::as_str));
                for (event, matcher) in &contribution.hooks {
                    hooks.push(event, matcher.clone());
                }
                for (name, value) in &contribution.env {
                    env.entry(name.clone()).or_insert_with(|| value.clone());
                }
            }

            // Step 3b: reversible destructive operations.
            if options.include_destructive {
                tiers.extend(
                    PermissionTier::Allow,
                    REVERSIBLE_DESTRUCTIVE_ALLOW.iter().copied(),
                );
            }
        }

        // Step 4: the safety sub-policy applies regardless of options.
        let safety = RepositorySafetyPolicy::generate();
        tiers.extend(PermissionTier::Deny, safety.deny.iter().map(String::as_str));
        for (event, matchers) in safety.hooks {
            for matcher in matchers {
                hooks.push(&event, matcher);
            }
        }

        // Step 5: one tier per pattern.
        let permissions = tiers.resolve();

        let document = PolicyDocument {
            schema: Some(SETTINGS_SCHEMA_URL.to_string()),
            schema_version: self.target_version.clone(),
            permissions,
            hooks: hooks.into_map(),
            env,
            custom_instructions: None,
            created: Some(now),
            last_updated: Some(now),
        };

        // Step 6: the document must pass its own schema and keep the floor.
        Self::check(&document)?;
        tracing::debug!(
            allow = document.permissions.allow.len(),
            ask = document.permissions.ask.len(),
            deny = document.permissions.deny.len(),
            "policy compiled"
        );
        Ok(document)
    }

    /// Validate a compiled document and verify the floor deny set survived.
    fn check(document: &PolicyDocument) -> Result<(), ValidationError> {
        let value = document
            .to_json_value()
            .map_err(|e| ValidationError::single("", e.to_string()))?;
        validate(&value, DocumentShape::Tiered)?;

        let missing: Vec<FieldError> = FLOOR_DENY
            .iter()
            .filter(|p| !document.permissions.deny.iter().any(|d| d == *p))
            .map(|p| FieldError::new("permissions.deny", format!("floor pattern '{}' is missing", p)))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(missing))
        }
    }
}

/// Ordered, de-duplicated pattern lists per tier.
#[derive(Default)]
struct TierSet {
    allow: Vec<String>,
    ask: Vec<String>,
    deny: Vec<String>,
    seen: HashSet<(PermissionTier, String)>,
}

impl TierSet {
    fn extend<'a>(&mut self, tier: PermissionTier, patterns: impl IntoIterator<Item = &'a str>) {
        for pattern in patterns {
            if !self.seen.insert((tier, pattern.to_string())) {
                continue;
            }
            let list = match tier {
                PermissionTier::Allow => &mut self.allow,
                PermissionTier::Ask => &mut self.ask,
                PermissionTier::Deny => &mut self.deny,
            };
            list.push(pattern.to_string());
        }
    }

    /// Drop each pattern from every tier less strict than its strictest one.
    fn resolve(self) -> Permissions {
        let denied: HashSet<&str> = self.deny.iter().map(String::as_str).collect();
        let ask: Vec<String> = self
            .ask
            .iter()
            .filter(|p| !denied.contains(p.as_str()))
            .cloned()
            .collect();
        let asked: HashSet<&str> = ask.iter().map(String::as_str).collect();
        let allow: Vec<String> = self
            .allow
            .iter()
            .filter(|p| !denied.contains(p.as_str()) && !asked.contains(p.as_str()))
            .cloned()
            .collect();

        Permissions {
            allow,
            ask,
            deny: self.deny,
            default_mode: DefaultMode::Default,
        }
    }
}

/// Hook matchers per event, concatenated in arrival order.
#[derive(Default)]
struct HookSet {
    events: BTreeMap<String, Vec<HookMatcher>>,
}

impl HookSet {
    fn push(&mut self, event: &str, matcher: HookMatcher) {
        let matchers = self.events.entry(event.to_string()).or_default();
        if !matchers.contains(&matcher) {
            matchers.push(matcher);
        }
    }

    fn into_map(self) -> BTreeMap<String, Vec<HookMatcher>> {
        self.events
    }
}

// registry.rs — Capability registry: per-language/framework rule tables.
//
// Every extension the compiler can apply is an explicit entry here, keyed by
// a `CapabilityKey` (`language:rust`, `framework:prisma`, ...). The registry
// is assembled once at startup and rejects duplicate keys, so a rule table
// can never be silently shadowed by a later one.

use std::collections::BTreeMap;

use crate::document::{HookCommand, HookMatcher, POST_TOOL_USE};
use crate::error::RegistryError;
use crate::profile::{ProjectProfile, JS_FAMILY};

/// What a registry entry is keyed on.
///
/// Ordering follows declaration order, then name, which is also the order
/// contributions are applied in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapabilityKey {
    Language(String),
    PackageManager(String),
    Framework(String),
    Dependency(String),
    Flag(String),
}

impl CapabilityKey {
    pub fn language(name: &str) -> Self {
        CapabilityKey::Language(name.to_string())
    }

    pub fn package_manager(name: &str) -> Self {
        CapabilityKey::PackageManager(name.to_string())
    }

    pub fn framework(name: &str) -> Self {
        CapabilityKey::Framework(name.to_string())
    }

    pub fn dependency(name: &str) -> Self {
        CapabilityKey::Dependency(name.to_string())
    }

    pub fn flag(name: &str) -> Self {
        CapabilityKey::Flag(name.to_string())
    }
}

impl std::fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKey::Language(name) => write!(f, "language:{}", name),
            CapabilityKey::PackageManager(name) => write!(f, "package-manager:{}", name),
            CapabilityKey::Framework(name) => write!(f, "framework:{}", name),
            CapabilityKey::Dependency(name) => write!(f, "dependency:{}", name),
            CapabilityKey::Flag(name) => write!(f, "flag:{}", name),
        }
    }
}

/// The rules one capability adds to a compiled document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleContribution {
    pub allow: Vec<String>,
    pub ask: Vec<String>,
    pub deny: Vec<String>,
    /// `(event, matcher)` pairs appended to the document's hooks.
    pub hooks: Vec<(String, HookMatcher)>,
    pub env: Vec<(String, String)>,
    /// When non-empty, the entry only applies if the profile has at least
    /// one of these languages.
    pub requires_any_language: Vec<String>,
}

impl RuleContribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, patterns: &[&str]) -> Self {
        self.allow.extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    pub fn ask(mut self, patterns: &[&str]) -> Self {
        self.ask.extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    pub fn deny(mut self, patterns: &[&str]) -> Self {
        self.deny.extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    pub fn hook(mut self, event: &str, matcher: HookMatcher) -> Self {
        self.hooks.push((event.to_string(), matcher));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn requires_any_language(mut self, languages: &[&str]) -> Self {
        self.requires_any_language
            .extend(languages.iter().map(|l| l.to_string()));
        self
    }

    fn applies_to(&self, profile: &ProjectProfile) -> bool {
        self.requires_any_language.is_empty()
            || self
                .requires_any_language
                .iter()
                .any(|lang| profile.has_language(lang))
    }
}

/// Mapping from capability key to its rule contribution.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<CapabilityKey, RuleContribution>,
}

impl CapabilityRegistry {
    /// Build a registry, failing on the first duplicate key.
    pub fn new<I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (CapabilityKey, RuleContribution)>,
    {
        let mut map = BTreeMap::new();
        for (key, contribution) in entries {
            if map.contains_key(&key) {
                return Err(RegistryError::DuplicateKey {
                    key: key.to_string(),
                });
            }
            map.insert(key, contribution);
        }
        Ok(Self { entries: map })
    }

    /// The built-in rule tables shipped with claude-setup.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_entries())
    }

    pub fn get(&self, key: &CapabilityKey) -> Option<&RuleContribution> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CapabilityKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Contributions that apply to a profile, in application order:
    /// languages, package manager, frameworks, dependencies, then flags.
    ///
    /// Capabilities with no registry entry are skipped.
    pub fn contributions_for<'a>(
        &'a self,
        profile: &ProjectProfile,
    ) -> Vec<(&'a CapabilityKey, &'a RuleContribution)> {
        let mut wanted: Vec<CapabilityKey> = Vec::new();
        wanted.extend(profile.languages.iter().map(|l| CapabilityKey::language(l)));
        if let Some(pm) = profile.package_manager {
            wanted.push(CapabilityKey::package_manager(pm.as_str()));
        }
        wanted.extend(profile.frameworks.iter().map(|f| CapabilityKey::framework(f)));
        wanted.extend(
            profile
                .dependencies
                .keys()
                .map(|d| CapabilityKey::dependency(d)),
        );
        wanted.extend(profile.enabled_flags().map(CapabilityKey::flag));

        wanted
            .iter()
            .filter_map(|key| match self.entries.get_key_value(key) {
                Some((key, contribution)) if contribution.applies_to(profile) => {
                    Some((key, contribution))
                }
                Some((key, _)) => {
                    tracing::debug!(%key, "rule contribution skipped: language requirement not met");
                    None
                }
                None => None,
            })
            .collect()
    }
}

/// Shared Node.js tooling reads for JavaScript and TypeScript projects.
fn js_family_rules() -> RuleContribution {
    RuleContribution::new().allow(&[
        "Bash(npm list:*)",
        "Bash(npm outdated:*)",
        "Bash(npm view:*)",
        "Read(package.json)",
        "Read(package-lock.json)",
        "Read(tsconfig.json)",
    ])
}

fn docker_rules() -> RuleContribution {
    RuleContribution::new().allow(&[
        "Bash(docker ps:*)",
        "Bash(docker images:*)",
        "Bash(docker logs:*)",
    ])
}

fn builtin_entries() -> Vec<(CapabilityKey, RuleContribution)> {
    vec![
        // Languages
        (CapabilityKey::language("javascript"), js_family_rules()),
        (
            CapabilityKey::language("typescript"),
            js_family_rules().hook(
                POST_TOOL_USE,
                HookMatcher::new(
                    "Edit|Write",
                    vec![HookCommand::command("npx tsc --noEmit", 10, true)],
                ),
            ),
        ),
        (
            CapabilityKey::language("python"),
            RuleContribution::new()
                .allow(&[
                    "Bash(python --version:*)",
                    "Bash(pip list:*)",
                    "Bash(pip show:*)",
                    "Read(requirements.txt)",
                    "Read(pyproject.toml)",
                ])
                .ask(&["Bash(pip install:*)"]),
        ),
        (
            CapabilityKey::language("go"),
            RuleContribution::new()
                .allow(&[
                    "Bash(go version:*)",
                    "Bash(go list:*)",
                    "Read(go.mod)",
                    "Read(go.sum)",
                ])
                .ask(&["Bash(go get:*)"]),
        ),
        (
            CapabilityKey::language("rust"),
            RuleContribution::new()
                .allow(&[
                    "Bash(cargo --version:*)",
                    "Bash(rustc --version:*)",
                    "Read(Cargo.toml)",
                    "Read(Cargo.lock)",
                ])
                .ask(&["Bash(cargo build:*)"]),
        ),
        // Package managers (JavaScript-family only)
        (
            CapabilityKey::package_manager("yarn"),
            RuleContribution::new()
                .allow(&["Bash(yarn list:*)"])
                .ask(&["Bash(yarn add:*)"])
                .requires_any_language(JS_FAMILY),
        ),
        (
            CapabilityKey::package_manager("pnpm"),
            RuleContribution::new()
                .allow(&["Bash(pnpm list:*)"])
                .ask(&["Bash(pnpm add:*)"])
                .requires_any_language(JS_FAMILY),
        ),
        (
            CapabilityKey::package_manager("bun"),
            RuleContribution::new()
                .allow(&["Bash(bun --version:*)"])
                .ask(&["Bash(bun install:*)"])
                .requires_any_language(JS_FAMILY),
        ),
        // Frameworks
        (
            CapabilityKey::framework("react"),
            RuleContribution::new()
                .allow(&["Read(pages/**/*)", "Read(app/**/*)", "Read(public/**/*)"])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("nextjs"),
            RuleContribution::new()
                .allow(&[
                    "Read(pages/**/*)",
                    "Read(app/**/*)",
                    "Read(public/**/*)",
                    "Read(next.config.*)",
                ])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("astro"),
            RuleContribution::new()
                .allow(&[
                    "Read(astro.config.*)",
                    "Read(src/pages/**/*)",
                    "Read(src/components/**/*)",
                ])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("vue"),
            RuleContribution::new()
                .allow(&["Read(vite.config.*)", "Read(src/components/**/*)"])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("svelte"),
            RuleContribution::new()
                .allow(&["Read(svelte.config.*)", "Read(src/routes/**/*)"])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("express"),
            RuleContribution::new()
                .allow(&["Read(routes/**/*)", "Read(middleware/**/*)"])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("prisma"),
            RuleContribution::new()
                .allow(&["Read(prisma/schema.prisma)", "Bash(npx prisma:*)"])
                // Migrations rewrite the database; they must be run by hand.
                .deny(&["Bash(npx prisma migrate:*)"])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("drizzle"),
            RuleContribution::new()
                .allow(&["Read(drizzle.config.*)", "Read(drizzle/**/*)"])
                .env("NODE_ENV", "development"),
        ),
        (
            CapabilityKey::framework("django"),
            RuleContribution::new()
                .allow(&["Read(manage.py)", "Bash(python manage.py check:*)"])
                .ask(&["Bash(python manage.py migrate:*)"]),
        ),
        (
            CapabilityKey::framework("flask"),
            RuleContribution::new().allow(&["Bash(flask routes:*)"]),
        ),
        (
            CapabilityKey::framework("fastapi"),
            RuleContribution::new().allow(&["Read(openapi.json)"]),
        ),
        // Dependencies and structure flags
        (CapabilityKey::dependency("docker"), docker_rules()),
        (CapabilityKey::flag("hasDocker"), docker_rules()),
        (
            CapabilityKey::dependency("prettier"),
            RuleContribution::new().hook(
                POST_TOOL_USE,
                HookMatcher::new(
                    "Edit|Write",
                    vec![HookCommand::command(
                        "npx prettier --write \"$CLAUDE_FILE_PATHS\"",
                        5,
                        true,
                    )],
                ),
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PackageManager;

    #[test]
    fn builtin_registry_has_no_duplicate_keys() {
        let registry = CapabilityRegistry::builtin().unwrap();
        assert_eq!(registry.len(), builtin_entries().len());
        assert!(registry.contains(&CapabilityKey::language("typescript")));
        assert!(registry.contains(&CapabilityKey::dependency("prettier")));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let result = CapabilityRegistry::new(vec![
            (CapabilityKey::language("go"), RuleContribution::new()),
            (
                CapabilityKey::language("go"),
                RuleContribution::new().allow(&["Bash(go version:*)"]),
            ),
        ]);
        match result {
            Err(RegistryError::DuplicateKey { key }) => assert_eq!(key, "language:go"),
            other => panic!("expected DuplicateKey, got {:?}", other),
        }
    }

    #[test]
    fn same_name_under_different_kinds_is_not_a_duplicate() {
        let registry = CapabilityRegistry::new(vec![
            (CapabilityKey::dependency("docker"), RuleContribution::new()),
            (CapabilityKey::flag("docker"), RuleContribution::new()),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn contributions_follow_application_order() {
        let registry = CapabilityRegistry::builtin().unwrap();
        let profile = ProjectProfile::default()
            .with_languages(["typescript", "javascript"])
            .with_frameworks(["react"])
            .with_package_manager(PackageManager::Yarn)
            .with_dependency("prettier", "^3.0.0")
            .with_flag("hasDocker", true);

        let keys: Vec<String> = registry
            .contributions_for(&profile)
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                "language:javascript",
                "language:typescript",
                "package-manager:yarn",
                "framework:react",
                "dependency:prettier",
                "flag:hasDocker",
            ]
        );
    }

    #[test]
    fn package_manager_rules_need_a_js_language() {
        let registry = CapabilityRegistry::builtin().unwrap();
        let profile = ProjectProfile::default()
            .with_languages(["python"])
            .with_package_manager(PackageManager::Pnpm);
        let keys: Vec<String> = registry
            .contributions_for(&profile)
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(keys, vec!["language:python"]);
    }

    #[test]
    fn unknown_capabilities_contribute_nothing() {
        let registry = CapabilityRegistry::builtin().unwrap();
        let profile = ProjectProfile::default()
            .with_languages(["cobol"])
            .with_frameworks(["qwik"]);
        assert!(registry.contributions_for(&profile).is_empty());
    }

    #[test]
    fn disabled_flags_are_ignored() {
        let registry = CapabilityRegistry::builtin().unwrap();
        let profile = ProjectProfile::default().with_flag("hasDocker", false);
        assert!(registry.contributions_for(&profile).is_empty());
    }

    #[test]
    fn key_display_uses_kind_prefix() {
        assert_eq!(CapabilityKey::framework("astro").to_string(), "framework:astro");
        assert_eq!(
            CapabilityKey::package_manager("bun").to_string(),
            "package-manager:bun"
        );
    }
}

// safety.rs — Repository safety sub-policy.
//
// Generated independently of the project profile and run options. It
// write-protects version-control metadata and blocks force-push-style
// history rewrites. The compiler concatenates its hooks into the same event
// keys as the profile-driven hooks rather than replacing them.

use std::collections::BTreeMap;

use crate::document::{HookCommand, HookMatcher, PRE_TOOL_USE};

/// Shell guard rejecting any edit whose target lives under `.git/`.
const GIT_METADATA_GUARD: &str = "sh -c 'case \"$CLAUDE_FILE_PATHS\" in *.git/*) \
echo \"blocked: .git metadata is write-protected\" >&2; exit 2;; esac'";

/// Shell guard rejecting forced pushes.
const FORCE_PUSH_GUARD: &str = "sh -c 'case \"$CLAUDE_TOOL_INPUT\" in \
*\"push --force\"*|*\"push -f\"*|*\"push --mirror\"*) \
echo \"blocked: force push requires a manual run\" >&2; exit 2;; esac'";

/// Deny patterns contributed by the safety sub-policy.
pub const SAFETY_DENY: &[&str] = &[
    "Edit(.git/**)",
    "Write(.git/**)",
    "Bash(git push --force:*)",
    "Bash(git push -f:*)",
    "Bash(git push --mirror:*)",
];

/// The repository safety sub-policy: deny patterns plus blocking hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySafetyPolicy {
    pub deny: Vec<String>,
    pub hooks: BTreeMap<String, Vec<HookMatcher>>,
}

impl RepositorySafetyPolicy {
    pub fn generate() -> Self {
        let mut hooks = BTreeMap::new();
        hooks.insert(
            PRE_TOOL_USE.to_string(),
            vec![
                HookMatcher::new(
                    "Edit|Write|MultiEdit",
                    vec![HookCommand::command(GIT_METADATA_GUARD, 5, false)],
                ),
                HookMatcher::new(
                    "Bash",
                    vec![HookCommand::command(FORCE_PUSH_GUARD, 5, false)],
                ),
            ],
        );
        Self {
            deny: SAFETY_DENY.iter().map(|p| p.to_string()).collect(),
            hooks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_policy_guards_git_metadata_and_force_push() {
        let policy = RepositorySafetyPolicy::generate();
        assert!(policy.deny.contains(&"Write(.git/**)".to_string()));
        assert!(policy.deny.contains(&"Bash(git push --force:*)".to_string()));

        let matchers = &policy.hooks[PRE_TOOL_USE];
        assert_eq!(matchers.len(), 2);
        assert!(matchers[0].hooks[0].command.contains(".git/"));
        assert!(matchers[1].hooks[0].command.contains("push --force"));
    }

    #[test]
    fn safety_hooks_block_rather_than_continue() {
        let policy = RepositorySafetyPolicy::generate();
        for matcher in policy.hooks.values().flatten() {
            for hook in &matcher.hooks {
                assert_eq!(hook.continue_on_error, Some(false));
                assert!(hook.timeout_seconds.is_some());
            }
        }
    }
}

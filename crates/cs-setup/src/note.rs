// note.rs — Project note (CLAUDE.md) rendering and freshness checks.

use cs_policy::{PackageManager, ProjectProfile};

/// Notes shorter than this (after trimming) are treated as unfilled.
pub const MIN_NOTE_LEN: usize = 100;

/// Title placeholder left by hand-copied templates.
pub const TITLE_PLACEHOLDER: &str = "[Your Project Name]";

/// Section placeholder left by hand-copied templates.
pub const DESCRIPTION_PLACEHOLDER: &str = "<!-- Brief description of project purpose";

/// Whether an existing note should be regenerated.
pub fn note_is_stale(content: &str) -> bool {
    content.trim().chars().count() < MIN_NOTE_LEN || content.contains(TITLE_PLACEHOLDER)
}

/// Whether an existing note still carries template placeholders.
pub fn has_template_placeholders(content: &str) -> bool {
    content.contains(DESCRIPTION_PLACEHOLDER)
}

/// Render the project note for a profile.
pub fn render(project_name: &str, profile: &ProjectProfile) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", project_name));
    out.push_str(
        "Guidance for the coding assistant working in this repository. \
         Regenerated by claude-setup; edit freely, then keep it current.\n\n",
    );

    out.push_str("## Tech Stack\n\n");
    out.push_str(&format!("- Languages: {}\n", list_or_none(&profile.languages)));
    out.push_str(&format!("- Frameworks: {}\n", list_or_none(&profile.frameworks)));
    if let Some(pm) = profile.package_manager {
        out.push_str(&format!("- Package manager: {}\n", pm));
    }
    out.push('\n');

    let commands = common_commands(profile);
    if !commands.is_empty() {
        out.push_str("## Common Commands\n\n```sh\n");
        for (command, what) in commands {
            out.push_str(&format!("{:<28} # {}\n", command, what));
        }
        out.push_str("```\n\n");
    }

    out.push_str("## Permissions\n\n");
    out.push_str(
        "Tool permissions live in `.claude/settings.json` and are regenerated on \
         update. Personal overrides belong in `.claude/settings.local.json`. \
         Credential files and destructive commands are always denied.\n",
    );

    if !profile.frameworks.is_empty() {
        out.push_str("\n## Documentation\n\n");
        out.push_str("Framework reference material is collected in `docs/parsed-docs.md`.\n");
    }
    out
}

fn list_or_none<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let items: Vec<&str> = items.into_iter().map(String::as_str).collect();
    if items.is_empty() {
        "none detected".to_string()
    } else {
        items.join(", ")
    }
}

fn common_commands(profile: &ProjectProfile) -> Vec<(String, &'static str)> {
    let mut commands = Vec::new();
    if profile.is_js_family() {
        let pm = profile.package_manager.unwrap_or(PackageManager::Npm);
        let run = match pm {
            PackageManager::Npm => "npm run".to_string(),
            other => other.to_string(),
        };
        commands.push((format!("{} install", pm), "install dependencies"));
        commands.push((format!("{} dev", run), "start the dev server"));
        commands.push((format!("{} build", run), "production build"));
        commands.push((format!("{} test", run), "run tests"));
    }
    if profile.has_language("typescript") {
        commands.push(("npx tsc --noEmit".to_string(), "type check"));
    }
    if profile.has_language("python") {
        commands.push(("pip install -r requirements.txt".to_string(), "install dependencies"));
        commands.push(("pytest".to_string(), "run tests"));
    }
    if profile.has_language("go") {
        commands.push(("go build ./...".to_string(), "build"));
        commands.push(("go test ./...".to_string(), "run tests"));
    }
    if profile.has_language("rust") {
        commands.push(("cargo build".to_string(), "build"));
        commands.push(("cargo test".to_string(), "run tests"));
    }
    commands
}

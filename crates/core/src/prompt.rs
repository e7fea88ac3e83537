//! Prompt templates.
//!
//! Templates are Markdown files named after the gateway operation they serve
//! (`plan_curriculum.md`, ...) with `{placeholder}` markers.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const SUPERVISOR_DECIDE: &str = "supervisor_decide";
pub const PLAN_CURRICULUM: &str = "plan_curriculum";
pub const EXPLAIN_CONCEPT: &str = "explain_concept";
pub const EVALUATE_CONTENT: &str = "evaluate_content";
pub const GENERATE_ASSESSMENT: &str = "generate_assessment";
pub const ANALYZE_FEEDBACK: &str = "analyze_feedback";

/// Every template key the LLM gateway needs.
pub const REQUIRED_KEYS: [&str; 6] = [
    SUPERVISOR_DECIDE,
    PLAN_CURRICULUM,
    EXPLAIN_CONCEPT,
    EVALUATE_CONTENT,
    GENERATE_ASSESSMENT,
    ANALYZE_FEEDBACK,
];

/// Loads every `*.md` file in `dir`, keyed by file stem.
pub fn load_dir(dir: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read prompts directory '{}'", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(key, content);
        }
    }
    Ok(prompts)
}

/// Returns the first required key with no template, if any.
pub fn missing_key(prompts: &HashMap<String, String>) -> Option<&'static str> {
    REQUIRED_KEYS.into_iter().find(|k| !prompts.contains_key(*k))
}

/// Substitutes each `{name}` in `template` with its value.
///
/// Runs in one pass over the template, so a value that itself contains a
/// placeholder is inserted verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let out = render(
            "Teach {title} in {subject}. Remember {title}.",
            &[("title", "Limits"), ("subject", "Calculus")],
        );
        assert_eq!(out, "Teach Limits in Calculus. Remember Limits.");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{a} {b}", &[("a", "1")]), "1 {b}");
    }

    #[test]
    fn test_render_does_not_expand_substituted_values() {
        let out = render(
            "Modules: {modules}\nLast action: {last_action}",
            &[("modules", "Intro to {last_action}"), ("last_action", "Initialize Course")],
        );
        assert_eq!(out, "Modules: Intro to {last_action}\nLast action: Initialize Course");
    }

    #[test]
    fn test_render_keeps_literal_braces() {
        assert_eq!(
            render(r#"Reply as {"agent": "{name}"}"#, &[("name", "Supervisor")]),
            r#"Reply as {"agent": "Supervisor"}"#
        );
    }

    #[test]
    fn test_missing_key() {
        let mut prompts: HashMap<String, String> = REQUIRED_KEYS
            .iter()
            .map(|k| (k.to_string(), String::new()))
            .collect();
        assert_eq!(missing_key(&prompts), None);
        prompts.remove(EVALUATE_CONTENT);
        assert_eq!(missing_key(&prompts), Some(EVALUATE_CONTENT));
    }

    #[test]
    fn test_shipped_templates_cover_every_key() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../services/api/prompts");
        let prompts = load_dir(&dir).unwrap();
        assert_eq!(missing_key(&prompts), None);
    }
}

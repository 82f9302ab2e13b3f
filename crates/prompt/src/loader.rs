//! Prompt loader for YAML prompt overrides.

use crate::builtin;
use crate::types::PromptDefinition;
use filings_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID.
///
/// Looks for `<id>.yml` in the workspace's `.filings/prompts/` directory and
/// falls back to the built-in definition with the same id.
///
/// # Example
/// ```no_run
/// use filings_prompt::{load_prompt, ANSWER_PROMPT_ID};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), ANSWER_PROMPT_ID)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".filings/prompts")
        .join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        tracing::debug!("No prompt override at {:?}, using built-in", prompt_file);
        return builtin::builtin(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    let missing: Vec<&str> = builtin::required_variables(&def.id)
        .iter()
        .copied()
        .filter(|name| {
            !references_variable(&def.template, name) && !references_variable(&def.system, name)
        })
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' must reference {}",
            def.id,
            missing
                .iter()
                .map(|name| format!("{{{{{}}}}}", name))
                .collect::<Vec<_>>()
                .join(" and ")
        )));
    }

    Ok(())
}

/// Whether a handlebars template contains a plain `{{name}}` expression.
///
/// Whitespace, triple-stash and `~` whitespace control are accepted.
fn references_variable(template: &str, name: &str) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return false;
        };
        let expr = after[..end].trim_matches(|c: char| c == '{' || c == '~' || c.is_whitespace());
        if expr == name {
            return true;
        }
        rest = &after[end + 2..];
    }
    false
}

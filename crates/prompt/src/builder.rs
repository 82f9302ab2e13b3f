//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use filings_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the system and the user templates are rendered with the same
/// variables. Values are inserted verbatim: no HTML escaping.
///
/// # Example
/// ```no_run
/// use filings_prompt::{answer_prompt, build_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is revenue?".to_string());
/// vars.insert("context".to_string(), "Revenue was $10M.".to_string());
///
/// let built = build_prompt(&answer_prompt(), vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let system = render_template(&mut handlebars, "system", &definition.system, &variables)?;
    let user = render_template(&mut handlebars, "user", &definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        source_prompt_id: definition.id.clone(),
        resolved_variables: variables,
    })
}

/// Render a Handlebars template with variables.
fn render_template(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::answer_prompt;

    fn vars(question: &str, context: &str) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context.to_string());
        vars
    }

    #[test]
    fn test_answer_prompt_embeds_context_and_question() {
        let built = build_prompt(
            &answer_prompt(),
            vars("What is revenue?", "\n\n---\nRevenue was $10M."),
        )
        .unwrap();

        assert_eq!(
            built.user,
            "Context:\n\n\n---\nRevenue was $10M.\n\nQuestion:\nWhat is revenue?\n\n\
             Answer clearly and concisely. If the context does not contain the info, say so."
        );
        assert!(built.system.contains("Markdown"));
        assert_eq!(built.source_prompt_id, "filings.answer");
    }

    #[test]
    fn test_values_are_not_html_escaped() {
        let built = build_prompt(
            &answer_prompt(),
            vars("Is R&D > SG&A?", "<table>R&D</table>"),
        )
        .unwrap();

        assert!(built.user.contains("Is R&D > SG&A?"));
        assert!(built.user.contains("<table>R&D</table>"));
    }

    #[test]
    fn test_template_syntax_error() {
        let mut def = answer_prompt();
        def.template = "{{#if}}".to_string();
        assert!(build_prompt(&def, HashMap::new()).is_err());
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let mut def = answer_prompt();
        def.template = "Q: {{missing}}".to_string();
        let built = build_prompt(&def, HashMap::new()).unwrap();
        assert_eq!(built.user, "Q: ");
    }
}

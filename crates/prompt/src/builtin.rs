//! Built-in prompt definitions.

use crate::types::PromptDefinition;

/// Identifier of the answering prompt.
pub const ANSWER_PROMPT_ID: &str = "filings.answer";

const ANSWER_SYSTEM: &str = "You are an expert assistant answering questions based on SEC filings from an index. \
Always reply in clear Markdown format. Always reply in the same font structure.";

const ANSWER_TEMPLATE: &str = "Context:\n{{context}}\n\nQuestion:\n{{question}}\n\n\
Answer clearly and concisely. If the context does not contain the info, say so.";

/// The answering prompt used when the workspace does not override it.
///
/// Variables: `context` (the merged retrieval block) and `question`.
pub fn answer_prompt() -> PromptDefinition {
    PromptDefinition {
        id: ANSWER_PROMPT_ID.to_string(),
        title: "Answer a question from filing excerpts".to_string(),
        api_version: "1.0".to_string(),
        system: ANSWER_SYSTEM.to_string(),
        template: ANSWER_TEMPLATE.to_string(),
    }
}

/// Variables a prompt must reference, whether built in or overridden.
pub fn required_variables(prompt_id: &str) -> &'static [&'static str] {
    match prompt_id {
        ANSWER_PROMPT_ID => &["context", "question"],
        _ => &[],
    }
}

/// Look up a built-in prompt by id.
pub fn builtin(prompt_id: &str) -> Option<PromptDefinition> {
    match prompt_id {
        ANSWER_PROMPT_ID => Some(answer_prompt()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_prompt_requires_context_and_question() {
        assert_eq!(required_variables(ANSWER_PROMPT_ID), &["context", "question"]);
        assert!(required_variables("other").is_empty());
    }
}

//! Answer synthesis: one grounded model call per question.

use filings_core::{AppError, AppResult};
use filings_llm::{ChatMessage, LlmClient, LlmRequest};
use filings_prompt::{answer_prompt, build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a single model call.
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(120);

/// Builds the grounded prompt and asks the chat model for an answer.
///
/// The call is made once: no streaming, no retries. Transport errors,
/// timeouts and replies with no extractable text all surface as
/// [`AppError::Synthesis`].
#[derive(Clone)]
pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: answer_prompt(),
            timeout: DEFAULT_SYNTHESIS_TIMEOUT,
        }
    }

    /// Use a different prompt definition (e.g. a workspace override).
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the system and user messages for a question and its context.
    ///
    /// Both strings are embedded verbatim.
    pub fn build_request(&self, question: &str, context: &str) -> AppResult<LlmRequest> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("context".to_string(), context.to_string());

        let built = build_prompt(&self.prompt, variables)?;

        Ok(LlmRequest::new(
            vec![ChatMessage::system(built.system), ChatMessage::user(built.user)],
            self.model.clone(),
        ))
    }

    /// Answer `question` from `context`, returning Markdown text.
    pub async fn synthesize(&self, question: &str, context: &str) -> AppResult<String> {
        let request = self.build_request(question, context)?;

        tracing::debug!(
            "Calling {} model '{}' ({} context chars, timeout {}s)",
            self.client.provider_name(),
            self.model,
            context.len(),
            self.timeout.as_secs()
        );

        let response = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::Synthesis(format!(
                    "the model did not answer within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::Synthesis(e.to_string()))?;

        let answer = response.extract_text();
        if answer.is_empty() {
            return Err(AppError::Synthesis(
                "the model returned an empty answer".to_string(),
            ));
        }

        tracing::debug!(
            "Model '{}' answered ({} chars, {} tokens)",
            response.model,
            answer.len(),
            response.usage.total_tokens
        );

        Ok(answer)
    }
}

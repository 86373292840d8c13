use crate::llm::Provider;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    /// HTTP status when the provider answered with a non-success code.
    pub status: Option<u16>,
    pub raw_output: Option<String>,
}

impl LlmDiagnosticsError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

fn is_auth_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<LlmDiagnosticsError>())
        .any(LlmDiagnosticsError::is_auth_failure)
}

pub fn report_failure_message(err: &anyhow::Error) -> String {
    if is_auth_failure(err) {
        return "### Authentication Error\n\n\
Your LLM API key is invalid or has expired. Check ANTHROPIC_API_KEY and try again."
            .to_string();
    }
    format!(
        "### Error Generating Report\n\nAn error occurred: {err}\n\
Please check your API key, network connection, and model name."
    )
}

pub fn chat_failure_message(err: &anyhow::Error) -> String {
    if is_auth_failure(err) {
        return "Authentication Error: your LLM API key is invalid or has expired. \
Check ANTHROPIC_API_KEY and try again."
            .to_string();
    }
    "Sorry, I'm having trouble connecting to the AI. An unexpected error occurred. \
Please try again later."
        .to_string()
}

use crate::config::{env_or, Settings};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::prompts;
use crate::llm::{ChatInput, ChatMessage, ChatRole, LlmClient, Provider, ReportInput};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = env_or("ANTHROPIC_MAX_TOKENS", DEFAULT_MAX_TOKENS);
        let timeout_secs = env_or("ANTHROPIC_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("status={status}"),
                status: Some(status.as_u16()),
                raw_output: Some(text),
            }
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .with_context(|| format!("failed to decode Anthropic response JSON: {text}"))
    }

    /// Sends `messages`, retrying once with a larger ceiling when the reply was cut off.
    async fn complete(&self, system: String, messages: Vec<Message>) -> anyhow::Result<String> {
        let mut req = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(system),
            messages,
        };

        let mut res = self.create_message(&req).await?;
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(4096);
            tracing::warn!(
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            req.max_tokens = bumped;
            res = self.create_message(&req).await?;
        }

        let text = Self::response_text(&res);
        if text.trim().is_empty() {
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "empty_response",
                detail: format!("stop_reason={:?}", res.stop_reason),
                status: None,
                raw_output: None,
            }
            .into());
        }
        Ok(text)
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// Anthropic requires a user turn first and alternating roles. Empty turns are dropped
    /// and consecutive turns from the same role are merged.
    fn chat_messages(history: &[ChatMessage], prompt: &str) -> Vec<Message> {
        let mut out: Vec<Message> = Vec::with_capacity(history.len() + 1);
        let turns = history
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .chain(std::iter::once((ChatRole::User, prompt)));

        for (role, content) in turns {
            let content = content.trim();
            if content.is_empty() || (out.is_empty() && role != ChatRole::User) {
                continue;
            }
            match out.last_mut() {
                Some(last) if last.role == role.as_str() => {
                    last.content.push_str("\n\n");
                    last.content.push_str(content);
                }
                _ => out.push(Message {
                    role: role.as_str(),
                    content: content.to_string(),
                }),
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate_report(&self, input: &ReportInput) -> anyhow::Result<String> {
        let user_prompt = prompts::report_user_prompt(input);
        let first = prompts::strip_code_fence(
            &self
                .complete(
                    prompts::report_system_prompt(),
                    vec![Message {
                        role: "user",
                        content: user_prompt.clone(),
                    }],
                )
                .await?,
        );

        let missing = prompts::missing_sections(&first);
        if missing.is_empty() {
            return Ok(first);
        }

        tracing::warn!(
            symbol = %input.fundamentals.symbol,
            missing = ?missing,
            "report is missing sections; requesting one repair"
        );
        let repaired = prompts::strip_code_fence(
            &self
                .complete(
                    prompts::report_system_prompt(),
                    vec![
                        Message {
                            role: "user",
                            content: user_prompt,
                        },
                        Message {
                            role: "assistant",
                            content: first.clone(),
                        },
                        Message {
                            role: "user",
                            content: prompts::repair_prompt(&missing),
                        },
                    ],
                )
                .await?,
        );

        let still_missing = prompts::missing_sections(&repaired);
        if still_missing.is_empty() {
            return Ok(repaired);
        }
        tracing::warn!(
            symbol = %input.fundamentals.symbol,
            missing = ?still_missing,
            "report still incomplete after repair; returning best attempt"
        );
        if still_missing.len() <= missing.len() {
            Ok(repaired)
        } else {
            Ok(first)
        }
    }

    async fn chat(&self, input: &ChatInput) -> anyhow::Result<String> {
        let messages = Self::chat_messages(&input.history, &input.prompt);
        anyhow::ensure!(!messages.is_empty(), "chat prompt is empty");
        self.complete(prompts::chat_system_prompt(&input.ticker), messages)
            .await
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn concatenates_text_blocks_and_skips_others() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "sig"},
                {"type": "text", "text": "### Executive Summary"},
                {"type": "text", "text": "Solid quarter."}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();

        assert_eq!(
            AnthropicClient::response_text(&res),
            "### Executive Summary\nSolid quarter."
        );
        assert_eq!(res.stop_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn chat_history_is_normalized_for_the_api() {
        let history = vec![
            ChatMessage::assistant("Hi! Ask me about AAPL."),
            ChatMessage::user("What is the trend?"),
            ChatMessage::user("  "),
            ChatMessage::assistant("The 50-day is above the 200-day."),
            ChatMessage::user("And the news?"),
        ];
        let msgs = AnthropicClient::chat_messages(&history, "Should I worry?");

        let roles: Vec<_> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(msgs[0].content, "What is the trend?");
        assert_eq!(msgs[2].content, "And the news?\n\nShould I worry?");
    }

    #[test]
    fn request_serializes_without_empty_system() {
        let req = CreateMessageRequest {
            model: "m".to_string(),
            max_tokens: 16,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi".to_string(),
            }],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("system").is_none());
        assert_eq!(v["messages"][0]["role"], "user");
    }
}

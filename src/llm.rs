use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::retry::{RetryError, is_retryable_status};

pub const TEMPERATURE: f64 = 0.7;

const FACT_CHECK_INSTRUCTION: &str = "You are a fact-checking and media-bias analysis assistant. \
Analyze the provided text, identify any political, emotional or framing biases, and fact-check \
each claim it makes. Explain your reasoning, cite sources where you can, and finish with a short \
overall assessment.";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// System instruction, optionally grounded with a search snippet.
pub fn system_prompt(latest_info: Option<&str>) -> String {
    match latest_info {
        None => FACT_CHECK_INSTRUCTION.to_string(),
        Some(info) => format!(
            "You are an advanced fact-checking assistant. Before answering, compare the text \
against the latest verified data. Use the following search result as your reference: \"{}\". \
Then analyze the provided text, identify any biases, and fact-check all claims against that \
information. Include references to your sources if applicable. If the reference contradicts a \
claim in the text, state the discrepancy explicitly.",
            info
        ),
    }
}

pub fn build_messages(text: &str, latest_info: Option<&str>) -> Vec<Message> {
    vec![Message::system(system_prompt(latest_info)), Message::user(text)]
}

/// Outcome of a single upstream attempt that did not produce a reply.
#[derive(Debug)]
enum AttemptError {
    /// Worth another attempt: throttling, 5xx gateways, timeouts, connection failures.
    Transient(String),
    Fatal(AppError),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transient(msg) => f.write_str(msg),
            AttemptError::Fatal(err) => write!(f, "{}", err),
        }
    }
}

/// Sends the messages to the configured chat-completion endpoint, retrying
/// transient failures per the configured policy, and returns the trimmed reply.
pub async fn call_openrouter(client: &Client, config: &Config, messages: &[Message]) -> Result<String> {
    tracing::info!(
        url = %config.openrouter_api_url,
        model = %config.model,
        "sending request to OpenRouter API"
    );

    let outcome = config
        .retry
        .execute(
            |attempt| send_chat_request(client, config, messages, attempt),
            |err| matches!(err, AttemptError::Transient(_)),
        )
        .await;

    match outcome {
        Ok(reply) => Ok(reply),
        Err(RetryError::Aborted(AttemptError::Fatal(err))) => Err(err),
        Err(RetryError::Aborted(AttemptError::Transient(msg))) => Err(AppError::InternalError(msg)),
        Err(RetryError::Exhausted { attempts, last }) => {
            tracing::error!(attempts, error = %last, "OpenRouter API unavailable");
            Err(AppError::UpstreamUnavailable(format!(
                "OpenRouter API unavailable after {} attempts: {}",
                attempts, last
            )))
        }
    }
}

async fn send_chat_request(
    client: &Client,
    config: &Config,
    messages: &[Message],
    attempt: u32,
) -> std::result::Result<String, AttemptError> {
    let body = ChatRequest {
        model: &config.model,
        messages,
        temperature: TEMPERATURE,
    };

    let mut request = client
        .post(&config.openrouter_api_url)
        .bearer_auth(&config.openrouter_api_key)
        .timeout(config.llm_timeout)
        .json(&body);

    // Add optional headers if provided
    if let Some(url) = &config.site_url {
        request = request.header("HTTP-Referer", url);
    }

    if let Some(name) = &config.site_title {
        request = request.header("X-Title", name);
    }

    let res = request.send().await.map_err(|e| {
        if e.is_timeout() {
            AttemptError::Transient("Request to OpenRouter API timed out.".to_string())
        } else {
            AttemptError::Transient(format!("Client error when calling OpenRouter API: {}", e))
        }
    })?;

    let status = res.status().as_u16();
    let text = res
        .text()
        .await
        .map_err(|e| AttemptError::Transient(format!("Failed to read OpenRouter response: {}", e)))?;

    if status != 200 {
        tracing::warn!(attempt, status, body = %text, "OpenRouter API returned an error");
        if is_retryable_status(status) {
            return Err(AttemptError::Transient(format!(
                "OpenRouter API returned status {}: {}",
                status, text
            )));
        }
        return Err(AttemptError::Fatal(AppError::UpstreamError { status, body: text }));
    }

    extract_reply(&text).map_err(AttemptError::Fatal)
}

/// Pulls `choices[0].message.content` out of a chat-completion body.
pub fn extract_reply(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AppError::UpstreamFormatError(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| AppError::UpstreamFormatError("missing choices[0].message.content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_carry_text_verbatim_as_user_turn() {
        let messages = build_messages("  hello  ", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, FACT_CHECK_INSTRUCTION);
        assert_eq!(messages[1], Message::user("  hello  "));
    }

    #[test]
    fn grounded_prompt_embeds_snippet() {
        let prompt = system_prompt(Some("The sky is blue."));
        assert!(prompt.contains("\"The sky is blue.\""));
        assert_ne!(prompt, FACT_CHECK_INSTRUCTION);
    }

    #[test]
    fn request_body_matches_chat_completion_shape() {
        let messages = build_messages("hello", None);
        let body = serde_json::to_value(ChatRequest {
            model: "some/model",
            messages: &messages,
            temperature: TEMPERATURE,
        })
        .unwrap();

        assert_eq!(body["model"], "some/model");
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "hello"}));
        assert_eq!(body["temperature"], 0.7);
    }

    #[test]
    fn reply_is_extracted_and_trimmed() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "  Para one.\n\n"}}]});
        assert_eq!(extract_reply(&body.to_string()).unwrap(), "Para one.");
    }

    #[test]
    fn malformed_replies_are_format_errors() {
        for body in [
            "not json".to_string(),
            json!({}).to_string(),
            json!({"choices": []}).to_string(),
            json!({"choices": [{"message": {"content": null}}]}).to_string(),
        ] {
            assert!(matches!(
                extract_reply(&body),
                Err(AppError::UpstreamFormatError(_))
            ));
        }
    }
}

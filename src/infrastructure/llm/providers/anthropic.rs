//! Anthropic (Claude) provider
//!
//! Speaks the Messages API with tool definitions, base64 image parts and
//! `tool_use` response blocks.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ProviderConfig;
use crate::infrastructure::llm::{
    ContentPart, Context, Error, Message, Response, ResponseBlock, TokenUsage, ToolSchema,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .user_agent(concat!("projectd/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

/// Anthropic message format
#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

/// Anthropic request content block
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicResponseContent>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

/// Anthropic response content
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Anthropic usage information
#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn convert_message(msg: &Message) -> AnthropicMessage {
    let content = msg
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => AnthropicContentBlock::Text { text: text.clone() },
            ContentPart::Image { media_type, data } => AnthropicContentBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: media_type.clone(),
                    data: data.clone(),
                },
            },
        })
        .collect();

    AnthropicMessage {
        role: msg.role.as_str().to_string(),
        content,
    }
}

fn convert_tool(tool: &ToolSchema) -> AnthropicTool {
    AnthropicTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.input_schema.clone(),
    }
}

fn build_request(config: &ProviderConfig, context: Context) -> AnthropicRequest {
    AnthropicRequest {
        model: context
            .model
            .unwrap_or_else(|| config.default_model.clone()),
        max_tokens: context.max_tokens.unwrap_or(4096),
        messages: context.messages.iter().map(convert_message).collect(),
        system: context.system,
        tools: context.tools.iter().map(convert_tool).collect(),
    }
}

/// Turns a non-2xx body into a readable message.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(error_json) = serde_json::from_str::<Value>(body) {
        if let Some(error) = error_json.get("error") {
            if let (Some(error_type), Some(error_msg)) = (
                error.get("type").and_then(Value::as_str),
                error.get("message").and_then(Value::as_str),
            ) {
                return format!("{}: {}", error_type, error_msg);
            }
        }
    }
    format!("HTTP {}: {}", status, body)
}

fn convert_response(response: AnthropicResponse) -> Response {
    let blocks = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicResponseContent::Text { text } => Some(ResponseBlock::Text(text)),
            AnthropicResponseContent::ToolUse { id, name, input } => {
                Some(ResponseBlock::ToolUse { id, name, input })
            }
            AnthropicResponseContent::Other => None,
        })
        .collect();

    Response {
        blocks,
        model: response.model,
        usage: TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
        stop_reason: response.stop_reason,
    }
}

/// Execute a chat request using Anthropic's API
pub async fn chat(config: ProviderConfig, context: Context) -> Result<Response, Error> {
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));
    let request = build_request(&config, context);

    let mut request_builder = http_client()
        .post(&url)
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", API_VERSION)
        .header("Content-Type", "application/json")
        .json(&request);

    if let Some(timeout_secs) = config.timeout {
        request_builder = request_builder.timeout(std::time::Duration::from_secs(timeout_secs));
    }

    let response = request_builder
        .send()
        .await
        .map_err(|e| Error::new("anthropic", format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(Error::new("anthropic", error_message(status, &error_text)));
    }

    let anthropic_response: AnthropicResponse = response
        .json()
        .await
        .map_err(|e| Error::new("anthropic", format!("Failed to parse response: {}", e)))?;

    tracing::debug!(
        model = %anthropic_response.model,
        input_tokens = anthropic_response.usage.input_tokens,
        output_tokens = anthropic_response.usage.output_tokens,
        "Anthropic response received"
    );

    Ok(convert_response(anthropic_response))
}

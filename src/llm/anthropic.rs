//! Anthropic Claude provider implementation

use super::types::{ContentBlock, LlmRequest, LlmResponse, Role, StopReason, Turn, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Default model for session play: fast and cheap, tools do the heavy lifting
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model: model.into(),
            base_url: "https://api.anthropic.com/v1/messages".to_string(),
        }
    }

    fn translate_request(&self, request: &LlmRequest) -> AnthropicRequest {
        let system: Vec<AnthropicSystemBlock> = request
            .system
            .iter()
            .map(|s| AnthropicSystemBlock {
                r#type: "text".to_string(),
                text: s.text.clone(),
                cache_control: s.cache.then(CacheControl::ephemeral),
            })
            .collect();

        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .map(translate_turn)
            .collect();

        let tools: Vec<AnthropicTool> = request
            .tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            tool_choice: (!tools.is_empty()).then(ToolChoice::auto),
            tools: if tools.is_empty() { None } else { Some(tools) },
        }
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::auth(format!("Authentication failed: {body}")),
            429 => LlmError::rate_limit(format!("Rate limited: {body}")),
            400 => LlmError::invalid_request(format!("Invalid request: {body}")),
            500..=599 => LlmError::server_error(format!("Server error: {body}")),
            _ => LlmError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl LlmService for AnthropicClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        let anthropic_response: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Ok(normalize_response(anthropic_response))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn translate_turn(turn: &Turn) -> AnthropicMessage {
    // Tool-result turns travel as user messages on the Anthropic wire.
    let role = match turn.role {
        Role::User | Role::ToolResult => "user",
        Role::Assistant => "assistant",
    };

    let content: Vec<AnthropicContentBlock> = turn
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => AnthropicContentBlock::Text {
                text: text.clone(),
                // User prompts are reused verbatim on every round trip, so
                // mark them cacheable.
                cache_control: matches!(turn.role, Role::User).then(CacheControl::ephemeral),
            },
            ContentBlock::ToolUse { id, name, input } => AnthropicContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => AnthropicContentBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
            },
            ContentBlock::Unknown { block_type } => AnthropicContentBlock::Text {
                text: format!("[{block_type}]"),
                cache_control: None,
            },
        })
        .collect();

    AnthropicMessage {
        role: role.to_string(),
        content,
    }
}

fn normalize_response(resp: AnthropicResponse) -> LlmResponse {
    let content: Vec<ContentBlock> = resp.content.into_iter().map(normalize_block).collect();

    let stop_reason = match resp.stop_reason.as_deref() {
        Some("end_turn") => StopReason::EndTurn,
        Some("tool_use") => StopReason::ToolUse,
        _ => StopReason::Other,
    };

    LlmResponse {
        content,
        stop_reason,
        usage: Usage {
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
            cache_creation_tokens: resp.usage.cache_creation_input_tokens.unwrap_or(0),
            cache_read_tokens: resp.usage.cache_read_input_tokens.unwrap_or(0),
        },
    }
}

/// Convert one wire content block, preserving unrecognized block types as
/// `ContentBlock::Unknown` instead of failing the whole response.
fn normalize_block(value: Value) -> ContentBlock {
    let block_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    match block_type.as_str() {
        "text" => match value.get("text").and_then(Value::as_str) {
            Some(text) => ContentBlock::text(text),
            None => ContentBlock::Unknown { block_type },
        },
        "tool_use" => {
            let id = value.get("id").and_then(Value::as_str);
            let name = value.get("name").and_then(Value::as_str);
            match (id, name) {
                (Some(id), Some(name)) => ContentBlock::tool_use(
                    id,
                    name,
                    value.get("input").cloned().unwrap_or(Value::Null),
                ),
                _ => ContentBlock::Unknown { block_type },
            }
        }
        _ => ContentBlock::Unknown { block_type },
    }
}

/// Build the system segments and tool declarations into wire form without
/// sending; used by tests to check the exact request shape.
#[cfg(test)]
fn wire_request(client: &AnthropicClient, request: &LlmRequest) -> Value {
    serde_json::to_value(client.translate_request(request)).expect("request serializes")
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: Vec<AnthropicSystemBlock>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize)]
struct AnthropicSystemBlock {
    r#type: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct CacheControl {
    r#type: String,
}

impl CacheControl {
    fn ephemeral() -> Self {
        Self {
            r#type: "ephemeral".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    r#type: String,
}

impl ToolChoice {
    fn auto() -> Self {
        Self {
            r#type: "auto".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, serde::Deserialize)]
struct AnthropicResponse {
    content: Vec<Value>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, serde::Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{SystemContent, ToolDefinition};
    use serde_json::json;

    fn test_client() -> AnthropicClient {
        AnthropicClient::new("test-key".to_string(), DEFAULT_MODEL)
    }

    #[test]
    fn tool_result_turns_travel_as_user_role() {
        let request = LlmRequest {
            system: vec![],
            tools: vec![],
            messages: vec![
                Turn::user("roll for me"),
                Turn::assistant(vec![ContentBlock::tool_use("t1", "roll_dice", json!({}))]),
                Turn::tool_results(vec![ContentBlock::tool_result("t1", "{\"rolls\":[7]}")]),
            ],
            max_tokens: None,
        };

        let wire = wire_request(&test_client(), &request);
        let messages = wire["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["tool_use_id"], "t1");
    }

    #[test]
    fn cached_system_segment_gets_cache_control() {
        let request = LlmRequest {
            system: vec![
                SystemContent::new("base instructions"),
                SystemContent::cached("character sheet"),
            ],
            tools: vec![],
            messages: vec![Turn::user("hi")],
            max_tokens: None,
        };

        let wire = wire_request(&test_client(), &request);
        let system = wire["system"].as_array().unwrap();
        assert!(system[0].get("cache_control").is_none());
        assert_eq!(system[1]["cache_control"]["type"], "ephemeral");
        // User prompt block is cacheable too
        assert_eq!(
            wire["messages"][0]["content"][0]["cache_control"]["type"],
            "ephemeral"
        );
        // Default token cap applies when the caller does not set one
        assert_eq!(wire["max_tokens"], 1024);
        // No tools means no tool_choice either
        assert!(wire.get("tool_choice").is_none());
    }

    #[test]
    fn tool_declarations_enable_auto_tool_choice() {
        let request = LlmRequest {
            system: vec![],
            tools: vec![ToolDefinition {
                name: "roll_dice".to_string(),
                description: "Roll dice.".to_string(),
                input_schema: json!({"type": "object"}),
            }],
            messages: vec![Turn::user("hi")],
            max_tokens: Some(64),
        };

        let wire = wire_request(&test_client(), &request);
        assert_eq!(wire["tool_choice"]["type"], "auto");
        assert_eq!(wire["tools"][0]["name"], "roll_dice");
        assert_eq!(wire["max_tokens"], 64);
    }

    #[test]
    fn stop_reasons_normalize_to_closed_variants() {
        for (wire, expected) in [
            (Some("end_turn"), StopReason::EndTurn),
            (Some("tool_use"), StopReason::ToolUse),
            (Some("max_tokens"), StopReason::Other),
            (None, StopReason::Other),
        ] {
            let resp = AnthropicResponse {
                content: vec![],
                stop_reason: wire.map(str::to_string),
                usage: AnthropicUsage {
                    input_tokens: 0,
                    output_tokens: 0,
                    cache_creation_input_tokens: None,
                    cache_read_input_tokens: None,
                },
            };
            assert_eq!(normalize_response(resp).stop_reason, expected);
        }
    }

    #[test]
    fn unrecognized_block_types_become_unknown() {
        let block = normalize_block(json!({"type": "server_tool_use", "id": "x"}));
        match block {
            ContentBlock::Unknown { block_type } => assert_eq!(block_type, "server_tool_use"),
            other => panic!("Expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn error_classification_by_status() {
        use crate::llm::LlmErrorKind;

        let cases = [
            (401, LlmErrorKind::Auth),
            (403, LlmErrorKind::Auth),
            (429, LlmErrorKind::RateLimit),
            (400, LlmErrorKind::InvalidRequest),
            (500, LlmErrorKind::ServerError),
            (529, LlmErrorKind::ServerError),
            (302, LlmErrorKind::Unknown),
        ];
        for (status, kind) in cases {
            let status = reqwest::StatusCode::from_u16(status).unwrap();
            assert_eq!(AnthropicClient::classify_error(status, "boom").kind, kind);
        }
    }
}

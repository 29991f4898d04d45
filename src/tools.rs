//! Tools the model can call during a session
//!
//! Tool calls arrive from the provider as a name plus JSON input. The name
//! and input are parsed into the closed `ToolInvocation` enum up front, so
//! dispatch is an exhaustive match and adding a tool is a compile-checked
//! change rather than a string lookup.

pub mod character_sheet;
pub mod roll_dice;

pub use character_sheet::SheetLookupInput;
pub use roll_dice::DiceRollInput;

use crate::llm::ToolDefinition;
use crate::sheets::SheetStore;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Side channel for messages a tool emits while it runs, delivered to the
/// user alongside the assistant's text rather than only inside the tool
/// result the model consumes.
pub type SideChannel = mpsc::UnboundedSender<String>;

/// Tool failure: malformed input or a tool-internal error
///
/// Caught per invocation by the conversation loop and rendered as a chat
/// message; the rest of the turn keeps executing.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input for {tool}: {message}")]
    InvalidInput { tool: &'static str, message: String },

    #[error("{0}")]
    Failed(String),
}

/// A fully parsed tool call, one variant per registered tool
#[derive(Debug)]
pub enum ToolInvocation {
    RollDice(DiceRollInput),
    GetCharacterSheet(SheetLookupInput),
}

impl ToolInvocation {
    /// Parse a provider tool call. Returns `None` for names no tool claims;
    /// malformed input for a known tool is a `ToolError`.
    pub fn parse(name: &str, input: &Value) -> Result<Option<Self>, ToolError> {
        match name {
            roll_dice::NAME => Ok(Some(Self::RollDice(parse_input(roll_dice::NAME, input)?))),
            character_sheet::NAME => Ok(Some(Self::GetCharacterSheet(parse_input(
                character_sheet::NAME,
                input,
            )?))),
            _ => Ok(None),
        }
    }
}

/// Parse tool input that may arrive pre-structured or as a JSON string
fn parse_input<T: DeserializeOwned>(tool: &'static str, input: &Value) -> Result<T, ToolError> {
    let parsed = match input {
        Value::String(raw) => serde_json::from_str(raw),
        value => serde_json::from_value(value.clone()),
    };
    parsed.map_err(|e| ToolError::InvalidInput {
        tool,
        message: e.to_string(),
    })
}

/// The tools available to a conversation
pub struct ToolRegistry {
    sheets: Arc<dyn SheetStore>,
}

impl ToolRegistry {
    pub fn new(sheets: Arc<dyn SheetStore>) -> Self {
        Self { sheets }
    }

    /// Tool declarations sent to the provider with every request
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: character_sheet::NAME.to_string(),
                description: "Get a character sheet.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["character_name"],
                    "properties": {
                        "character_name": {
                            "type": "string",
                            "description": "Name of the character to get the character sheet for.",
                            "enum": self.sheets.names(),
                        }
                    }
                }),
            },
            ToolDefinition {
                name: roll_dice::NAME.to_string(),
                description: "Rolls dice. Allows the caller to specify the number of sides \
                              and the number of times to roll."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["sides"],
                    "properties": {
                        "sides": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "The number of sides on the die.",
                        },
                        "times": {
                            "type": "integer",
                            "minimum": 1,
                            "default": 1,
                            "description": "Optional. Number of times to roll the die.",
                        }
                    }
                }),
            },
        ]
    }

    /// Execute a tool call.
    ///
    /// Unknown names are not an error: the descriptive string doubles as the
    /// tool result and is emitted once on the side channel, so the loop
    /// handles it like any other tool output.
    pub async fn dispatch(
        &self,
        name: &str,
        input: &Value,
        emit: &SideChannel,
    ) -> Result<String, ToolError> {
        let Some(invocation) = ToolInvocation::parse(name, input)? else {
            let message = format!("Unknown tool: {name}");
            let _ = emit.send(message.clone());
            return Ok(message);
        };

        match invocation {
            ToolInvocation::RollDice(input) => roll_dice::run(&input, emit),
            ToolInvocation::GetCharacterSheet(input) => {
                character_sheet::run(&input, self.sheets.as_ref())
            }
        }
    }
}

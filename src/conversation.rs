//! Tool-augmented conversation loop
//!
//! Drives repeated LLM exchanges for one user prompt: assistant turns are
//! appended to history, tool uses are dispatched and their results folded
//! back in as a tool-result turn, and the exchange ends once the model
//! stops asking for tools. Replies are batched per round trip so tool
//! side-channel output (like a dice-roll breakdown) lands in the same chat
//! message as the assistant text it belongs with, in the order produced.
//!
//! History lives only for the duration of one `handle_prompt` call; nothing
//! is shared across invocations, so any number of conversations can run
//! concurrently.

use crate::llm::{
    ContentBlock, LlmRequest, LlmService, StopReason, SystemContent, ToolDefinition, Turn,
};
use crate::prompt;
use crate::sheets::SheetStore;
use crate::tools::{roll_dice, ToolRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Hard bound on LLM round trips per prompt, in case the model never stops
/// requesting tools
pub const MAX_ROUND_TRIPS: usize = 16;

/// Where assembled chat messages go; each send is one complete message
pub type OutputSink = mpsc::Sender<String>;

/// One participant's conversation entry point
pub struct Conversation {
    llm: Arc<dyn LlmService>,
    tools: ToolRegistry,
    sheets: Arc<dyn SheetStore>,
}

/// Loop phases for a single prompt
enum LoopState {
    /// Waiting on the next assistant turn from the gateway
    AwaitingAssistant,
    /// Assistant turn processed; fold tool results in and decide what's next
    DispatchingTools {
        stop: StopReason,
        results: Vec<ContentBlock>,
    },
    Done,
}

impl Conversation {
    pub fn new(llm: Arc<dyn LlmService>, sheets: Arc<dyn SheetStore>) -> Self {
        let tools = ToolRegistry::new(Arc::clone(&sheets));
        Self { llm, tools, sheets }
    }

    /// Handle one user prompt, sending zero or more chat messages to `sink`.
    ///
    /// Every failure path degrades to a visible `Error: …` message; this
    /// never panics or returns an error to the adapter.
    pub async fn handle_prompt(&self, character_name: &str, user_prompt: &str, sink: &OutputSink) {
        // Debug shortcut: dump the die-face emoji catalog without involving
        // the model at all.
        if user_prompt == "emojis" {
            let _ = sink.send(roll_dice::emoji_catalog()).await;
            return;
        }

        let system = prompt::build_system_prompt(character_name, self.sheets.as_ref());
        let tools = self.tools.definitions();
        self.run_loop(&system, &tools, user_prompt, sink).await;
    }

    async fn run_loop(
        &self,
        system: &[SystemContent],
        tools: &[ToolDefinition],
        user_prompt: &str,
        sink: &OutputSink,
    ) {
        let mut history = vec![Turn::user(user_prompt)];
        let (emit, mut emitted) = mpsc::unbounded_channel();
        // Text and tool side-channel output accumulated since the last
        // flush; joined into one chat message per round trip.
        let mut replies: Vec<String> = Vec::new();
        let mut round_trips = 0usize;
        let mut state = LoopState::AwaitingAssistant;

        loop {
            state = match state {
                LoopState::AwaitingAssistant => {
                    round_trips += 1;
                    if round_trips > MAX_ROUND_TRIPS {
                        tracing::warn!(round_trips, "Conversation hit round-trip bound");
                        replies.push(format!(
                            "Error: conversation exceeded {MAX_ROUND_TRIPS} round trips"
                        ));
                        LoopState::Done
                    } else {
                        let request = LlmRequest {
                            system: system.to_vec(),
                            tools: tools.to_vec(),
                            messages: history.clone(),
                            max_tokens: None,
                        };
                        match self.llm.complete(&request).await {
                            Ok(response) => {
                                history.push(Turn::assistant(response.content.clone()));
                                let results = self
                                    .process_blocks(response.content, &emit, &mut emitted, &mut replies)
                                    .await;
                                LoopState::DispatchingTools {
                                    stop: response.stop_reason,
                                    results,
                                }
                            }
                            Err(e) => {
                                replies.push(format!("Error: {e}"));
                                LoopState::Done
                            }
                        }
                    }
                }
                LoopState::DispatchingTools { stop, results } => {
                    if !results.is_empty() {
                        history.push(Turn::tool_results(results));
                    }
                    if stop == StopReason::ToolUse {
                        flush(&mut replies, sink).await;
                        LoopState::AwaitingAssistant
                    } else {
                        LoopState::Done
                    }
                }
                LoopState::Done => {
                    flush(&mut replies, sink).await;
                    return;
                }
            };
        }
    }

    /// Process one assistant turn's content blocks in order, dispatching
    /// tool uses and collecting their result blocks. A failing tool becomes
    /// an `Error: …` reply and is dropped from the result set; the other
    /// blocks in the turn still execute.
    async fn process_blocks(
        &self,
        content: Vec<ContentBlock>,
        emit: &mpsc::UnboundedSender<String>,
        emitted: &mut mpsc::UnboundedReceiver<String>,
        replies: &mut Vec<String>,
    ) -> Vec<ContentBlock> {
        let mut results = Vec::new();

        for block in content {
            match block {
                ContentBlock::Text { text } => replies.push(text),
                ContentBlock::ToolUse { id, name, input } => {
                    tracing::info!(tool = %name, "Dispatching tool");
                    let outcome = self.tools.dispatch(&name, &input, emit).await;
                    // Emitted fragments come before the result is folded
                    // into history, preserving the order the tool produced.
                    while let Ok(fragment) = emitted.try_recv() {
                        replies.push(fragment);
                    }
                    match outcome {
                        Ok(result) => results.push(ContentBlock::tool_result(id, result)),
                        Err(e) => replies.push(format!("Error: {e}")),
                    }
                }
                ContentBlock::ToolResult { .. } => {
                    replies.push("Unknown content type: tool_result".to_string());
                }
                ContentBlock::Unknown { block_type } => {
                    replies.push(format!("Unknown content type: {block_type}"));
                }
            }
        }

        results
    }
}

/// Send the pending replies as one joined chat message, if there are any
async fn flush(replies: &mut Vec<String>, sink: &OutputSink) {
    if replies.is_empty() {
        return;
    }
    let message = replies.join("\n");
    replies.clear();
    let _ = sink.send(message).await;
}

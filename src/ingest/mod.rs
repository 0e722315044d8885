pub mod claude;

use serde::Deserialize;
use serde_json::Value;

/// One event in an agent session, in log order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session start marker with the assigned session ID.
    Init { session_id: Option<String> },
    /// One assistant turn: text and tool calls, in block order.
    Assistant { content: Vec<ContentBlock> },
    /// User-side delivery, usually tool results coming back.
    User { content: Vec<ContentBlock> },
    /// Terminal summary with turn, cost, and usage totals.
    Result(SessionResult),
}

/// A single content block inside an assistant or user message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
        #[serde(default)]
        content: Option<Value>,
    },
    /// Any block type this tool does not render.
    #[serde(other)]
    Unknown,
}

/// Terminal result record of a session. Absent fields stay absent;
/// rendering decides what to show.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionResult {
    #[serde(default)]
    pub num_turns: Option<u64>,
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// Token counts reported for the session.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Combined input and output token count.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

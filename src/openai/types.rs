use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};

use crate::tools::{ToolDefinition, ToolResolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    /// Parsed arguments. Arguments that were not valid JSON arrive as a
    /// string value; the tool then reports them as invalid.
    pub input: Value,
}

/// Result of one tool invocation, keyed to the call that asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse(ToolUseBlock),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    ToolResults(Vec<ToolResultBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: MessageContent::Text(text.into()) }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: MessageContent::Text(text.into()) }
    }

    /// Assistant turn that requested tools (text and tool_use blocks as received).
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self { role: Role::Assistant, content: MessageContent::Blocks(blocks) }
    }

    /// All results of one tool round, sent back as a single user turn.
    pub fn tool_results(results: Vec<ToolResultBlock>) -> Self {
        Self { role: Role::User, content: MessageContent::ToolResults(results) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
}

/// One request to the inference endpoint. `tools == None` means no tools are
/// offered in this round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    pub fn offers_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { stop_reason: StopReason::EndTurn, content: vec![ContentBlock::Text { text: text.into() }] }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            stop_reason: StopReason::ToolUse,
            content: vec![ContentBlock::ToolUse(ToolUseBlock { id: id.into(), name: name.into(), input })],
        }
    }

    /// First text block, or an empty string.
    pub fn first_text(&self) -> String {
        self.content
            .iter()
            .find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.clone()),
                ContentBlock::ToolUse(_) => None,
            })
            .unwrap_or_default()
    }

    pub fn tool_uses(&self) -> Vec<&ToolUseBlock> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse(t) => Some(t),
                ContentBlock::Text { .. } => None,
            })
            .collect()
    }

    /// The model stopped to call tools and named at least one.
    pub fn wants_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse && !self.tool_uses().is_empty()
    }
}

/// How a generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model answered on its own.
    Answered,
    /// The answer lacked citations after tool use and was regenerated once.
    CitationRevision,
    /// The tool-round bound was hit and a final answer was forced.
    RoundLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub endpoint_calls: usize,
    pub tool_rounds: usize,
    pub termination: Termination,
}

/// Progress notifications emitted by the generation loop.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    RoundStart { call: usize, tools_offered: bool },
    ToolRequested { round: usize, name: String, id: String },
    ToolResolved { round: usize, resolution: ToolResolution },
    MissingCitations { len: usize },
    RoundLimitReached { max_rounds: usize },
    Finished { termination: Termination, endpoint_calls: usize },
}

impl Display for GenerationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationEvent::RoundStart { call, tools_offered } => write!(f, "RoundStart #{} tools_offered={}", call, tools_offered),
            GenerationEvent::ToolRequested { round, name, id } => write!(f, "ToolRequested @{} name={} id={}", round, name, id),
            GenerationEvent::ToolResolved { round, resolution } => write!(f, "ToolResolved @{} => {}", round, resolution),
            GenerationEvent::MissingCitations { len } => write!(f, "MissingCitations text_len={}", len),
            GenerationEvent::RoundLimitReached { max_rounds } => write!(f, "RoundLimitReached after {} rounds", max_rounds),
            GenerationEvent::Finished { termination, endpoint_calls } => write!(f, "Finished {:?} calls={}", termination, endpoint_calls),
        }
    }
}

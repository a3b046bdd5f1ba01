//! Inference endpoint integration and the tool-mediated generation loop.

pub mod client;
pub mod generator;
pub mod history;
mod request;
pub mod types;
pub mod worker;

pub use client::{InferenceClient, OpenAiClient};
pub use generator::{
    build_system_content, has_citation, AiGenerator, CITATION_REMINDER, FINAL_ANSWER_INSTRUCTION, SYSTEM_PROMPT,
};
pub use history::ConversationHistory;
pub use types::{
    CompletionRequest, CompletionResponse, ContentBlock, Generation, GenerationEvent, Message, MessageContent, Role,
    StopReason, Termination, ToolChoice, ToolResultBlock, ToolUseBlock,
};
pub use worker::{start_rag_worker, WorkerReply};

//! Tool-mediated answer generation.
//!
//! One [`AiGenerator::generate`] call drives one logical query:
//!
//! ```text
//! DECIDING --text--> DONE (or one citation revision when tools were used)
//!    |  ^
//!  tool_use |
//!    v  |
//! TOOL_USE --round bound reached--> FORCED (final call, no tools offered)
//! ```
//!
//! Endpoint round-trips are strictly sequential. Tool failures come back as
//! tool-result text; only endpoint errors abort the loop.

use std::sync::Arc;

use color_eyre::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::tools::{ToolDefinition, ToolRegistry};

use super::client::InferenceClient;
use super::history::ConversationHistory;
use super::types::{
    CompletionRequest, Generation, GenerationEvent, Message, Termination, ToolChoice, ToolResultBlock,
};

pub const SYSTEM_PROMPT: &str = "You are an AI assistant specialized in course materials and educational content with access to tools for course information.

Available Tools:
1. **search_course_content**: Search within course content for specific topics, concepts, or details
2. **get_course_outline**: Get course structure including title, instructor, link, and complete lesson list

Tool Selection Strategy:
- Use **get_course_outline** for: course syllabus, lesson lists, what a course covers, course structure
- Use **search_course_content** for: specific content questions, concepts, explanations within lessons
- **Sequential Tool Usage**: You may make multiple tool calls when needed for complex queries
  - Use SINGLE call for: simple lookups, specific content questions
  - Use MULTIPLE calls for: comparisons across courses, gathering comprehensive information
  - Each call should have a distinct purpose (avoid redundant searches)

When to Stop Searching:
- You have sufficient information to answer completely
- Further searches would be redundant
- You've gathered enough sources on the topic

Citation Instructions (for search_course_content only):
- Search results are numbered [1], [2], [3], etc. and accumulate across searches
- Cite sources by including the number in brackets, e.g., \"The model uses attention mechanisms [1].\"
- Only cite sources you actually use
- Course outlines do not require citations

Response Protocol:
- **General knowledge questions**: Answer without tools
- **Course structure/syllabus questions**: Use get_course_outline
- **Course content questions**: Use search_course_content
- **Comparison questions**: Search each course separately, then synthesize
- **No meta-commentary**: Provide direct answers only

For Course Outlines:
- Present the course title, instructor, and link clearly
- List lessons with their numbers, titles, and links
- Format as a readable list

All responses must be:
1. **Brief and focused** - Get to the point quickly
2. **Educational** - Maintain instructional value
3. **Clear** - Use accessible language
";

pub const FINAL_ANSWER_INSTRUCTION: &str = "Based on the search results above, please provide your final response. Remember to cite your sources using the bracket notation [1], [2], etc.";

pub const CITATION_REMINDER: &str = "Please revise your response to include citations using bracket notation [1], [2], etc. to reference the search results. Each fact from the course materials should cite its source.";

lazy_static! {
    static ref CITATION_MARK: Regex = Regex::new(r"\[\d+\]").expect("valid citation regex");
}

/// True if `text` contains a bracketed citation such as `[1]`.
pub fn has_citation(text: &str) -> bool {
    CITATION_MARK.is_match(text)
}

/// Fixed instructions plus, when present, the prior conversation.
pub fn build_system_content(history: Option<&str>) -> String {
    match history.filter(|h| !h.trim().is_empty()) {
        Some(h) => format!("{SYSTEM_PROMPT}\n\nPrevious conversation:\n{h}"),
        None => SYSTEM_PROMPT.to_string(),
    }
}

type Logger<'a> = Option<&'a mut (dyn FnMut(&GenerationEvent) + Send)>;

fn emit(logger: &mut Logger<'_>, ev: GenerationEvent) {
    debug!(target: "generator", event = %ev, "generation_event");
    if let Some(cb) = logger.as_deref_mut() {
        cb(&ev);
    }
}

struct LoopState {
    tool_rounds: usize,
    endpoint_calls: usize,
    messages: ConversationHistory,
}

/// Drives the model/tool exchange for one query at a time.
#[derive(Clone)]
pub struct AiGenerator {
    client: Arc<dyn InferenceClient>,
    max_tool_rounds: usize,
}

impl AiGenerator {
    /// `max_tool_rounds` is clamped to at least 1.
    pub fn new(client: Arc<dyn InferenceClient>, max_tool_rounds: usize) -> Self {
        Self { client, max_tool_rounds: max_tool_rounds.max(1) }
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    /// Answer `query`, letting the model call tools from `registry`.
    ///
    /// Tools are offered only when both `tools` and `registry` are given.
    #[instrument(name = "generate", skip_all, fields(query_len = query.len(), has_history = history.is_some()))]
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        registry: Option<&mut ToolRegistry>,
    ) -> Result<String> {
        let out = self.run(query, history, tools, registry, None).await?;
        Ok(out.text)
    }

    /// Like [`generate`](Self::generate), reporting progress to `logger` and
    /// returning loop statistics.
    pub async fn generate_with_logger(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        registry: Option<&mut ToolRegistry>,
        mut logger: impl FnMut(&GenerationEvent) + Send,
    ) -> Result<Generation> {
        self.run(query, history, tools, registry, Some(&mut logger)).await
    }

    async fn run(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        mut registry: Option<&mut ToolRegistry>,
        mut logger: Logger<'_>,
    ) -> Result<Generation> {
        let system = build_system_content(history);
        let tools = tools.filter(|t| !t.is_empty());
        let mut state = LoopState { tool_rounds: 0, endpoint_calls: 0, messages: ConversationHistory::new() };
        state.messages.add_user(query);

        loop {
            if state.tool_rounds >= self.max_tool_rounds {
                emit(&mut logger, GenerationEvent::RoundLimitReached { max_rounds: self.max_tool_rounds });
                let messages = state.messages.extended_with([Message::user(FINAL_ANSWER_INSTRUCTION)]);
                return self.finish_without_tools(&system, messages, &mut state, Termination::RoundLimit, &mut logger).await;
            }

            let offered = tools.filter(|_| registry.is_some());
            let request = CompletionRequest {
                system: system.clone(),
                messages: state.messages.to_vec(),
                tools: offered.map(|t| t.to_vec()),
                tool_choice: offered.map(|_| ToolChoice::Auto),
            };
            state.endpoint_calls += 1;
            emit(&mut logger, GenerationEvent::RoundStart { call: state.endpoint_calls, tools_offered: offered.is_some() });
            let response = self.client.complete(&request).await?;

            if !response.wants_tools() {
                let text = response.first_text();
                if state.tool_rounds > 0 && !has_citation(&text) {
                    emit(&mut logger, GenerationEvent::MissingCitations { len: text.len() });
                    let messages = state
                        .messages
                        .extended_with([Message::assistant(text), Message::user(CITATION_REMINDER)]);
                    return self
                        .finish_without_tools(&system, messages, &mut state, Termination::CitationRevision, &mut logger)
                        .await;
                }
                emit(&mut logger, GenerationEvent::Finished { termination: Termination::Answered, endpoint_calls: state.endpoint_calls });
                info!(target: "generator", calls = state.endpoint_calls, rounds = state.tool_rounds, "answered");
                return Ok(Generation {
                    text,
                    endpoint_calls: state.endpoint_calls,
                    tool_rounds: state.tool_rounds,
                    termination: Termination::Answered,
                });
            }

            let Some(reg) = registry.as_deref_mut() else {
                // tool use without a registry to serve it: settle for an answer
                let messages = state.messages.extended_with([Message::user(FINAL_ANSWER_INSTRUCTION)]);
                return self.finish_without_tools(&system, messages, &mut state, Termination::RoundLimit, &mut logger).await;
            };

            let round = state.tool_rounds + 1;
            let mut results = Vec::new();
            for call in response.tool_uses() {
                emit(&mut logger, GenerationEvent::ToolRequested { round, name: call.name.clone(), id: call.id.clone() });
                let resolution = reg.dispatch(&call.name, &call.input);
                results.push(ToolResultBlock {
                    tool_use_id: call.id.clone(),
                    content: resolution.content(),
                    is_error: !resolution.is_executed(),
                });
                emit(&mut logger, GenerationEvent::ToolResolved { round, resolution });
            }
            state.messages = state
                .messages
                .extended_with([Message::assistant_blocks(response.content.clone()), Message::tool_results(results)]);
            state.tool_rounds = round;
        }
    }

    /// One last endpoint call with no tools offered; its text is returned as is.
    async fn finish_without_tools(
        &self,
        system: &str,
        messages: ConversationHistory,
        state: &mut LoopState,
        termination: Termination,
        logger: &mut Logger<'_>,
    ) -> Result<Generation> {
        let request = CompletionRequest {
            system: system.to_string(),
            messages: messages.to_vec(),
            tools: None,
            tool_choice: None,
        };
        state.endpoint_calls += 1;
        emit(logger, GenerationEvent::RoundStart { call: state.endpoint_calls, tools_offered: false });
        let response = self.client.complete(&request).await?;
        state.messages = messages;
        emit(logger, GenerationEvent::Finished { termination, endpoint_calls: state.endpoint_calls });
        info!(target: "generator", calls = state.endpoint_calls, rounds = state.tool_rounds, ?termination, "forced_final_answer");
        Ok(Generation {
            text: response.first_text(),
            endpoint_calls: state.endpoint_calls,
            tool_rounds: state.tool_rounds,
            termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_pattern() {
        assert!(has_citation("MCP uses JSON-RPC [1]."));
        assert!(has_citation("see [12]"));
        assert!(!has_citation("no sources here"));
        assert!(!has_citation("brackets [a] and [] only"));
    }

    #[test]
    fn history_is_appended_to_system_prompt() {
        assert_eq!(build_system_content(None), SYSTEM_PROMPT);
        let with = build_system_content(Some("User: hi\nAssistant: hello"));
        assert!(with.starts_with(SYSTEM_PROMPT));
        assert!(with.ends_with("\n\nPrevious conversation:\nUser: hi\nAssistant: hello"));
    }
}

use crate::config::Config;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolChoiceOption,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FunctionCall,
};
use color_eyre::Result;
use serde_json::Value;
use tracing::debug;

use super::types::{CompletionRequest, ContentBlock, Message, MessageContent, Role, ToolChoice};

/// Which token-limit field the model family accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenLimitStrategy {
    /// `max_tokens` (4o family)
    MaxTokens,
    /// `max_completion_tokens` (newer families)
    MaxCompletionTokens,
}

pub(crate) fn determine_token_limit_strategy(model: &str) -> TokenLimitStrategy {
    if model.contains("4o") {
        debug!(target: "openai", model = %model, strategy = "MaxTokens", "token_limit_strategy");
        TokenLimitStrategy::MaxTokens
    } else {
        debug!(target: "openai", model = %model, strategy = "MaxCompletionTokens", "token_limit_strategy");
        TokenLimitStrategy::MaxCompletionTokens
    }
}

fn arguments_string(input: &Value) -> String {
    match input {
        // unparsable arguments are kept verbatim
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Translate domain messages into chat-completions messages, system prompt first.
pub(crate) fn to_chat_messages(system: &str, messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(messages.len() + 1);
    out.push(ChatCompletionRequestSystemMessageArgs::default().content(system).build()?.into());

    for msg in messages {
        match (&msg.content, msg.role) {
            (MessageContent::Text(text), Role::User) => {
                out.push(ChatCompletionRequestUserMessageArgs::default().content(text.as_str()).build()?.into());
            }
            (MessageContent::Text(text), Role::Assistant) => {
                out.push(ChatCompletionRequestAssistantMessageArgs::default().content(text.as_str()).build()?.into());
            }
            (MessageContent::Blocks(blocks), role) => {
                let text: Vec<&str> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        ContentBlock::ToolUse(_) => None,
                    })
                    .collect();
                let calls: Vec<ChatCompletionMessageToolCall> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::ToolUse(t) => Some(ChatCompletionMessageToolCall {
                            id: t.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall { name: t.name.clone(), arguments: arguments_string(&t.input) },
                        }),
                        ContentBlock::Text { .. } => None,
                    })
                    .collect();
                if role == Role::User {
                    out.push(ChatCompletionRequestUserMessageArgs::default().content(text.join("\n")).build()?.into());
                    continue;
                }
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !text.is_empty() {
                    builder.content(text.join("\n"));
                }
                if !calls.is_empty() {
                    builder.tool_calls(calls);
                }
                out.push(builder.build()?.into());
            }
            (MessageContent::ToolResults(results), _) => {
                for r in results {
                    out.push(
                        ChatCompletionRequestToolMessageArgs::default()
                            .content(r.content.clone())
                            .tool_call_id(r.tool_use_id.clone())
                            .build()?
                            .into(),
                    );
                }
            }
        }
    }
    Ok(out)
}

fn build_request_with_strategy(
    messages: Vec<ChatCompletionRequestMessage>,
    tools: Option<Vec<ChatCompletionTool>>,
    tool_choice: Option<ToolChoice>,
    strategy: TokenLimitStrategy,
    config: &Config,
) -> Result<CreateChatCompletionRequest> {
    let mut builder = CreateChatCompletionRequestArgs::default();
    builder.model(&config.model).messages(messages).temperature(config.temperature);

    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        builder.tools(tools);
        if let Some(ToolChoice::Auto) = tool_choice {
            builder.tool_choice(ChatCompletionToolChoiceOption::Auto);
        }
    }

    let req = match strategy {
        TokenLimitStrategy::MaxTokens => {
            debug!(target: "openai", max_tokens = config.max_tokens, "applying max_tokens");
            builder.max_tokens(config.max_tokens).build()?
        }
        TokenLimitStrategy::MaxCompletionTokens => {
            debug!(target: "openai", max_completion_tokens = config.max_completion_tokens, "applying max_completion_tokens");
            builder.max_completion_tokens(config.max_completion_tokens).build()?
        }
    };
    Ok(req)
}

/// Build the chat-completions request for one endpoint round.
pub(crate) fn build_chat_request(request: &CompletionRequest, config: &Config) -> Result<CreateChatCompletionRequest> {
    let strategy = determine_token_limit_strategy(&config.model);
    let messages = to_chat_messages(&request.system, &request.messages)?;
    let tools = request
        .tools
        .as_ref()
        .map(|defs| defs.iter().map(|d| d.as_chat_tool()).collect::<Vec<_>>());
    build_request_with_strategy(messages, tools, request.tool_choice, strategy, config)
}

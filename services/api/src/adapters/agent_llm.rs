//! services/api/src/adapters/agent_llm.rs
//!
//! This module contains the agent executor. It implements the `AgentExecutor`
//! port by driving the function-calling exchange of an OpenAI-compatible chat
//! completions endpoint: the hosted model does the reasoning, this adapter runs
//! the tools it asks for and feeds the observations back.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use idea_namer_core::domain::{AgentRun, AgentStep};
use idea_namer_core::ports::{AgentExecutor, PortError, PortResult, Tool};
use std::sync::Arc;
use tracing::{debug, info};

const TEMPERATURE: f32 = 1.0;
const MAX_COMPLETION_TOKENS: u32 = 30_000;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AgentExecutor` on top of an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAgentExecutor {
    client: Client<OpenAIConfig>,
    model: String,
    max_iterations: usize,
}

impl OpenAiAgentExecutor {
    /// Creates a new `OpenAiAgentExecutor` bounded to `max_iterations` model calls per run.
    pub fn new(client: Client<OpenAIConfig>, model: String, max_iterations: usize) -> Self {
        Self {
            client,
            model,
            max_iterations,
        }
    }

    fn tool_definitions(tools: &[Arc<dyn Tool>]) -> PortResult<Vec<ChatCompletionTool>> {
        tools
            .iter()
            .map(|tool| {
                let function = FunctionObjectArgs::default()
                    .name(tool.name())
                    .description(tool.description())
                    .parameters(tool.parameters())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(function)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))
            })
            .collect()
    }
}

//=========================================================================================
// `AgentExecutor` Trait Implementation
//=========================================================================================

#[async_trait]
impl AgentExecutor for OpenAiAgentExecutor {
    async fn run(&self, input: &str, tools: &[Arc<dyn Tool>]) -> PortResult<AgentRun> {
        let definitions = Self::tool_definitions(tools)?;
        let mut messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(input)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into()];
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let mut builder = CreateChatCompletionRequestArgs::default();
            builder
                .model(&self.model)
                .messages(messages.clone())
                .temperature(TEMPERATURE)
                .max_completion_tokens(MAX_COMPLETION_TOKENS);
            if !definitions.is_empty() {
                builder.tools(definitions.clone());
            }
            let request = builder
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

            let message = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| {
                    PortError::Unexpected("Agent LLM returned no choices in its response.".to_string())
                })?
                .message;

            let calls = match message.tool_calls {
                Some(calls) if !calls.is_empty() => calls,
                _ => {
                    info!("Agent finished after {} iteration(s)", iteration);
                    let output = message.content.ok_or_else(|| {
                        PortError::Unexpected("Agent response contained no text content.".to_string())
                    })?;
                    return Ok(AgentRun { output, steps });
                }
            };

            let mut assistant = ChatCompletionRequestAssistantMessageArgs::default();
            assistant.tool_calls(calls.clone());
            if let Some(content) = message.content {
                assistant.content(content);
            }
            messages.push(
                assistant
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            );

            for call in calls {
                let name = call.function.name;
                let arguments = call.function.arguments;
                debug!("Agent calls {} with {}", name, arguments);

                let observation = match tools.iter().find(|tool| tool.name() == name) {
                    Some(tool) => tool.call(&arguments).await?,
                    None => format!(
                        "{} is not a valid tool, try one of [{}].",
                        name,
                        tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
                    ),
                };

                messages.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(call.id)
                        .content(observation.clone())
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?
                        .into(),
                );
                steps.push(AgentStep {
                    tool: name,
                    input: arguments,
                    observation,
                });
            }
        }

        Err(PortError::Unexpected(format!(
            "agent did not finish within {} iterations",
            self.max_iterations
        )))
    }
}

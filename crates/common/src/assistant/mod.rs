//! Question answering passthrough
//!
//! Forwards a free-form question to an OpenAI-compatible chat completion
//! endpoint and returns the model's answer verbatim. When built with an
//! aggregator, the six catalog operations are offered to the model as
//! functions and the calls it requests are run before it answers.

mod tools;

use crate::aggregator::Aggregator;
use crate::config::AssistantConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_assistant;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a knowledgeable guide to the Star Wars universe. \
Answer questions about its films, planets and characters concisely and accurately. \
Use the provided functions to look up catalog data. \
If you do not know the answer, say so.";

/// Model turns allowed to request tool calls before an answer is required
const MAX_TOOL_ROUNDS: usize = 5;

/// Trait for question answering
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Answer a question in plain text
    async fn ask(&self, question: &str) -> Result<String>;

    /// Get the model name
    fn model(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            tool_call_id: Some(call_id.to_string()),
            ..Self::new("tool", content)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Value],
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Assistant backed by a chat completion API
pub struct ChatAssistant {
    config: AssistantConfig,
    client: reqwest::Client,
    aggregator: Option<Arc<Aggregator>>,
    tools: Vec<Value>,
}

impl ChatAssistant {
    /// Create a new chat assistant
    pub fn new(config: AssistantConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            client,
            aggregator: None,
            tools: Vec::new(),
        })
    }

    /// Let the model call the catalog operations while answering
    pub fn with_tools(mut self, aggregator: Arc<Aggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self.tools = tools::definitions();
        self
    }

    fn system_prompt(&self) -> String {
        self.config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    async fn converse(&self, api_key: &str, question: &str) -> Result<String> {
        let mut messages = vec![
            ChatMessage::new("system", self.system_prompt()),
            ChatMessage::new("user", ask_prompt(question)),
        ];

        for round in 0..=MAX_TOOL_ROUNDS {
            let reply = self.call_llm(api_key, &messages).await?;
            let calls = reply.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                return reply.content.ok_or_else(|| AppError::Assistant {
                    message: "Chat API returned neither content nor tool calls".to_string(),
                });
            }

            if round == MAX_TOOL_ROUNDS {
                break;
            }

            messages.push(reply);
            for call in &calls {
                let content = self.run_tool(call).await;
                messages.push(ChatMessage::tool_result(&call.id, content));
            }
        }

        Err(AppError::Assistant {
            message: format!("No answer after {} rounds of tool calls", MAX_TOOL_ROUNDS),
        })
    }

    /// Run a requested tool; failures are reported back to the model
    async fn run_tool(&self, call: &ToolCall) -> String {
        let tool = call.function.name.as_str();
        debug!(tool, arguments = %call.function.arguments, "Running tool call");

        let result = match &self.aggregator {
            Some(aggregator) => tools::dispatch(aggregator, tool, &call.function.arguments).await,
            None => Err(AppError::Validation {
                message: format!("Unknown tool: {}", tool),
                field: None,
            }),
        };

        match result {
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!(tool, error = %e, "Tool call failed");
                serde_json::json!({ "error": e.to_string() }).to_string()
            }
        }
    }

    async fn call_llm(&self, api_key: &str, messages: &[ChatMessage]) -> Result<ChatMessage> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            tools: &self.tools,
        };

        debug!(model = %self.config.model, messages = messages.len(), "Sending prompt");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Assistant {
                message: format!("Chat API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Assistant {
                message: format!("Chat API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| AppError::Assistant {
                message: format!("Failed to parse chat response: {}", e),
            })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AppError::Assistant {
                message: "Empty response from chat API".to_string(),
            })
    }
}

#[async_trait]
impl Assistant for ChatAssistant {
    async fn ask(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation {
                message: "Question must not be blank".to_string(),
                field: Some("q".to_string()),
            });
        }

        let Some(api_key) = self.api_key() else {
            debug!(question, "No API key configured, answering offline");
            return Ok(offline_answer(question));
        };

        let result = self.converse(api_key, question).await;
        record_assistant(&self.config.model, result.is_ok());
        result
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// User prompt wrapping the caller's question
fn ask_prompt(question: &str) -> String {
    format!(
        "Answer the following question about Star Wars.\n\nQuestion: {}\n\nAnswer:",
        question
    )
}

fn offline_answer(question: &str) -> String {
    format!(
        "I cannot reach a language model right now, so I cannot answer \"{}\". \
        [Offline response - assistant API key not configured]",
        question
    )
}

/// Create an assistant that answers with the help of the catalog
pub fn create_assistant(
    config: &AssistantConfig,
    aggregator: Arc<Aggregator>,
) -> Result<Arc<dyn Assistant>> {
    Ok(Arc::new(ChatAssistant::new(config.clone())?.with_tools(aggregator)))
}

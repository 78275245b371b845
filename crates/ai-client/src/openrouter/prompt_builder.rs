use std::marker::PhantomData;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::traits::{Message, MessageRole, OutputBuilder, PromptBuilder};

use super::types::*;
use super::OpenRouter;

/// Builds a chat request against OpenRouter's unified completion endpoint.
///
/// OpenRouter is wired here as a plain single-turn completion fallback: no
/// tool-calling loop, since the adapter's wire format carries only
/// system/user/assistant content.
pub struct OpenRouterPromptBuilder {
    agent: OpenRouter,
    input: String,
    preamble: Option<String>,
    temperature: Option<f32>,
    messages: Vec<Message>,
}

impl OpenRouterPromptBuilder {
    pub(crate) fn new(agent: OpenRouter, input: String) -> Self {
        Self {
            agent,
            input,
            preamble: None,
            temperature: None,
            messages: Vec::new(),
        }
    }

    pub fn output<T: DeserializeOwned + JsonSchema + Send + 'static>(
        self,
    ) -> OpenRouterOutputBuilder<T> {
        OpenRouterOutputBuilder {
            builder: self,
            _phantom: PhantomData,
        }
    }

    fn build_request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(&self.agent.model).max_tokens(4096);

        if let Some(temp) = self.temperature {
            request = request.temperature(temp);
        }

        let mut wire_messages = Vec::new();

        if let Some(ref preamble) = self.preamble {
            wire_messages.push(WireMessage::system(preamble));
        }

        for msg in &self.messages {
            wire_messages.push(match msg.role {
                MessageRole::System => WireMessage::system(&msg.content),
                MessageRole::User => WireMessage::user(&msg.content),
                MessageRole::Assistant => WireMessage::assistant(&msg.content),
            });
        }

        if !self.input.is_empty() {
            wire_messages.push(WireMessage::user(&self.input));
        }

        request.messages(wire_messages)
    }
}

#[async_trait]
impl PromptBuilder for OpenRouterPromptBuilder {
    fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn multi_turn(self, _max_turns: usize) -> Self {
        // No tool loop to iterate; OpenRouter completions here are single-turn.
        self
    }

    fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    async fn send(self) -> Result<String> {
        let client = self.agent.client();
        let request = self.build_request();

        let response = client.chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response from OpenRouter"))
    }
}

// =============================================================================
// Structured Output Builder
// =============================================================================

pub struct OpenRouterOutputBuilder<T> {
    builder: OpenRouterPromptBuilder,
    _phantom: PhantomData<T>,
}

#[async_trait]
impl<T: DeserializeOwned + JsonSchema + Send + 'static> OutputBuilder<T>
    for OpenRouterOutputBuilder<T>
{
    async fn send(self) -> Result<T> {
        debug!("OpenRouter structured output extraction via json_object response format");

        let client = self.builder.agent.client();
        let mut request = self.builder.build_request();
        request.temperature = Some(0.0);
        request.response_format = Some(serde_json::json!({"type": "json_object"}));

        let response = client.chat(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response from OpenRouter"))?;

        let cleaned = crate::util::strip_code_blocks(&content);
        serde_json::from_str(&cleaned)
            .map_err(|e| anyhow!("Failed to deserialize OpenRouter response: {}", e))
    }
}

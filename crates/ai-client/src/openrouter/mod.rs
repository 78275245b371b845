mod client;
pub mod prompt_builder;
pub(crate) mod types;

pub use prompt_builder::{OpenRouterOutputBuilder, OpenRouterPromptBuilder};

use crate::traits::{Agent, EmbedAgent};
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use client::OpenRouterClient;

/// Fallback agent reached through OpenRouter's unified API — used when a
/// preferred provider's own key is unset but a model still needs to run.
#[derive(Clone)]
pub struct OpenRouter {
    api_key: String,
    pub(crate) model: String,
    app_name: Option<String>,
    site_url: Option<String>,
}

impl OpenRouter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            app_name: None,
            site_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow!("OPENROUTER_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn with_site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> OpenRouterClient {
        let mut client = OpenRouterClient::new(&self.api_key);
        if let Some(ref name) = self.app_name {
            client = client.with_app_name(name);
        }
        if let Some(ref url) = self.site_url {
            client = client.with_site_url(url);
        }
        client
    }

    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = types::ChatRequest::new(&self.model)
            .message(types::WireMessage::system(system))
            .message(types::WireMessage::user(user))
            .max_tokens(4096)
            .temperature(0.0);

        let response = self.client().chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response from OpenRouter"))
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat_completion("You are a helpful assistant.", prompt)
            .await
    }
}

impl Agent for OpenRouter {
    type PromptBuilder = OpenRouterPromptBuilder;

    fn tool<T: crate::tool::Tool + 'static>(self, _tool: T) -> Self {
        // The OpenRouter adapter is used as a plain completion fallback; tool
        // calling is not wired through its simplified wire format.
        self
    }

    fn dyn_tool(self, _tool: std::sync::Arc<dyn crate::tool::DynTool>) -> Self {
        self
    }

    fn prompt(&self, input: impl Into<String>) -> OpenRouterPromptBuilder {
        OpenRouterPromptBuilder::new(self.clone(), input.into())
    }
}

#[async_trait]
impl EmbedAgent for OpenRouter {
    async fn embed(&self, text: impl Into<String> + Send) -> Result<Vec<f32>> {
        self.client().embed(&self.model, &text.into()).await
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.client().embed_batch(&self.model, &texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openrouter_new() {
        let or = OpenRouter::new("or-test", "deepseek/deepseek-v3.2");
        assert_eq!(or.model, "deepseek/deepseek-v3.2");
        assert_eq!(or.api_key, "or-test");
    }
}

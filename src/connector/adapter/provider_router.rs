use async_trait::async_trait;

use crate::application::{ChatStreamer, EventStream};
use crate::connector::adapter::{AnthropicChatClient, OpenAiChatClient};
use crate::domain::{ChatError, Message, Provider};

/// Routes a conversation turn to the client for the selected vendor.
///
/// Stateless; owns one client per vendor and nothing else.
pub struct ProviderRouter {
    openai: OpenAiChatClient,
    anthropic: AnthropicChatClient,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            openai: OpenAiChatClient::new(),
            anthropic: AnthropicChatClient::new(),
        }
    }

    pub fn with_clients(openai: OpenAiChatClient, anthropic: AnthropicChatClient) -> Self {
        Self { openai, anthropic }
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStreamer for ProviderRouter {
    async fn stream(
        &self,
        messages: &[Message],
        model_id: &str,
        api_key: &str,
        provider: Provider,
    ) -> Result<EventStream, ChatError> {
        match provider {
            Provider::OpenAi => self.openai.stream(messages, model_id, api_key).await,
            Provider::Anthropic => self.anthropic.stream(messages, model_id, api_key).await,
        }
    }
}

use std::fmt;

/// A chat-completion vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    /// Key under which this vendor's API key is stored.
    pub fn credential_key(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai_api_key",
            Self::Anthropic => "anthropic_api_key",
        }
    }

    pub fn all() -> [Provider; 2] {
        [Self::OpenAi, Self::Anthropic]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "OpenAI"),
            Self::Anthropic => write!(f, "Anthropic"),
        }
    }
}

/// The closed set of models the assistant can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatModel {
    GptNano,
    GptMini,
    GptFull,
    GptCodex,
    ClaudeOpus,
    ClaudeSonnet,
    ClaudeHaiku,
}

impl ChatModel {
    pub const DEFAULT: ChatModel = ChatModel::GptMini;

    /// Wire identifier sent to the vendor.
    pub fn id(&self) -> &'static str {
        match self {
            Self::GptNano => "gpt-5-nano-2025-08-07",
            Self::GptMini => "gpt-5-mini-2025-08-07",
            Self::GptFull => "gpt-5.2-2025-12-11",
            Self::GptCodex => "gpt-5.1-codex",
            Self::ClaudeOpus => "claude-opus-4-5-20251101",
            Self::ClaudeSonnet => "claude-sonnet-4-5",
            Self::ClaudeHaiku => "claude-haiku-4-5-20251001",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GptNano => "5-nano",
            Self::GptMini => "5-mini",
            Self::GptFull => "5.2",
            Self::GptCodex => "5.1-codex",
            Self::ClaudeOpus => "Opus 4.5",
            Self::ClaudeSonnet => "Sonnet 4.5",
            Self::ClaudeHaiku => "Haiku 4.5",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::GptNano | Self::GptMini | Self::GptFull | Self::GptCodex => Provider::OpenAi,
            Self::ClaudeOpus | Self::ClaudeSonnet | Self::ClaudeHaiku => Provider::Anthropic,
        }
    }

    pub fn all() -> [ChatModel; 7] {
        [
            Self::GptNano,
            Self::GptMini,
            Self::GptFull,
            Self::GptCodex,
            Self::ClaudeOpus,
            Self::ClaudeSonnet,
            Self::ClaudeHaiku,
        ]
    }

    pub fn models_for(provider: Provider) -> Vec<ChatModel> {
        Self::all()
            .into_iter()
            .filter(|m| m.provider() == provider)
            .collect()
    }

    pub fn from_id(id: &str) -> Option<ChatModel> {
        Self::all().into_iter().find(|m| m.id() == id)
    }

    /// Resolve a persisted model id, falling back to the default for unknown
    /// or absent values so stale settings never break startup.
    pub fn from_stored(stored: Option<&str>) -> ChatModel {
        stored.and_then(Self::from_id).unwrap_or(Self::DEFAULT)
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_ids_round_trip() {
        for model in ChatModel::all() {
            assert_eq!(ChatModel::from_id(model.id()), Some(model));
        }
    }

    #[test]
    fn from_stored_falls_back_to_default() {
        assert_eq!(ChatModel::from_stored(None), ChatModel::DEFAULT);
        assert_eq!(ChatModel::from_stored(Some("gpt-3")), ChatModel::DEFAULT);
    }

    #[test]
    fn from_stored_resolves_known_id() {
        assert_eq!(
            ChatModel::from_stored(Some("claude-sonnet-4-5")),
            ChatModel::ClaudeSonnet
        );
    }

    #[test]
    fn providers_partition_the_catalog() {
        let openai = ChatModel::models_for(Provider::OpenAi);
        let anthropic = ChatModel::models_for(Provider::Anthropic);
        assert_eq!(openai.len() + anthropic.len(), ChatModel::all().len());
        assert!(openai.iter().all(|m| m.provider() == Provider::OpenAi));
        assert!(anthropic.iter().all(|m| m.provider() == Provider::Anthropic));
    }
}
